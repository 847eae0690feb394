//! Demand estimation from the routing stability timer.
//!
//! A short stability interval means the routing protocol is still reacting
//! to churn: parents are switching and control traffic is high, so the node
//! should hold every cell it is allowed. Once the interval grows past the
//! threshold the topology has settled and demand falls back to the baseline.
//!
//! ```rust
//! use cellmesh_control::demand::{estimate_target, DEFAULT_STABILITY_THRESHOLD};
//!
//! assert_eq!(estimate_target(8, 4), 4);
//! assert_eq!(estimate_target(DEFAULT_STABILITY_THRESHOLD, 4), 4);
//! assert_eq!(estimate_target(1024, 4), 0);
//! ```

use serde::{Deserialize, Serialize};

/// Timer readings at or below this value mean the topology is stabilizing.
pub const DEFAULT_STABILITY_THRESHOLD: u32 = 16;

/// Cells wanted once the topology has settled.
pub const DEFAULT_BASELINE_LINKS: u32 = 0;

/// Maps a stability-timer reading to a target cell count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandEstimator {
    /// Readings `<= threshold` demand the maximum.
    pub threshold: u32,
    /// Demand for readings above the threshold, before clamping.
    pub baseline: u32,
}

impl Default for DemandEstimator {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_STABILITY_THRESHOLD,
            baseline: DEFAULT_BASELINE_LINKS,
        }
    }
}

impl DemandEstimator {
    /// Create an estimator with the given threshold and baseline.
    #[must_use]
    pub const fn new(threshold: u32, baseline: u32) -> Self {
        Self { threshold, baseline }
    }

    /// Target cell count for a timer reading, clamped to `[0, max_links]`.
    #[must_use]
    pub fn estimate(&self, stability_timer: u32, max_links: u32) -> u32 {
        if stability_timer <= self.threshold {
            max_links
        } else {
            self.baseline.min(max_links)
        }
    }
}

/// Estimate with the default threshold and baseline.
#[must_use]
pub fn estimate_target(stability_timer: u32, max_links: u32) -> u32 {
    DemandEstimator::default().estimate(stability_timer, max_links)
}
