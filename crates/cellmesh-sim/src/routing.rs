//! Scripted routing view.
//!
//! Readings come from a timeline of [`RoutingStep`]s keyed by seconds since
//! the view was created. Time is `tokio::time`, so paused-clock tests replay
//! a scenario instantly.

use cellmesh_control::{LinkAddr, Routing};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Routing state from `at_secs` until the next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingStep {
    /// Seconds since start at which this step takes effect
    pub at_secs: u64,
    /// Node id of the upstream neighbor, if any
    pub upstream: Option<u16>,
    /// Stability-timer reading (0 = unknown)
    pub timer: u32,
}

/// Routing view that replays a timeline.
#[derive(Debug, Clone)]
pub struct ScriptedRouting {
    start: Instant,
    coordinator: bool,
    steps: Vec<RoutingStep>,
}

impl RoutingStep {
    /// A step taking effect `at_secs` after start.
    #[must_use]
    pub const fn new(at_secs: u64, upstream: Option<u16>, timer: u32) -> Self {
        Self {
            at_secs,
            upstream,
            timer,
        }
    }
}

impl ScriptedRouting {
    /// Start replaying `steps` now.
    #[must_use]
    pub fn new(coordinator: bool, mut steps: Vec<RoutingStep>) -> Self {
        steps.sort_by_key(|s| s.at_secs);
        Self {
            start: Instant::now(),
            coordinator,
            steps,
        }
    }

    /// The step in effect right now.
    #[must_use]
    pub fn current(&self) -> Option<&RoutingStep> {
        let elapsed = self.start.elapsed().as_secs();
        self.steps.iter().take_while(|s| s.at_secs <= elapsed).last()
    }

    /// Seconds from start until the last step takes effect.
    #[must_use]
    pub fn last_change_secs(&self) -> u64 {
        self.steps.last().map_or(0, |s| s.at_secs)
    }
}

impl Routing for ScriptedRouting {
    fn upstream_neighbor(&self) -> Option<LinkAddr> {
        self.current()?.upstream.map(LinkAddr::from_node_id)
    }

    fn stability_timer(&self) -> u32 {
        self.current().map_or(0, |s| s.timer)
    }

    fn is_coordinator(&self) -> bool {
        self.coordinator
    }
}
