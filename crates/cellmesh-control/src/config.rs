//! Controller configuration.
//!
//! All values are static for the lifetime of the controller. Defaults match
//! a 13-slot slotframe: four cells per neighbor, a 5 s evaluation period and
//! a reconciliation sweep every 15 s after a 5 s warm-up.

use std::str::FromStr;
use std::time::Duration;

use cellmesh_link::{default_max_links, DEFAULT_SLOTFRAME_LENGTH};
use serde::{Deserialize, Serialize};

use crate::demand::{DemandEstimator, DEFAULT_BASELINE_LINKS, DEFAULT_STABILITY_THRESHOLD};
use crate::error::{Error, Result};

/// Configuration for the allocation controller and its service loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Upper bound on cells held toward one neighbor.
    pub max_links: u32,

    /// Time between allocation ticks.
    #[serde(with = "secs")]
    pub eval_period: Duration,

    /// Stability-timer readings at or below this demand `max_links`.
    pub stability_threshold: u32,

    /// Cells wanted once the topology has settled.
    pub baseline_links: u32,

    /// Time between reconciliation sweeps.
    #[serde(with = "secs")]
    pub reconcile_period: Duration,

    /// Delay before the first reconciliation sweep.
    #[serde(with = "secs")]
    pub reconcile_warmup: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_links: default_max_links(DEFAULT_SLOTFRAME_LENGTH),
            eval_period: Duration::from_secs(5),
            stability_threshold: DEFAULT_STABILITY_THRESHOLD,
            baseline_links: DEFAULT_BASELINE_LINKS,
            reconcile_period: Duration::from_secs(15),
            reconcile_warmup: Duration::from_secs(5),
        }
    }
}

impl ControllerConfig {
    /// Create config from environment variables, falling back to defaults.
    ///
    /// Recognized variables: `CELLMESH_MAX_LINKS`, `CELLMESH_EVAL_PERIOD_SECS`,
    /// `CELLMESH_STABILITY_THRESHOLD`, `CELLMESH_BASELINE_LINKS`,
    /// `CELLMESH_RECONCILE_PERIOD_SECS` and `CELLMESH_RECONCILE_WARMUP_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::default().overlay_env()
    }

    /// Override this config with any `CELLMESH_*` environment variables.
    pub fn overlay_env(self) -> Result<Self> {
        self.overlay(|key| std::env::var(key).ok())
    }

    /// Override this config with values from `lookup`, keyed like the
    /// environment variables of [`from_env`](Self::from_env).
    pub fn overlay<F>(self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            max_links: parse_var(&lookup, "CELLMESH_MAX_LINKS", self.max_links)?,
            eval_period: parse_secs(&lookup, "CELLMESH_EVAL_PERIOD_SECS", self.eval_period)?,
            stability_threshold: parse_var(
                &lookup,
                "CELLMESH_STABILITY_THRESHOLD",
                self.stability_threshold,
            )?,
            baseline_links: parse_var(&lookup, "CELLMESH_BASELINE_LINKS", self.baseline_links)?,
            reconcile_period: parse_secs(
                &lookup,
                "CELLMESH_RECONCILE_PERIOD_SECS",
                self.reconcile_period,
            )?,
            reconcile_warmup: parse_secs(
                &lookup,
                "CELLMESH_RECONCILE_WARMUP_SECS",
                self.reconcile_warmup,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject periods the service loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.eval_period.is_zero() {
            return Err(Error::Config {
                key: "eval_period",
                reason: "must be greater than zero".into(),
            });
        }
        if self.reconcile_period.is_zero() {
            return Err(Error::Config {
                key: "reconcile_period",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// The demand estimator described by this config.
    #[must_use]
    pub fn estimator(&self) -> DemandEstimator {
        DemandEstimator::new(self.stability_threshold, self.baseline_links)
    }

    /// Set the per-neighbor cell bound.
    #[must_use]
    pub fn with_max_links(mut self, max_links: u32) -> Self {
        self.max_links = max_links;
        self
    }

    /// Set the allocation tick period.
    #[must_use]
    pub fn with_eval_period(mut self, period: Duration) -> Self {
        self.eval_period = period;
        self
    }

    /// Set the stability threshold.
    #[must_use]
    pub fn with_stability_threshold(mut self, threshold: u32) -> Self {
        self.stability_threshold = threshold;
        self
    }

    /// Set the settled-topology baseline.
    #[must_use]
    pub fn with_baseline_links(mut self, baseline: u32) -> Self {
        self.baseline_links = baseline;
        self
    }

    /// Set the reconciliation period and warm-up.
    #[must_use]
    pub fn with_reconcile(mut self, period: Duration, warmup: Duration) -> Self {
        self.reconcile_period = period;
        self.reconcile_warmup = warmup;
        self
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| Error::Config {
            key,
            reason: format!("{raw:?}: {e}"),
        }),
        None => Ok(default),
    }
}

/// Whole seconds from `lookup`, or `default` untouched when unset.
fn parse_secs<F>(lookup: &F, key: &'static str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(_) => parse_var(lookup, key, 0u64).map(Duration::from_secs),
        None => Ok(default),
    }
}

/// Durations as fractional seconds.
mod secs {
    use std::time::Duration;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        if d.subsec_nanos() == 0 {
            s.serialize_u64(d.as_secs())
        } else {
            s.serialize_f64(d.as_secs_f64())
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(de::Error::custom)
    }
}
