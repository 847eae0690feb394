//! Cellmesh Control - Demand-driven cell allocation for TSCH links
//!
//! This crate keeps the number of dedicated cells a node holds toward its
//! upstream neighbor converged to a target derived from routing stability.
//!
//! # Overview
//!
//! ## Allocation
//!
//! Every evaluation period the [`AllocationController`]:
//!
//! - **Reads** the upstream neighbor and stability timer from [`Routing`]
//! - **Estimates** the target with the [`DemandEstimator`]
//! - **Converges** by at most one add or remove through [`CellNegotiator`]
//!
//! ## Topology Changes
//!
//! When routing switches parent, the [`TopologyReactor`] reports the old
//! neighbor and the controller flushes its cells. A slower [`Reconciler`]
//! sweep re-synchronizes the schedule as a safety net.
//!
//! # Example
//!
//! ```rust,ignore
//! use cellmesh_control::{CellService, ControllerConfig};
//!
//! let config = ControllerConfig::from_env()?;
//! let mut service = CellService::new(config, routing, negotiator)?;
//!
//! // Drive both cadences until the process exits
//! service.run().await;
//! ```

pub mod collaborators;
pub mod config;
pub mod controller;
pub mod demand;
pub mod error;
pub mod reactor;
pub mod service;
pub mod stats;

#[cfg(test)]
mod mock;

pub use collaborators::{CellNegotiator, Routing};
pub use config::ControllerConfig;
pub use controller::{AllocationController, SkipReason, TickOutcome};
pub use demand::{estimate_target, DemandEstimator};
pub use error::{Error, NegotiationError, Result};
pub use reactor::{ReconcileOutcome, Reconciler, Switch, TopologyReactor};
pub use service::CellService;
pub use stats::ControllerStats;

// Re-export link types for convenience
pub use cellmesh_link::{LinkAddr, UpstreamState};
