//! Cellmesh Simulation
//!
//! In-memory stand-ins for the collaborators of the allocation controller:
//!
//! - [`SimNegotiator`]: a peer that grants and releases cells from a fixed
//!   slotframe, with scripted and random failures
//! - [`ScriptedRouting`]: a routing view that replays a timeline of parent
//!   and stability-timer changes
//! - [`Scenario`]: a JSON description tying both to a controller config

pub mod error;
pub mod negotiator;
pub mod routing;
pub mod scenario;

pub use error::{Error, Result};
pub use negotiator::{NegotiationCall, SimNegotiator};
pub use routing::{RoutingStep, ScriptedRouting};
pub use scenario::Scenario;
