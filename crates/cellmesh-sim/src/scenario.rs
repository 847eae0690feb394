//! Scenario files for the simulated node.
//!
//! A scenario names the simulated node, the controller configuration, the
//! link quality toward peers and a routing timeline:
//!
//! ```json
//! {
//!   "node_id": 3,
//!   "duration_secs": 100,
//!   "loss": 0.1,
//!   "steps": [
//!     { "at_secs": 3,  "upstream": 1, "timer": 8 },
//!     { "at_secs": 38, "upstream": 2, "timer": 4 }
//!   ]
//! }
//! ```

use std::path::Path;

use cellmesh_control::{CellService, ControllerConfig};
use cellmesh_link::DEFAULT_SLOTFRAME_LENGTH;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::negotiator::SimNegotiator;
use crate::routing::{RoutingStep, ScriptedRouting};

/// Node id of the network coordinator.
pub const COORDINATOR_NODE_ID: u16 = 1;

/// Service type built from a scenario.
pub type SimService = CellService<ScriptedRouting, SimNegotiator>;

/// A replayable description of one node's environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Simulated node id; node 1 is the coordinator
    pub node_id: u16,
    /// Slots in the slotframe shared by all neighbors
    #[serde(default = "default_slotframe_length")]
    pub slotframe_length: u32,
    /// Controller configuration
    #[serde(default)]
    pub controller: ControllerConfig,
    /// Probability that a negotiation transaction is lost
    #[serde(default)]
    pub loss: f64,
    /// Seed for loss injection
    #[serde(default)]
    pub seed: u64,
    /// How long to run before stopping
    pub duration_secs: u64,
    /// Routing timeline
    pub steps: Vec<RoutingStep>,
}

fn default_slotframe_length() -> u32 {
    DEFAULT_SLOTFRAME_LENGTH
}

impl Scenario {
    /// Load a scenario from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let scenario: Self = serde_json::from_str(&raw)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Node 3 settles under node 1, switches to node 2, then the
    /// topology goes quiet.
    #[must_use]
    pub fn parent_switch() -> Self {
        Self {
            node_id: 3,
            slotframe_length: DEFAULT_SLOTFRAME_LENGTH,
            controller: ControllerConfig::default(),
            loss: 0.0,
            seed: 0,
            duration_secs: 100,
            steps: vec![
                RoutingStep::new(3, Some(1), 0),
                RoutingStep::new(8, Some(1), 8),
                RoutingStep::new(38, Some(2), 4),
                RoutingStep::new(68, Some(2), 512),
            ],
        }
    }

    /// Whether the simulated node is the coordinator.
    #[must_use]
    pub fn is_coordinator(&self) -> bool {
        self.node_id == COORDINATOR_NODE_ID
    }

    /// Check the scenario for values the simulation cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.node_id == 0 {
            return Err(Error::Invalid("node_id 0 is reserved".into()));
        }
        if !(0.0..=1.0).contains(&self.loss) {
            return Err(Error::Invalid(format!("loss {} outside [0, 1]", self.loss)));
        }
        if self.duration_secs == 0 {
            return Err(Error::Invalid("duration_secs must be positive".into()));
        }
        if let Some(step) = self.steps.iter().find(|s| s.upstream == Some(self.node_id)) {
            return Err(Error::Invalid(format!(
                "node {} cannot be its own upstream (at {} s)",
                self.node_id, step.at_secs
            )));
        }
        self.controller.validate()?;
        Ok(())
    }

    /// Build the service, starting the routing timeline now.
    pub fn build(&self) -> Result<SimService> {
        self.validate()?;
        let routing = ScriptedRouting::new(self.is_coordinator(), self.steps.clone());
        let negotiator = SimNegotiator::new(self.slotframe_length).with_loss(self.loss, self.seed);
        Ok(CellService::new(self.controller.clone(), routing, negotiator)?)
    }
}
