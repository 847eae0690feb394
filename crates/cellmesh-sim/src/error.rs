//! Error types for cellmesh-sim.

use thiserror::Error;

/// Result type for simulation setup.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or building a scenario.
#[derive(Debug, Error)]
pub enum Error {
    /// Scenario file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Scenario file is not valid JSON
    #[error("Scenario parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Scenario values are inconsistent
    #[error("Invalid scenario: {0}")]
    Invalid(String),

    /// Controller rejected the configuration
    #[error("Controller error: {0}")]
    Control(#[from] cellmesh_control::Error),
}
