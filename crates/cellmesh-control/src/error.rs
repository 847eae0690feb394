//! Error types for cellmesh-control.

use std::time::Duration;

use cellmesh_link::LinkAddr;
use thiserror::Error;

/// Result type for cellmesh-control operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur outside a control tick.
///
/// Nothing that happens inside a tick is fatal; negotiation failures are
/// folded into the tick outcome and retried on a later tick.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value could not be used.
    #[error("invalid configuration for {key}: {reason}")]
    Config { key: &'static str, reason: String },

    /// A negotiation request failed.
    #[error("negotiation failed: {0}")]
    Negotiation(#[from] NegotiationError),
}

/// Transient failures reported by the cell negotiation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationError {
    /// The peer did not answer the transaction.
    #[error("peer {0} unreachable")]
    PeerUnreachable(LinkAddr),

    /// No free slot is left in the schedule.
    #[error("schedule full toward {neighbor} ({capacity} cells)")]
    ScheduleFull { neighbor: LinkAddr, capacity: u32 },

    /// There is no cell to remove.
    #[error("no cells held toward {0}")]
    NoCells(LinkAddr),

    /// Another transaction with the peer is still open.
    #[error("transaction with {0} already in progress")]
    Busy(LinkAddr),

    /// The transaction timed out.
    #[error("transaction timed out after {0:?}")]
    Timeout(Duration),
}
