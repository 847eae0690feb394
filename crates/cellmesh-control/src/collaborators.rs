//! Interfaces to the routing protocol and the cell negotiation layer.
//!
//! The controller owns neither. It reads the routing view at the start of
//! every tick and issues at most one negotiation request per neighbor.

use cellmesh_link::LinkAddr;

use crate::error::NegotiationError;

/// Read-only view of the routing protocol.
pub trait Routing {
    /// The neighbor currently used as the path toward the root.
    fn upstream_neighbor(&self) -> Option<LinkAddr>;

    /// Current stability-timer reading. Zero means not yet known.
    ///
    /// Larger values mean the topology has been quiet for longer.
    fn stability_timer(&self) -> u32;

    /// Whether this node is the network coordinator (DAG root).
    fn is_coordinator(&self) -> bool;
}

/// Cell schedule negotiation with a peer.
///
/// Requests complete before they return: the result reflects the outcome
/// of the whole transaction with the peer.
pub trait CellNegotiator {
    /// Number of dedicated cells currently held toward `neighbor`.
    fn held_cell_count(&self, neighbor: LinkAddr) -> u32;

    /// Ask `neighbor` for `count` more cells. Returns how many were granted.
    fn request_add_cells(
        &mut self,
        neighbor: LinkAddr,
        count: u32,
    ) -> Result<u32, NegotiationError>;

    /// Release a cell held toward `neighbor`. Returns how many were removed.
    fn request_remove_cells(&mut self, neighbor: LinkAddr) -> Result<u32, NegotiationError>;

    /// Release every cell held toward `neighbor`.
    fn flush_all_cells(&mut self, neighbor: LinkAddr) -> Result<(), NegotiationError>;

    /// Re-synchronize the schedule with `neighbor`, or with every neighbor
    /// when `None`.
    fn reconcile(&mut self, neighbor: Option<LinkAddr>) -> Result<(), NegotiationError>;
}
