//! Upstream-neighbor state.

use crate::LinkAddr;

/// Whether the node currently has a neighbor to send upstream traffic to.
///
/// There is no terminal state. A node moves from `NoNeighbor` to
/// `HasNeighbor` when routing first selects a parent, and from
/// `HasNeighbor` to `HasNeighbor` each time the parent is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpstreamState {
    /// No upstream neighbor is known; no allocation is possible.
    #[default]
    NoNeighbor,
    /// Allocation and flush logic act on this neighbor.
    HasNeighbor(LinkAddr),
}

impl UpstreamState {
    /// Build the state from a routing observation.
    pub const fn from_observation(neighbor: Option<LinkAddr>) -> Self {
        match neighbor {
            Some(addr) => Self::HasNeighbor(addr),
            None => Self::NoNeighbor,
        }
    }

    /// The neighbor, if there is one.
    pub const fn neighbor(&self) -> Option<LinkAddr> {
        match self {
            Self::HasNeighbor(addr) => Some(*addr),
            Self::NoNeighbor => None,
        }
    }

    /// Check whether a neighbor is known.
    pub const fn has_neighbor(&self) -> bool {
        matches!(self, Self::HasNeighbor(_))
    }
}

impl std::fmt::Display for UpstreamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoNeighbor => write!(f, "NoNeighbor"),
            Self::HasNeighbor(addr) => write!(f, "HasNeighbor({addr})"),
        }
    }
}
