//! Cellmesh Link Layer
//!
//! Shared vocabulary for the cell allocation controller: neighbor addresses,
//! slotframe sizing and the upstream-neighbor state machine.
//!
//! # Slotframe Sizing
//!
//! The default TSCH slotframe is 13 slots long. A single upstream neighbor may
//! hold at most a third of it, which leaves room for the minimal shared cell
//! and for cells negotiated by children:
//!
//! ```rust
//! use cellmesh_link::{default_max_links, DEFAULT_SLOTFRAME_LENGTH};
//!
//! assert_eq!(default_max_links(DEFAULT_SLOTFRAME_LENGTH), 4);
//! ```

mod addr;
mod upstream;

pub use addr::{LinkAddr, LinkAddrError, LINK_ADDR_LEN};
pub use upstream::UpstreamState;

/// Default number of slots in the TSCH slotframe.
pub const DEFAULT_SLOTFRAME_LENGTH: u32 = 13;

/// Fraction of the slotframe (1/N) one neighbor may occupy.
pub const LINKS_PER_SLOTFRAME_DIVISOR: u32 = 3;

/// Maximum number of dedicated cells toward a single neighbor for a
/// slotframe of the given length.
pub const fn default_max_links(slotframe_len: u32) -> u32 {
    slotframe_len / LINKS_PER_SLOTFRAME_DIVISOR
}
