//! Test doubles for the routing and negotiation collaborators.

use std::collections::HashMap;

use cellmesh_link::LinkAddr;

use crate::collaborators::{CellNegotiator, Routing};
use crate::error::NegotiationError;

/// Routing view with fixed readings.
#[derive(Debug, Clone, Default)]
pub struct FixedRouting {
    pub upstream: Option<LinkAddr>,
    pub timer: u32,
    pub coordinator: bool,
}

impl FixedRouting {
    pub fn new(upstream: Option<LinkAddr>, timer: u32) -> Self {
        Self {
            upstream,
            timer,
            coordinator: false,
        }
    }

    pub fn coordinator() -> Self {
        Self {
            upstream: None,
            timer: 8,
            coordinator: true,
        }
    }
}

impl Routing for FixedRouting {
    fn upstream_neighbor(&self) -> Option<LinkAddr> {
        self.upstream
    }

    fn stability_timer(&self) -> u32 {
        self.timer
    }

    fn is_coordinator(&self) -> bool {
        self.coordinator
    }
}

/// A negotiation request seen by [`RecordingNegotiator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Add(LinkAddr, u32),
    Remove(LinkAddr),
    Flush(LinkAddr),
    Reconcile(Option<LinkAddr>),
}

/// Negotiator that grants everything unless told to fail, and records
/// every request.
#[derive(Debug, Default)]
pub struct RecordingNegotiator {
    pub held: HashMap<LinkAddr, u32>,
    pub calls: Vec<Call>,
    pub fail_add: bool,
    pub fail_remove: bool,
    pub fail_flush: bool,
    pub fail_reconcile: bool,
}

impl RecordingNegotiator {
    pub fn holding(neighbor: LinkAddr, cells: u32) -> Self {
        let mut negotiator = Self::default();
        negotiator.held.insert(neighbor, cells);
        negotiator
    }

    pub fn held(&self, neighbor: LinkAddr) -> u32 {
        self.held.get(&neighbor).copied().unwrap_or(0)
    }
}

impl CellNegotiator for RecordingNegotiator {
    fn held_cell_count(&self, neighbor: LinkAddr) -> u32 {
        self.held(neighbor)
    }

    fn request_add_cells(
        &mut self,
        neighbor: LinkAddr,
        count: u32,
    ) -> Result<u32, NegotiationError> {
        self.calls.push(Call::Add(neighbor, count));
        if self.fail_add {
            return Err(NegotiationError::PeerUnreachable(neighbor));
        }
        *self.held.entry(neighbor).or_default() += count;
        Ok(count)
    }

    fn request_remove_cells(&mut self, neighbor: LinkAddr) -> Result<u32, NegotiationError> {
        self.calls.push(Call::Remove(neighbor));
        if self.fail_remove {
            return Err(NegotiationError::Busy(neighbor));
        }
        match self.held.get_mut(&neighbor) {
            Some(cells) if *cells > 0 => {
                *cells -= 1;
                Ok(1)
            }
            _ => Err(NegotiationError::NoCells(neighbor)),
        }
    }

    fn flush_all_cells(&mut self, neighbor: LinkAddr) -> Result<(), NegotiationError> {
        self.calls.push(Call::Flush(neighbor));
        if self.fail_flush {
            return Err(NegotiationError::PeerUnreachable(neighbor));
        }
        self.held.remove(&neighbor);
        Ok(())
    }

    fn reconcile(&mut self, neighbor: Option<LinkAddr>) -> Result<(), NegotiationError> {
        self.calls.push(Call::Reconcile(neighbor));
        if self.fail_reconcile {
            return Err(NegotiationError::Timeout(std::time::Duration::from_secs(1)));
        }
        Ok(())
    }
}
