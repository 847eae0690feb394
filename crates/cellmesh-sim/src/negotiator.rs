//! Simulated cell negotiation peer.
//!
//! Each neighbor has two views of the allocation: what this node believes it
//! holds (`local`) and what the peer has actually installed (`peer`). They
//! agree as long as every transaction completes. Lost transactions and
//! [`SimNegotiator::desync`] let them drift apart, and a reconcile copies the
//! peer's view back.

use std::collections::{BTreeMap, VecDeque};

use cellmesh_control::{CellNegotiator, LinkAddr, NegotiationError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

/// Slot 0 carries the minimal shared cell and is never negotiated.
const SHARED_CELLS: u32 = 1;

/// A request received by the simulated peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationCall {
    /// Add `count` cells toward `neighbor`
    Add { neighbor: LinkAddr, count: u32 },
    /// Remove one cell toward the neighbor
    Remove(LinkAddr),
    /// Release every cell toward the neighbor
    Flush(LinkAddr),
    /// Re-check one neighbor, or all of them
    Reconcile(Option<LinkAddr>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CellCount {
    local: u32,
    peer: u32,
}

/// In-memory negotiation layer backed by one slotframe.
#[derive(Debug)]
pub struct SimNegotiator {
    capacity: u32,
    cells: BTreeMap<LinkAddr, CellCount>,
    loss: f64,
    rng: StdRng,
    scripted: VecDeque<NegotiationError>,
    calls: Vec<NegotiationCall>,
}

impl SimNegotiator {
    /// Create a lossless negotiator for a slotframe of `slotframe_len` slots.
    #[must_use]
    pub fn new(slotframe_len: u32) -> Self {
        Self {
            capacity: slotframe_len.saturating_sub(SHARED_CELLS),
            cells: BTreeMap::new(),
            loss: 0.0,
            rng: StdRng::seed_from_u64(0),
            scripted: VecDeque::new(),
            calls: Vec::new(),
        }
    }

    /// Drop each transaction with probability `loss`, using a seeded RNG.
    #[must_use]
    pub fn with_loss(mut self, loss: f64, seed: u64) -> Self {
        self.loss = loss.clamp(0.0, 1.0);
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Make the next request fail with `error`.
    pub fn fail_next(&mut self, error: NegotiationError) {
        self.scripted.push_back(error);
    }

    /// Pretend the peer has `cells` installed toward `neighbor`.
    pub fn desync(&mut self, neighbor: LinkAddr, cells: u32) {
        self.cells.entry(neighbor).or_default().peer = cells;
    }

    /// Cells the peer has installed toward `neighbor`.
    #[must_use]
    pub fn peer_count(&self, neighbor: LinkAddr) -> u32 {
        self.cells.get(&neighbor).map_or(0, |c| c.peer)
    }

    /// Negotiable cells in the slotframe.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Cells held locally across all neighbors.
    #[must_use]
    pub fn total_held(&self) -> u32 {
        self.cells.values().map(|c| c.local).sum()
    }

    /// Every request received so far.
    #[must_use]
    pub fn calls(&self) -> &[NegotiationCall] {
        &self.calls
    }

    /// Record the call, then decide whether the transaction fails.
    fn begin(
        &mut self,
        call: NegotiationCall,
        neighbor: Option<LinkAddr>,
    ) -> Result<(), NegotiationError> {
        self.calls.push(call);
        if let Some(error) = self.scripted.pop_front() {
            trace!(?call, %error, "Scripted failure");
            return Err(error);
        }
        if self.loss > 0.0 && self.rng.gen_bool(self.loss) {
            trace!(?call, "Transaction lost");
            return Err(match neighbor {
                Some(addr) => NegotiationError::PeerUnreachable(addr),
                None => NegotiationError::Timeout(std::time::Duration::from_secs(1)),
            });
        }
        Ok(())
    }
}

impl CellNegotiator for SimNegotiator {
    fn held_cell_count(&self, neighbor: LinkAddr) -> u32 {
        self.cells.get(&neighbor).map_or(0, |c| c.local)
    }

    fn request_add_cells(
        &mut self,
        neighbor: LinkAddr,
        count: u32,
    ) -> Result<u32, NegotiationError> {
        self.begin(NegotiationCall::Add { neighbor, count }, Some(neighbor))?;

        let free = self.capacity.saturating_sub(self.total_held());
        if free == 0 {
            return Err(NegotiationError::ScheduleFull {
                neighbor,
                capacity: self.capacity,
            });
        }

        let granted = count.min(free);
        let entry = self.cells.entry(neighbor).or_default();
        entry.local += granted;
        entry.peer += granted;
        debug!(neighbor = %neighbor, granted, held = entry.local, "Cells added");
        Ok(granted)
    }

    fn request_remove_cells(&mut self, neighbor: LinkAddr) -> Result<u32, NegotiationError> {
        self.begin(NegotiationCall::Remove(neighbor), Some(neighbor))?;

        match self.cells.get_mut(&neighbor) {
            Some(entry) if entry.local > 0 && entry.peer > 0 => {
                entry.local -= 1;
                entry.peer -= 1;
                debug!(neighbor = %neighbor, held = entry.local, "Cell removed");
                Ok(1)
            }
            _ => Err(NegotiationError::NoCells(neighbor)),
        }
    }

    fn flush_all_cells(&mut self, neighbor: LinkAddr) -> Result<(), NegotiationError> {
        self.begin(NegotiationCall::Flush(neighbor), Some(neighbor))?;
        if let Some(entry) = self.cells.remove(&neighbor) {
            debug!(neighbor = %neighbor, released = entry.local, "Cells flushed");
        }
        Ok(())
    }

    fn reconcile(&mut self, neighbor: Option<LinkAddr>) -> Result<(), NegotiationError> {
        self.begin(NegotiationCall::Reconcile(neighbor), neighbor)?;

        match neighbor {
            Some(addr) => {
                if let Some(entry) = self.cells.get_mut(&addr) {
                    entry.local = entry.peer;
                }
            }
            None => {
                for entry in self.cells.values_mut() {
                    entry.local = entry.peer;
                }
            }
        }
        self.cells.retain(|_, c| c.local > 0 || c.peer > 0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellmesh_link::DEFAULT_SLOTFRAME_LENGTH;

    fn addr(id: u16) -> LinkAddr {
        LinkAddr::from_node_id(id)
    }

    #[test]
    fn shared_cell_is_reserved() {
        assert_eq!(SimNegotiator::new(DEFAULT_SLOTFRAME_LENGTH).capacity(), 12);
        assert_eq!(SimNegotiator::new(0).capacity(), 0);
    }

    #[test]
    fn add_is_bounded_by_free_slots() {
        let mut sim = SimNegotiator::new(4);
        assert_eq!(sim.request_add_cells(addr(2), 2), Ok(2));
        assert_eq!(sim.request_add_cells(addr(3), 5), Ok(1));
        assert_eq!(
            sim.request_add_cells(addr(3), 1),
            Err(NegotiationError::ScheduleFull {
                neighbor: addr(3),
                capacity: 3
            })
        );
        assert_eq!(sim.total_held(), 3);
    }

    #[test]
    fn remove_takes_one_cell() {
        let mut sim = SimNegotiator::new(13);
        sim.request_add_cells(addr(2), 3).unwrap();
        assert_eq!(sim.request_remove_cells(addr(2)), Ok(1));
        assert_eq!(sim.held_cell_count(addr(2)), 2);
        assert_eq!(sim.peer_count(addr(2)), 2);
    }

    #[test]
    fn remove_without_cells_fails() {
        let mut sim = SimNegotiator::new(13);
        assert_eq!(
            sim.request_remove_cells(addr(2)),
            Err(NegotiationError::NoCells(addr(2)))
        );
    }

    #[test]
    fn remove_fails_when_peer_already_dropped() {
        let mut sim = SimNegotiator::new(13);
        sim.request_add_cells(addr(2), 2).unwrap();
        sim.desync(addr(2), 0);

        assert!(sim.request_remove_cells(addr(2)).is_err());
        sim.reconcile(Some(addr(2))).unwrap();
        assert_eq!(sim.held_cell_count(addr(2)), 0);
    }

    #[test]
    fn flush_releases_everything() {
        let mut sim = SimNegotiator::new(13);
        sim.request_add_cells(addr(2), 4).unwrap();
        sim.flush_all_cells(addr(2)).unwrap();
        assert_eq!(sim.held_cell_count(addr(2)), 0);
        assert_eq!(sim.total_held(), 0);
    }

    #[test]
    fn global_reconcile_resyncs_all() {
        let mut sim = SimNegotiator::new(13);
        sim.request_add_cells(addr(2), 2).unwrap();
        sim.request_add_cells(addr(3), 2).unwrap();
        sim.desync(addr(2), 1);
        sim.desync(addr(3), 3);

        sim.reconcile(None).unwrap();

        assert_eq!(sim.held_cell_count(addr(2)), 1);
        assert_eq!(sim.held_cell_count(addr(3)), 3);
    }

    #[test]
    fn scripted_failure_is_consumed_once() {
        let mut sim = SimNegotiator::new(13);
        sim.fail_next(NegotiationError::Busy(addr(2)));

        assert_eq!(sim.request_add_cells(addr(2), 1), Err(NegotiationError::Busy(addr(2))));
        assert_eq!(sim.request_add_cells(addr(2), 1), Ok(1));
        assert_eq!(sim.calls().len(), 2);
    }

    #[test]
    fn total_loss_fails_everything() {
        let mut sim = SimNegotiator::new(13).with_loss(1.0, 7);
        assert_eq!(
            sim.request_add_cells(addr(2), 1),
            Err(NegotiationError::PeerUnreachable(addr(2)))
        );
        assert!(matches!(sim.reconcile(None), Err(NegotiationError::Timeout(_))));
        assert_eq!(sim.total_held(), 0);
    }

    #[test]
    fn calls_are_recorded_in_order() {
        let mut sim = SimNegotiator::new(13);
        sim.request_add_cells(addr(2), 1).unwrap();
        sim.flush_all_cells(addr(2)).unwrap();
        sim.reconcile(None).unwrap();

        assert_eq!(
            sim.calls(),
            &[
                NegotiationCall::Add {
                    neighbor: addr(2),
                    count: 1
                },
                NegotiationCall::Flush(addr(2)),
                NegotiationCall::Reconcile(None),
            ]
        );
    }
}
