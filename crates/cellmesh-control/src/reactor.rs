//! Topology-change detection and the periodic reconciliation sweep.
//!
//! The [`TopologyReactor`] remembers the upstream neighbor seen on the last
//! evaluated tick. When routing switches parent, the cells still held toward
//! the old parent would never be used again, so the controller flushes them.
//!
//! The [`Reconciler`] runs on its own, slower cadence and asks the negotiation
//! layer for a full re-check regardless of what the allocation tick decided.

use cellmesh_link::{LinkAddr, UpstreamState};
use tracing::{debug, info, trace, warn};

use crate::collaborators::{CellNegotiator, Routing};
use crate::error::NegotiationError;

/// Result of comparing the current upstream neighbor with the last one seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    /// No neighbor had been seen before this one.
    FirstNeighbor,
    /// Same neighbor as last time.
    Unchanged,
    /// Routing replaced `previous` with the current neighbor.
    Replaced { previous: LinkAddr },
}

/// Tracks the last-observed upstream neighbor.
#[derive(Debug, Default)]
pub struct TopologyReactor {
    last: Option<LinkAddr>,
}

impl TopologyReactor {
    /// Create a reactor that has not seen any neighbor yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of the upstream slot.
    #[must_use]
    pub fn state(&self) -> UpstreamState {
        UpstreamState::from_observation(self.last)
    }

    /// The neighbor stored by the last observation.
    #[must_use]
    pub fn last_observed(&self) -> Option<LinkAddr> {
        self.last
    }

    /// Record `current` and report how it relates to the previous neighbor.
    ///
    /// The stored neighbor is always replaced, whether or not the caller
    /// manages to release the old allocation.
    pub fn observe(&mut self, current: LinkAddr) -> Switch {
        let switch = match self.last.replace(current) {
            None => Switch::FirstNeighbor,
            Some(previous) if previous == current => Switch::Unchanged,
            Some(previous) => Switch::Replaced { previous },
        };

        match switch {
            Switch::FirstNeighbor => info!(neighbor = %current, "Upstream neighbor acquired"),
            Switch::Replaced { previous } => {
                info!(previous = %previous, neighbor = %current, "Upstream neighbor replaced")
            }
            Switch::Unchanged => {}
        }

        switch
    }
}

/// Outcome of one reconciliation sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No upstream neighbor and not the coordinator.
    Skipped,
    /// The sweep succeeded. `None` means every neighbor was re-checked.
    Reconciled { neighbor: Option<LinkAddr> },
    /// The negotiation layer rejected the sweep.
    Failed {
        neighbor: Option<LinkAddr>,
        error: NegotiationError,
    },
}

/// Periodic safety net that re-synchronizes the schedule.
#[derive(Debug, Default)]
pub struct Reconciler {
    sweeps: u64,
    failures: u64,
}

impl Reconciler {
    /// Create a reconciler with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one sweep.
    ///
    /// The coordinator has no upstream neighbor, so it sweeps every
    /// neighbor instead.
    pub fn tick<R, N>(&mut self, routing: &R, negotiator: &mut N) -> ReconcileOutcome
    where
        R: Routing,
        N: CellNegotiator,
    {
        let neighbor = if routing.is_coordinator() {
            None
        } else if let Some(neighbor) = routing.upstream_neighbor() {
            Some(neighbor)
        } else {
            trace!("No upstream neighbor, skipping reconciliation");
            return ReconcileOutcome::Skipped;
        };

        self.sweeps += 1;
        match negotiator.reconcile(neighbor) {
            Ok(()) => {
                debug!(neighbor = ?neighbor.map(|n| n.to_string()), "Reconciled schedule");
                ReconcileOutcome::Reconciled { neighbor }
            }
            Err(error) => {
                self.failures += 1;
                warn!(neighbor = ?neighbor.map(|n| n.to_string()), %error, "Reconciliation failed");
                ReconcileOutcome::Failed { neighbor, error }
            }
        }
    }

    /// Sweeps issued so far.
    #[must_use]
    pub fn sweeps(&self) -> u64 {
        self.sweeps
    }

    /// Sweeps the negotiation layer rejected.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, FixedRouting, RecordingNegotiator};

    #[test]
    fn first_observation_is_not_a_switch() {
        let mut reactor = TopologyReactor::new();
        assert_eq!(reactor.state(), UpstreamState::NoNeighbor);

        let a = LinkAddr::from_node_id(2);
        assert_eq!(reactor.observe(a), Switch::FirstNeighbor);
        assert_eq!(reactor.state(), UpstreamState::HasNeighbor(a));
        assert_eq!(reactor.observe(a), Switch::Unchanged);
    }

    #[test]
    fn replacement_reports_previous() {
        let mut reactor = TopologyReactor::new();
        let a = LinkAddr::from_node_id(2);
        let b = LinkAddr::from_node_id(3);

        reactor.observe(a);
        assert_eq!(reactor.observe(b), Switch::Replaced { previous: a });
        assert_eq!(reactor.last_observed(), Some(b));
        assert_eq!(reactor.observe(a), Switch::Replaced { previous: b });
    }

    #[test]
    fn sweep_targets_upstream() {
        let a = LinkAddr::from_node_id(2);
        let routing = FixedRouting::new(Some(a), 64);
        let mut negotiator = RecordingNegotiator::default();
        let mut reconciler = Reconciler::new();

        let outcome = reconciler.tick(&routing, &mut negotiator);

        assert_eq!(outcome, ReconcileOutcome::Reconciled { neighbor: Some(a) });
        assert_eq!(negotiator.calls, vec![Call::Reconcile(Some(a))]);
        assert_eq!(reconciler.sweeps(), 1);
    }

    #[test]
    fn coordinator_sweeps_everything() {
        let routing = FixedRouting::coordinator();
        let mut negotiator = RecordingNegotiator::default();
        let mut reconciler = Reconciler::new();

        let outcome = reconciler.tick(&routing, &mut negotiator);

        assert_eq!(outcome, ReconcileOutcome::Reconciled { neighbor: None });
        assert_eq!(negotiator.calls, vec![Call::Reconcile(None)]);
    }

    #[test]
    fn sweep_ignores_unknown_timer() {
        let a = LinkAddr::from_node_id(2);
        let routing = FixedRouting::new(Some(a), 0);
        let mut negotiator = RecordingNegotiator::default();

        let outcome = Reconciler::new().tick(&routing, &mut negotiator);

        assert_eq!(outcome, ReconcileOutcome::Reconciled { neighbor: Some(a) });
    }

    #[test]
    fn no_neighbor_no_sweep() {
        let routing = FixedRouting::new(None, 8);
        let mut negotiator = RecordingNegotiator::default();
        let mut reconciler = Reconciler::new();

        assert_eq!(reconciler.tick(&routing, &mut negotiator), ReconcileOutcome::Skipped);
        assert!(negotiator.calls.is_empty());
        assert_eq!(reconciler.sweeps(), 0);
    }

    #[test]
    fn failed_sweep_is_counted() {
        let a = LinkAddr::from_node_id(2);
        let routing = FixedRouting::new(Some(a), 8);
        let mut negotiator = RecordingNegotiator {
            fail_reconcile: true,
            ..Default::default()
        };
        let mut reconciler = Reconciler::new();

        let outcome = reconciler.tick(&routing, &mut negotiator);

        assert!(matches!(outcome, ReconcileOutcome::Failed { neighbor: Some(n), .. } if n == a));
        assert_eq!(reconciler.failures(), 1);
    }
}
