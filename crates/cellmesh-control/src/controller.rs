//! Allocation Controller - converges held cells toward estimated demand.
//!
//! Each tick reads the routing view, estimates how many cells the upstream
//! neighbor should carry, and moves the allocation one step toward that
//! target. Convergence is deliberately gradual:
//!
//! - **Add**: one cell per tick
//! - **Remove**: one request per tick, whatever the gap
//! - **Steady**: nothing is sent when held equals target
//!
//! Failures are not retried inside the tick. A failed remove is followed by
//! a single reconcile on the same tick; a failed add simply waits for the
//! next tick to be re-evaluated.

use cellmesh_link::{LinkAddr, UpstreamState};
use tracing::{debug, trace, warn};

use crate::collaborators::{CellNegotiator, Routing};
use crate::config::ControllerConfig;
use crate::demand::DemandEstimator;
use crate::error::NegotiationError;
use crate::reactor::{Switch, TopologyReactor};
use crate::stats::ControllerStats;

/// Why a tick issued nothing and changed no state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The coordinator never allocates upstream cells.
    Coordinator,
    /// Routing has not selected an upstream neighbor.
    NoNeighbor,
    /// The stability timer has not produced a reading yet.
    UnknownTimer,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Coordinator => write!(f, "Coordinator"),
            Self::NoNeighbor => write!(f, "NoNeighbor"),
            Self::UnknownTimer => write!(f, "UnknownTimer"),
        }
    }
}

/// What a single allocation tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing was evaluated.
    Skipped(SkipReason),
    /// The upstream neighbor changed and the old allocation was released.
    Flushed {
        previous: LinkAddr,
        current: LinkAddr,
    },
    /// The upstream neighbor changed but the flush was rejected.
    FlushFailed {
        previous: LinkAddr,
        current: LinkAddr,
        error: NegotiationError,
    },
    /// Held cells already match the target.
    Steady { neighbor: LinkAddr, held: u32 },
    /// One cell was requested.
    Added {
        neighbor: LinkAddr,
        target: u32,
        granted: u32,
    },
    /// The add request failed; the next tick will try again.
    AddFailed {
        neighbor: LinkAddr,
        target: u32,
        error: NegotiationError,
    },
    /// A remove request succeeded.
    Removed {
        neighbor: LinkAddr,
        target: u32,
        removed: u32,
    },
    /// The remove request failed and a reconcile was attempted.
    RemoveFailed {
        neighbor: LinkAddr,
        target: u32,
        error: NegotiationError,
        reconciled: bool,
    },
}

impl TickOutcome {
    /// Check whether the tick sent anything to the negotiation layer.
    #[must_use]
    pub fn issued_request(&self) -> bool {
        !matches!(self, Self::Skipped(_) | Self::Steady { .. })
    }
}

/// The periodic cell allocation controller.
///
/// Owns only the last-observed upstream neighbor and its counters. Held
/// cell counts are re-read from the negotiator on every tick.
#[derive(Debug)]
pub struct AllocationController {
    estimator: DemandEstimator,
    max_links: u32,
    reactor: TopologyReactor,
    stats: ControllerStats,
}

impl AllocationController {
    /// Create a controller from its configuration.
    #[must_use]
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            estimator: config.estimator(),
            max_links: config.max_links,
            reactor: TopologyReactor::new(),
            stats: ControllerStats::default(),
        }
    }

    /// Upstream state as of the last evaluated tick.
    #[must_use]
    pub fn upstream(&self) -> UpstreamState {
        self.reactor.state()
    }

    /// Activity counters.
    #[must_use]
    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    /// Evaluate one tick.
    ///
    /// At most one of flush, remove (plus its reconcile fallback) or add is
    /// issued. A tick that replaces the upstream neighbor only flushes; the
    /// new neighbor is served from the next tick on.
    pub fn tick<R, N>(&mut self, routing: &R, negotiator: &mut N) -> TickOutcome
    where
        R: Routing,
        N: CellNegotiator,
    {
        self.stats.ticks += 1;

        let (neighbor, timer) = match Self::readings(routing) {
            Ok(readings) => readings,
            Err(reason) => {
                trace!(%reason, "Skipping allocation tick");
                self.stats.skipped += 1;
                return TickOutcome::Skipped(reason);
            }
        };

        if let Switch::Replaced { previous } = self.reactor.observe(neighbor) {
            return self.flush(negotiator, previous, neighbor);
        }

        let target = self.estimator.estimate(timer, self.max_links);
        let held = negotiator.held_cell_count(neighbor);

        debug!(
            neighbor = %neighbor,
            timer,
            held,
            target,
            max_links = self.max_links,
            "Evaluated cell demand"
        );

        if held > target {
            self.remove(negotiator, neighbor, target)
        } else if held < target {
            self.add(negotiator, neighbor, target)
        } else {
            TickOutcome::Steady { neighbor, held }
        }
    }

    fn readings<R: Routing>(routing: &R) -> Result<(LinkAddr, u32), SkipReason> {
        if routing.is_coordinator() {
            return Err(SkipReason::Coordinator);
        }
        let neighbor = routing.upstream_neighbor().ok_or(SkipReason::NoNeighbor)?;
        match routing.stability_timer() {
            0 => Err(SkipReason::UnknownTimer),
            timer => Ok((neighbor, timer)),
        }
    }

    fn flush<N: CellNegotiator>(
        &mut self,
        negotiator: &mut N,
        previous: LinkAddr,
        current: LinkAddr,
    ) -> TickOutcome {
        self.stats.flushes += 1;
        match negotiator.flush_all_cells(previous) {
            Ok(()) => {
                debug!(previous = %previous, "Flushed cells toward replaced neighbor");
                TickOutcome::Flushed { previous, current }
            }
            Err(error) => {
                warn!(previous = %previous, %error, "Failed to flush replaced neighbor");
                TickOutcome::FlushFailed {
                    previous,
                    current,
                    error,
                }
            }
        }
    }

    fn remove<N: CellNegotiator>(
        &mut self,
        negotiator: &mut N,
        neighbor: LinkAddr,
        target: u32,
    ) -> TickOutcome {
        match negotiator.request_remove_cells(neighbor) {
            Ok(removed) => {
                self.stats.removes += 1;
                TickOutcome::Removed {
                    neighbor,
                    target,
                    removed,
                }
            }
            Err(error) => {
                self.stats.remove_failures += 1;
                self.stats.reconciles += 1;
                warn!(neighbor = %neighbor, %error, "Remove failed, reconciling");
                let reconciled = match negotiator.reconcile(Some(neighbor)) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(neighbor = %neighbor, error = %e, "Fallback reconcile failed");
                        false
                    }
                };
                TickOutcome::RemoveFailed {
                    neighbor,
                    target,
                    error,
                    reconciled,
                }
            }
        }
    }

    fn add<N: CellNegotiator>(
        &mut self,
        negotiator: &mut N,
        neighbor: LinkAddr,
        target: u32,
    ) -> TickOutcome {
        match negotiator.request_add_cells(neighbor, 1) {
            Ok(granted) => {
                self.stats.adds += 1;
                TickOutcome::Added {
                    neighbor,
                    target,
                    granted,
                }
            }
            Err(error) => {
                self.stats.add_failures += 1;
                warn!(neighbor = %neighbor, %error, "Add failed, will retry next tick");
                TickOutcome::AddFailed {
                    neighbor,
                    target,
                    error,
                }
            }
        }
    }
}
