//! Cell Service - drives the allocation and reconciliation cadences.
//!
//! Both cadences run inside one tokio task. A biased `select!` picks
//! whichever timer is due, so an allocation tick and a reconciliation sweep
//! never overlap and only one of them touches the negotiator at a time.
//!
//! ```text
//!   t=0        5         10        15        20        25
//!   |----------|---------|---------|---------|---------|   allocation
//!   |  warm-up |-----------------------------|            reconciliation
//! ```

use std::future::Future;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::collaborators::{CellNegotiator, Routing};
use crate::config::ControllerConfig;
use crate::controller::{AllocationController, TickOutcome};
use crate::error::Result;
use crate::reactor::{ReconcileOutcome, Reconciler};
use crate::stats::ControllerStats;

/// Background control process for one node.
#[derive(Debug)]
pub struct CellService<R, N> {
    config: ControllerConfig,
    routing: R,
    negotiator: N,
    controller: AllocationController,
    reconciler: Reconciler,
}

impl<R, N> CellService<R, N>
where
    R: Routing,
    N: CellNegotiator,
{
    /// Create a service after validating its configuration.
    pub fn new(config: ControllerConfig, routing: R, negotiator: N) -> Result<Self> {
        config.validate()?;
        let controller = AllocationController::new(&config);

        debug!(
            max_links = config.max_links,
            eval_period = ?config.eval_period,
            stability_threshold = config.stability_threshold,
            reconcile_period = ?config.reconcile_period,
            "Created cell service"
        );

        Ok(Self {
            config,
            routing,
            negotiator,
            controller,
            reconciler: Reconciler::new(),
        })
    }

    /// Run forever.
    pub async fn run(&mut self) {
        self.run_until(std::future::pending::<()>()).await;
    }

    /// Run until `shutdown` resolves.
    ///
    /// The first allocation tick fires one evaluation period after start,
    /// the first sweep after the warm-up delay.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let start = Instant::now();

        let mut eval = interval_at(start + self.config.eval_period, self.config.eval_period);
        eval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut sweep = interval_at(
            start + self.config.reconcile_warmup,
            self.config.reconcile_period,
        );
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);

        info!(
            eval_period = ?self.config.eval_period,
            reconcile_period = ?self.config.reconcile_period,
            reconcile_warmup = ?self.config.reconcile_warmup,
            "Cell service running"
        );

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!(stats = ?self.stats(), "Cell service stopping");
                    break;
                }
                _ = eval.tick() => {
                    self.tick_allocation();
                }
                _ = sweep.tick() => {
                    self.tick_reconcile();
                }
            }
        }
    }

    /// Evaluate one allocation tick now.
    pub fn tick_allocation(&mut self) -> TickOutcome {
        let outcome = self.controller.tick(&self.routing, &mut self.negotiator);
        if outcome.issued_request() {
            debug!(?outcome, "Allocation tick");
        } else {
            trace!(?outcome, "Allocation tick");
        }
        outcome
    }

    /// Run one reconciliation sweep now.
    pub fn tick_reconcile(&mut self) -> ReconcileOutcome {
        let outcome = self.reconciler.tick(&self.routing, &mut self.negotiator);
        trace!(?outcome, "Reconciliation tick");
        outcome
    }

    /// Counters from both cadences.
    #[must_use]
    pub fn stats(&self) -> ControllerStats {
        let mut stats = self.controller.stats();
        stats.reconciles += self.reconciler.sweeps();
        stats
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// The allocation controller.
    #[must_use]
    pub fn controller(&self) -> &AllocationController {
        &self.controller
    }

    /// The routing collaborator.
    #[must_use]
    pub fn routing(&self) -> &R {
        &self.routing
    }

    /// Mutable access to the routing collaborator.
    pub fn routing_mut(&mut self) -> &mut R {
        &mut self.routing
    }

    /// The negotiation collaborator.
    #[must_use]
    pub fn negotiator(&self) -> &N {
        &self.negotiator
    }

    /// Mutable access to the negotiation collaborator.
    pub fn negotiator_mut(&mut self) -> &mut N {
        &mut self.negotiator
    }
}
