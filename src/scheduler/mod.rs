//! Scheduler - fixed-interval cycle loop
//!
//! Runs one cycle immediately at startup, then one per interval,
//! forever. Cycles run to completion before the next wait starts, so
//! they never overlap; external process supervision is the only stop
//! mechanism.

use crate::orchestrator::{
    CameraPort, ExtractorPort, IlluminationPort, ReadCycleOrchestrator, StateStorePort,
};
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Cycle scheduler
pub struct Scheduler<C, I, E, S> {
    orchestrator: ReadCycleOrchestrator<C, I, E, S>,
    interval: Duration,
}

impl<C, I, E, S> Scheduler<C, I, E, S>
where
    C: CameraPort,
    I: IlluminationPort,
    E: ExtractorPort,
    S: StateStorePort,
{
    pub fn new(orchestrator: ReadCycleOrchestrator<C, I, E, S>, interval: Duration) -> Self {
        Self {
            orchestrator,
            interval,
        }
    }

    /// Run the cycle loop. Never returns.
    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "scheduler started");

        let mut ticker = tokio::time::interval(self.interval);
        // A cycle longer than the interval delays the next tick instead
        // of bursting to catch up.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // The first tick completes immediately: initial reading at startup.
            ticker.tick().await;

            let outcome = self.orchestrator.run_cycle().await;
            tracing::info!(outcome = %outcome, "cycle finished");
        }
    }
}
