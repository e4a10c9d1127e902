//! Background jobs on fixed intervals.
//!
//! Each job runs on its own task. A failed run is logged and the next tick
//! tries again.

use std::time::Duration;

use chrono::Utc;
use kudi_db::{IdempotencyRepository, PenaltyJob, ReconciliationJob};
use kudi_shared::config::JobsConfig;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

/// The periodic jobs of the service.
pub struct Scheduler {
    /// Daily penalty accrual and collection.
    pub penalties: PenaltyJob,
    /// Ledger balance check.
    pub reconciliation: ReconciliationJob,
    /// Purge of expired idempotency records.
    pub idempotency: IdempotencyRepository,
}

impl Scheduler {
    /// Starts one task per job. The first run of each happens immediately.
    pub fn spawn(self, config: &JobsConfig) {
        let Self {
            penalties,
            reconciliation,
            idempotency,
        } = self;

        let mut ticker = every(config.penalty_interval_secs);
        tokio::spawn(async move {
            loop {
                ticker.tick().await;
                match penalties.accrue_penalties(Utc::now()).await {
                    Ok(summary) => info!(
                        scanned = summary.scanned,
                        penalized = summary.penalized,
                        collected = summary.collected,
                        failed = summary.failed,
                        "Penalty run finished"
                    ),
                    Err(err) => error!(error = %err, "Penalty run failed"),
                }
            }
        });

        let mut ticker = every(config.reconciliation_interval_secs);
        tokio::spawn(async move {
            loop {
                ticker.tick().await;
                if let Err(err) = reconciliation.run().await {
                    error!(error = %err, "Reconciliation run failed");
                }
            }
        });

        let mut ticker = every(config.purge_interval_secs);
        tokio::spawn(async move {
            loop {
                ticker.tick().await;
                match idempotency.purge_expired(Utc::now()).await {
                    Ok(0) => {}
                    Ok(purged) => info!(purged, "Expired idempotency records purged"),
                    Err(err) => error!(error = %err, "Idempotency purge failed"),
                }
            }
        });
    }
}

fn every(secs: u64) -> tokio::time::Interval {
    let mut ticker = interval(Duration::from_secs(secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
