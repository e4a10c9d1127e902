//! Ledger reconciliation job.

use chrono::Utc;
use kudi_core::reconciliation::ReconciliationReport;
use tracing::{error, info};

use super::error::RepositoryError;
use super::ledger::LedgerRepository;

/// Read-only balance check over every COMPLETED trace.
#[derive(Debug, Clone)]
pub struct ReconciliationJob {
    ledger: LedgerRepository,
}

impl ReconciliationJob {
    /// Creates a new reconciliation job.
    #[must_use]
    pub const fn new(ledger: LedgerRepository) -> Self {
        Self { ledger }
    }

    /// Checks that every trace balances and reports the ones that don't.
    ///
    /// Imbalances are logged as invariant violations; they are never
    /// corrected and never returned as errors.
    ///
    /// # Errors
    ///
    /// Returns an error only if the ledger cannot be read.
    pub async fn run(&self) -> Result<ReconciliationReport, RepositoryError> {
        let inconsistencies = self.ledger.find_inconsistencies().await?;
        let report = ReconciliationReport::new(inconsistencies, Utc::now());

        match report.violation() {
            Some(violation) => error!(
                imbalanced = report.inconsistencies.len(),
                error_code = violation.error_code(),
                "{violation}"
            ),
            None => info!("Ledger reconciliation healthy"),
        }
        Ok(report)
    }
}
