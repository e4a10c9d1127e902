//! Ledger health reports.
//!
//! Reconciliation is read-only: it reports imbalanced traces and never
//! corrects them.

use chrono::{DateTime, Utc};
use kudi_shared::AppError;
use serde::{Deserialize, Serialize};

use crate::ledger::TraceImbalance;

/// Result of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// True when no trace is imbalanced.
    pub healthy: bool,
    /// Imbalanced traces, ordered by trace id.
    pub inconsistencies: Vec<TraceImbalance>,
    /// When the check ran.
    pub checked_at: DateTime<Utc>,
}

impl ReconciliationReport {
    /// Builds a report from the imbalances found at `checked_at`.
    #[must_use]
    pub fn new(inconsistencies: Vec<TraceImbalance>, checked_at: DateTime<Utc>) -> Self {
        Self {
            healthy: inconsistencies.is_empty(),
            inconsistencies,
            checked_at,
        }
    }

    /// The invariant-violation signal for an unhealthy report.
    ///
    /// This is for alerting; callers do not return it as an error.
    #[must_use]
    pub fn violation(&self) -> Option<AppError> {
        if self.healthy {
            return None;
        }
        let traces: Vec<String> = self
            .inconsistencies
            .iter()
            .map(|i| i.trace_id.to_string())
            .collect();
        Some(AppError::InvariantViolation(format!(
            "{} imbalanced trace(s): {}",
            traces.len(),
            traces.join(", ")
        )))
    }
}
