//! Loan lifecycle state machine.
//!
//! Each method checks its pre-conditions, mutates the account, and appends the
//! matching history entry. `outstanding` never changes any other way.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use kudi_shared::types::{LoanId, Money, TraceId, UserId};

use super::error::{LoanError, MAX_DURATION_DAYS};
use super::pricing::LoanPricing;
use super::types::{
    DisbursementOverrides, HistoryAction, LoanAccount, LoanQuote, LoanStatus, NewLoanRequest,
    PaymentStatus, RepaymentHistoryEntry,
};

fn validate_duration(duration_days: u32) -> Result<u32, LoanError> {
    if duration_days == 0 || duration_days > MAX_DURATION_DAYS {
        return Err(LoanError::InvalidDuration(duration_days));
    }
    Ok(duration_days)
}

impl LoanAccount {
    /// Opens a pending loan application.
    ///
    /// Nothing is owed until disbursement.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero principal or a term outside 1..=365 days.
    pub fn open(
        user_id: UserId,
        request: &NewLoanRequest,
        now: DateTime<Utc>,
    ) -> Result<Self, LoanError> {
        if !request.principal.is_positive() {
            return Err(LoanError::InvalidPrincipal);
        }
        validate_duration(request.duration_days)?;

        Ok(Self {
            id: LoanId::new(),
            user_id,
            principal: request.principal,
            outstanding: Money::ZERO,
            total_repayment: Money::ZERO,
            status: LoanStatus::Pending,
            payment_status: PaymentStatus::NotStarted,
            category: request.category,
            duration_days: request.duration_days,
            disbursed_at: None,
            repayment_date: None,
            last_penalty_date: None,
            rejection_reason: None,
            trace_id: TraceId::new(),
            history: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns true if this loan blocks the borrower from applying again.
    #[must_use]
    pub fn is_active(&self) -> bool {
        match self.status {
            LoanStatus::Pending => true,
            LoanStatus::Accepted => self.outstanding.is_positive(),
            LoanStatus::Rejected => false,
        }
    }

    /// Returns true if the loan is accepted, owes money, and is past due at `now`.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == LoanStatus::Accepted
            && self.outstanding.is_positive()
            && self.repayment_date.is_some_and(|due| due < now)
    }

    /// Returns true if the one-time overdue fee has been charged.
    #[must_use]
    pub fn overdue_fee_charged(&self) -> bool {
        self.history
            .iter()
            .any(|h| h.action == HistoryAction::OverdueFee)
    }

    /// Disburses a pending loan.
    ///
    /// Sets `outstanding` to the quoted total, accepts the loan, and starts
    /// repayment. Overrides replace the requested principal or term.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the loan is pending, or a
    /// validation error for bad overrides.
    pub fn disburse(
        &mut self,
        pricing: &LoanPricing,
        overrides: DisbursementOverrides,
        trace_id: TraceId,
        now: DateTime<Utc>,
    ) -> Result<LoanQuote, LoanError> {
        if self.status != LoanStatus::Pending {
            return Err(LoanError::InvalidTransition {
                from: self.status,
                to: LoanStatus::Accepted,
            });
        }

        let principal = overrides.amount.unwrap_or(self.principal);
        let duration_days =
            validate_duration(overrides.duration_days.unwrap_or(self.duration_days))?;
        let quote = pricing.quote(principal, self.category, duration_days)?;

        self.principal = principal;
        self.duration_days = duration_days;
        self.total_repayment = quote.total_repayment;
        self.outstanding = quote.total_repayment;
        self.status = LoanStatus::Accepted;
        self.payment_status = PaymentStatus::InProgress;
        self.disbursed_at = Some(now);
        self.repayment_date = Some(now + Duration::days(i64::from(duration_days)));
        self.record(HistoryAction::Disbursement, quote.total_repayment, trace_id, now);

        Ok(quote)
    }

    /// Applies a repayment of up to `requested`.
    ///
    /// Returns the amount actually applied: `min(requested, outstanding)`.
    ///
    /// # Errors
    ///
    /// Returns `ZeroRepayment` for a zero amount and `NotRepayable` unless the
    /// loan is accepted with a balance owed.
    pub fn apply_repayment(
        &mut self,
        requested: Money,
        trace_id: TraceId,
        now: DateTime<Utc>,
    ) -> Result<Money, LoanError> {
        if !requested.is_positive() {
            return Err(LoanError::ZeroRepayment);
        }
        self.ensure_repayable()?;

        let paid = requested.min(self.outstanding);
        self.outstanding = self.outstanding.checked_sub(paid)?;
        if self.outstanding.is_zero() {
            self.payment_status = PaymentStatus::Complete;
        }
        self.record(HistoryAction::Repayment, paid, trace_id, now);

        Ok(paid)
    }

    /// Charges today's late penalty.
    ///
    /// A penalty that floors to zero still marks the day as charged but adds
    /// no history entry.
    ///
    /// # Errors
    ///
    /// Returns `NotOverdue` if the loan is not past due, or `AlreadyPenalized`
    /// if `today` was already charged.
    pub fn apply_penalty(
        &mut self,
        pricing: &LoanPricing,
        today: NaiveDate,
        trace_id: TraceId,
        now: DateTime<Utc>,
    ) -> Result<Money, LoanError> {
        if !self.is_overdue(now) {
            return Err(LoanError::NotOverdue);
        }
        if self.last_penalty_date == Some(today) {
            return Err(LoanError::AlreadyPenalized(today));
        }

        let penalty = pricing.daily_penalty(self.principal)?;
        self.last_penalty_date = Some(today);
        if penalty.is_positive() {
            self.outstanding = self.outstanding.checked_add(penalty)?;
            self.record(HistoryAction::Penalty, penalty, trace_id, now);
        }

        Ok(penalty)
    }

    /// Charges the one-time overdue fee.
    ///
    /// # Errors
    ///
    /// Returns `OverdueFeeAlreadyCharged` on a second call, or `NotRepayable`
    /// if nothing is owed.
    pub fn apply_overdue_fee(
        &mut self,
        fee: Money,
        trace_id: TraceId,
        now: DateTime<Utc>,
    ) -> Result<Money, LoanError> {
        if self.overdue_fee_charged() {
            return Err(LoanError::OverdueFeeAlreadyCharged);
        }
        self.ensure_repayable()?;
        if fee.is_zero() {
            return Ok(Money::ZERO);
        }

        self.outstanding = self.outstanding.checked_add(fee)?;
        self.record(HistoryAction::OverdueFee, fee, trace_id, now);

        Ok(fee)
    }

    /// Rejects a pending loan.
    ///
    /// # Errors
    ///
    /// Returns `RejectionReasonRequired` for a blank reason and
    /// `InvalidTransition` unless the loan is pending.
    pub fn mark_rejected(&mut self, reason: &str, now: DateTime<Utc>) -> Result<(), LoanError> {
        if reason.trim().is_empty() {
            return Err(LoanError::RejectionReasonRequired);
        }
        if self.status != LoanStatus::Pending {
            return Err(LoanError::InvalidTransition {
                from: self.status,
                to: LoanStatus::Rejected,
            });
        }

        self.status = LoanStatus::Rejected;
        self.outstanding = Money::ZERO;
        self.rejection_reason = Some(reason.trim().to_string());
        self.updated_at = now;

        Ok(())
    }

    fn ensure_repayable(&self) -> Result<(), LoanError> {
        if self.status != LoanStatus::Accepted || self.outstanding.is_zero() {
            return Err(LoanError::NotRepayable {
                status: self.status,
                outstanding: self.outstanding,
            });
        }
        Ok(())
    }

    fn record(
        &mut self,
        action: HistoryAction,
        amount: Money,
        trace_id: TraceId,
        now: DateTime<Utc>,
    ) {
        let sequence = self.history.last().map_or(1, |h| h.sequence.saturating_add(1));
        self.history.push(RepaymentHistoryEntry {
            sequence,
            amount,
            resulting_outstanding: self.outstanding,
            action,
            trace_id,
            recorded_at: now,
        });
        self.trace_id = trace_id;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::types::LoanCategory;
    use kudi_shared::config::LoanConfig;

    fn money(minor: i64) -> Money {
        Money::new(minor).unwrap()
    }

    fn pricing() -> LoanPricing {
        LoanPricing::from_config(&LoanConfig::default()).unwrap()
    }

    fn pending_loan(principal: i64, days: u32) -> LoanAccount {
        LoanAccount::open(
            UserId::new(),
            &NewLoanRequest {
                principal: money(principal),
                category: LoanCategory::Working,
                duration_days: days,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn disbursed_loan(principal: i64, days: u32) -> LoanAccount {
        let mut loan = pending_loan(principal, days);
        loan.disburse(&pricing(), DisbursementOverrides::default(), TraceId::new(), Utc::now())
            .unwrap();
        loan
    }

    #[test]
    fn test_open_validates_request() {
        let user = UserId::new();
        let now = Utc::now();
        let zero = NewLoanRequest {
            principal: Money::ZERO,
            category: LoanCategory::Personal,
            duration_days: 30,
        };
        assert!(matches!(
            LoanAccount::open(user, &zero, now),
            Err(LoanError::InvalidPrincipal)
        ));

        let too_long = NewLoanRequest {
            principal: money(1_000),
            category: LoanCategory::Personal,
            duration_days: 366,
        };
        assert!(matches!(
            LoanAccount::open(user, &too_long, now),
            Err(LoanError::InvalidDuration(366))
        ));
    }

    #[test]
    fn test_disburse_scenario() {
        let mut loan = pending_loan(100_000, 30);
        let trace = TraceId::new();
        let now = Utc::now();

        let quote = loan
            .disburse(&pricing(), DisbursementOverrides::default(), trace, now)
            .unwrap();

        assert_eq!(quote.total_repayment, money(104_500));
        assert_eq!(loan.outstanding, money(104_500));
        assert_eq!(loan.status, LoanStatus::Accepted);
        assert_eq!(loan.payment_status, PaymentStatus::InProgress);
        assert_eq!(loan.repayment_date, Some(now + Duration::days(30)));
        assert_eq!(loan.trace_id, trace);
        assert_eq!(loan.history.len(), 1);
        assert_eq!(loan.history[0].action, HistoryAction::Disbursement);
        assert_eq!(loan.history[0].sequence, 1);
    }

    #[test]
    fn test_disburse_with_overrides() {
        let mut loan = pending_loan(100_000, 30);
        let overrides = DisbursementOverrides {
            amount: Some(money(50_000)),
            duration_days: Some(60),
        };
        let quote = loan
            .disburse(&pricing(), overrides, TraceId::new(), Utc::now())
            .unwrap();

        // 50_000 * 0.04 * 2 = 4_000
        assert_eq!(quote.interest, money(4_000));
        assert_eq!(loan.principal, money(50_000));
        assert_eq!(loan.duration_days, 60);
        assert_eq!(loan.outstanding, money(54_500));
    }

    #[test]
    fn test_disburse_twice_fails() {
        let mut loan = disbursed_loan(100_000, 30);
        let result = loan.disburse(
            &pricing(),
            DisbursementOverrides::default(),
            TraceId::new(),
            Utc::now(),
        );
        assert!(matches!(result, Err(LoanError::InvalidTransition { .. })));
    }

    #[test]
    fn test_full_repayment_completes() {
        let mut loan = disbursed_loan(100_000, 30);
        let paid = loan
            .apply_repayment(money(104_500), TraceId::new(), Utc::now())
            .unwrap();

        assert_eq!(paid, money(104_500));
        assert!(loan.outstanding.is_zero());
        assert_eq!(loan.payment_status, PaymentStatus::Complete);
        assert!(!loan.is_active());
    }

    #[test]
    fn test_overpayment_is_capped() {
        let mut loan = disbursed_loan(100_000, 30);
        let paid = loan
            .apply_repayment(money(200_000), TraceId::new(), Utc::now())
            .unwrap();
        assert_eq!(paid, money(104_500));
        assert!(loan.outstanding.is_zero());
    }

    #[test]
    fn test_repay_pending_or_settled_fails() {
        let mut pending = pending_loan(1_000, 30);
        assert!(matches!(
            pending.apply_repayment(money(10), TraceId::new(), Utc::now()),
            Err(LoanError::NotRepayable { .. })
        ));

        let mut settled = disbursed_loan(100_000, 30);
        settled
            .apply_repayment(money(104_500), TraceId::new(), Utc::now())
            .unwrap();
        assert!(matches!(
            settled.apply_repayment(money(10), TraceId::new(), Utc::now()),
            Err(LoanError::NotRepayable { .. })
        ));
    }

    #[test]
    fn test_penalty_once_per_day() {
        let mut loan = disbursed_loan(100_000, 1);
        let later = Utc::now() + Duration::days(3);
        let today = later.date_naive();

        let penalty = loan
            .apply_penalty(&pricing(), today, TraceId::new(), later)
            .unwrap();
        assert_eq!(penalty, money(1_000));
        assert_eq!(loan.outstanding, money(104_500 + 1_000));

        let again = loan.apply_penalty(&pricing(), today, TraceId::new(), later);
        assert!(matches!(again, Err(LoanError::AlreadyPenalized(_))));
        assert_eq!(loan.outstanding, money(105_500));

        let tomorrow = later + Duration::days(1);
        loan.apply_penalty(&pricing(), tomorrow.date_naive(), TraceId::new(), tomorrow)
            .unwrap();
        assert_eq!(loan.outstanding, money(106_500));
    }

    #[test]
    fn test_penalty_requires_overdue() {
        let mut loan = disbursed_loan(100_000, 30);
        let now = Utc::now();
        assert!(matches!(
            loan.apply_penalty(&pricing(), now.date_naive(), TraceId::new(), now),
            Err(LoanError::NotOverdue)
        ));
    }

    #[test]
    fn test_overdue_fee_charged_once() {
        let mut loan = disbursed_loan(100_000, 30);
        let now = Utc::now();
        loan.apply_overdue_fee(money(250), TraceId::new(), now)
            .unwrap();
        assert_eq!(loan.outstanding, money(104_750));
        assert!(loan.overdue_fee_charged());
        assert!(matches!(
            loan.apply_overdue_fee(money(250), TraceId::new(), now),
            Err(LoanError::OverdueFeeAlreadyCharged)
        ));
    }

    #[test]
    fn test_reject_pending_only() {
        let mut loan = pending_loan(1_000, 30);
        assert!(matches!(
            loan.mark_rejected("  ", Utc::now()),
            Err(LoanError::RejectionReasonRequired)
        ));
        loan.mark_rejected("insufficient credit history", Utc::now())
            .unwrap();
        assert_eq!(loan.status, LoanStatus::Rejected);
        assert!(loan.outstanding.is_zero());
        assert!(loan.history.is_empty());

        let mut accepted = disbursed_loan(1_000, 30);
        assert!(matches!(
            accepted.mark_rejected("too late", Utc::now()),
            Err(LoanError::InvalidTransition { .. })
        ));
    }
}
