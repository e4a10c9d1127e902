//! Loan pricing: interest, fees, and penalties.
//!
//! Every amount is floored to a whole minor unit exactly once, at the end of
//! each calculation.

use kudi_shared::config::LoanConfig;
use kudi_shared::types::Money;
use rust_decimal::Decimal;

use super::error::LoanError;
use super::types::{LoanCategory, LoanQuote};

/// Days in one interest period.
const DAYS_PER_PERIOD: u32 = 30;

/// Loan pricing parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanPricing {
    /// Flat fee added to every disbursed loan.
    pub fixed_fee: Money,
    /// Periodic rate for working-capital loans.
    pub working_rate: Decimal,
    /// Periodic rate for every other category.
    pub standard_rate: Decimal,
    /// Fraction of the principal charged per overdue day.
    pub daily_penalty_rate: Decimal,
    /// One-time fee on first becoming overdue (zero disables it).
    pub overdue_fee: Money,
}

impl LoanPricing {
    /// Builds pricing from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured fee is negative.
    pub fn from_config(config: &LoanConfig) -> Result<Self, LoanError> {
        Ok(Self {
            fixed_fee: Money::new(config.fixed_fee_minor)?,
            working_rate: config.working_rate,
            standard_rate: config.standard_rate,
            daily_penalty_rate: config.daily_penalty_rate,
            overdue_fee: Money::new(config.overdue_fee_minor)?,
        })
    }

    /// Returns the periodic interest rate for a category.
    #[must_use]
    pub fn rate_for(&self, category: LoanCategory) -> Decimal {
        match category {
            LoanCategory::Working => self.working_rate,
            LoanCategory::Personal | LoanCategory::Business | LoanCategory::Emergency => {
                self.standard_rate
            }
        }
    }

    /// Number of interest periods for a term: `max(1, days / 30)` as an exact decimal.
    #[must_use]
    pub fn periods(duration_days: u32) -> Decimal {
        let periods = Decimal::from(duration_days) / Decimal::from(DAYS_PER_PERIOD);
        periods.max(Decimal::ONE)
    }

    /// Prices a loan.
    ///
    /// `interest = floor(principal * rate * max(1, days / 30))` and
    /// `total = principal + fee + interest`.
    ///
    /// # Errors
    ///
    /// Returns an error on a zero principal or an arithmetic overflow.
    pub fn quote(
        &self,
        principal: Money,
        category: LoanCategory,
        duration_days: u32,
    ) -> Result<LoanQuote, LoanError> {
        if !principal.is_positive() {
            return Err(LoanError::InvalidPrincipal);
        }

        let factor = self.rate_for(category) * Self::periods(duration_days);
        let interest = principal.apply_rate(factor)?;
        let total_repayment = principal
            .checked_add(self.fixed_fee)?
            .checked_add(interest)?;

        Ok(LoanQuote {
            principal,
            fee: self.fixed_fee,
            interest,
            total_repayment,
        })
    }

    /// Penalty for one overdue day: `floor(principal * daily_penalty_rate)`.
    ///
    /// # Errors
    ///
    /// Returns an error on an arithmetic overflow.
    pub fn daily_penalty(&self, principal: Money) -> Result<Money, LoanError> {
        Ok(principal.apply_rate(self.daily_penalty_rate)?)
    }
}
