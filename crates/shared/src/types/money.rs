//! Money type in integer minor units.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts are stored and exchanged as non-negative `i64` minor units
//! (kobo, cents). Decimal major-unit values only appear at the boundary,
//! through [`Money::from_major`] and [`Money::to_major`].

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when constructing or combining money amounts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// Amount is below zero.
    #[error("Amount cannot be negative: {0}")]
    Negative(String),

    /// Amount has more precision than the currency's minor unit.
    #[error("Amount {amount} is not a whole number of {currency} minor units")]
    FractionalMinorUnits {
        /// The offending major-unit amount.
        amount: String,
        /// The currency the amount was given in.
        currency: Currency,
    },

    /// Amount could not be parsed as a decimal.
    #[error("Invalid amount: {0}")]
    Invalid(String),

    /// Arithmetic left the representable range.
    #[error("Amount overflow")]
    Overflow,
}

/// A non-negative amount of money in minor currency units.
///
/// The currency travels separately (ledger entries and wallets carry their own
/// currency code); `Money` only guarantees integer, non-negative arithmetic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Money(i64);

impl Money {
    /// Zero minor units.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from minor units.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Negative` if `minor` is below zero.
    pub fn new(minor: i64) -> Result<Self, MoneyError> {
        if minor < 0 {
            return Err(MoneyError::Negative(minor.to_string()));
        }
        Ok(Self(minor))
    }

    /// Converts a major-unit decimal (e.g. naira) into minor units (kobo).
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative, finer than one minor unit,
    /// or does not fit in `i64`.
    pub fn from_major(amount: Decimal, currency: Currency) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative(amount.to_string()));
        }

        let scaled = amount
            .checked_mul(Decimal::from(currency.minor_units_per_major()))
            .ok_or(MoneyError::Overflow)?;

        if scaled.fract() != Decimal::ZERO {
            return Err(MoneyError::FractionalMinorUnits {
                amount: amount.to_string(),
                currency,
            });
        }

        let minor = i64::try_from(scaled).map_err(|_| MoneyError::Overflow)?;
        Self::new(minor)
    }

    /// Parses a major-unit decimal string such as `"1045.50"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a decimal or fails [`Money::from_major`].
    pub fn parse_major(amount: &str, currency: Currency) -> Result<Self, MoneyError> {
        let value: Decimal = amount
            .trim()
            .parse()
            .map_err(|_| MoneyError::Invalid(amount.to_string()))?;
        Self::from_major(value, currency)
    }

    /// Returns the amount in major units (e.g. naira) as an exact decimal.
    #[must_use]
    pub fn to_major(self, currency: Currency) -> Decimal {
        Decimal::new(self.0, currency.exponent())
    }

    /// Returns the raw minor-unit value.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns true if the amount is greater than zero.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Adds two amounts.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` if the sum does not fit in `i64`.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(MoneyError::Overflow)
    }

    /// Subtracts `other`, failing instead of going below zero.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Negative` if `other` exceeds `self`.
    pub fn checked_sub(self, other: Self) -> Result<Self, MoneyError> {
        let diff = self.0 - other.0;
        Self::new(diff)
    }

    /// Subtracts `other`, flooring the result at zero.
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        if other.0 >= self.0 {
            Self::ZERO
        } else {
            Self(self.0 - other.0)
        }
    }

    /// Multiplies by a non-negative rate and floors to a whole minor unit.
    ///
    /// This is the single rounding rule for interest, fee, and penalty math.
    ///
    /// # Errors
    ///
    /// Returns an error if the rate is negative or the result overflows.
    pub fn apply_rate(self, rate: Decimal) -> Result<Self, MoneyError> {
        if rate.is_sign_negative() && !rate.is_zero() {
            return Err(MoneyError::Negative(rate.to_string()));
        }
        let product = Decimal::from(self.0)
            .checked_mul(rate)
            .ok_or(MoneyError::Overflow)?
            .round_dp_with_strategy(0, RoundingStrategy::ToZero);
        let minor = i64::try_from(product).map_err(|_| MoneyError::Overflow)?;
        Self::new(minor)
    }
}

impl TryFrom<i64> for Money {
    type Error = MoneyError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for i64 {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO 4217 currency codes supported by the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Nigerian Naira
    Ngn,
    /// US Dollar
    Usd,
    /// Pound Sterling
    Gbp,
    /// Euro
    Eur,
}

impl Currency {
    /// Returns the ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Ngn => "NGN",
            Self::Usd => "USD",
            Self::Gbp => "GBP",
            Self::Eur => "EUR",
        }
    }

    /// Number of decimal places of the minor unit.
    #[must_use]
    pub const fn exponent(self) -> u32 {
        match self {
            Self::Ngn | Self::Usd | Self::Gbp | Self::Eur => 2,
        }
    }

    /// Minor units in one major unit (100 kobo per naira).
    #[must_use]
    pub const fn minor_units_per_major(self) -> i64 {
        10_i64.pow(self.exponent())
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NGN" => Ok(Self::Ngn),
            "USD" => Ok(Self::Usd),
            "GBP" => Ok(Self::Gbp),
            "EUR" => Ok(Self::Eur),
            _ => Err(format!("Unknown currency: {s}")),
        }
    }
}

#[cfg(test)]
#[path = "money_tests.rs"]
mod tests;
