//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::Currency;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Loan pricing and penalty configuration.
    #[serde(default)]
    pub loan: LoanConfig,
    /// Idempotency record configuration.
    #[serde(default)]
    pub idempotency: IdempotencyConfig,
    /// Wallet/bill-payment provider configuration.
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Scheduled job configuration.
    #[serde(default)]
    pub jobs: JobsConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Loan pricing configuration.
///
/// Fees are whole minor units; rates are exact decimals (0.04 = 4%).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoanConfig {
    /// Flat fee added to every disbursed loan, in minor units.
    pub fixed_fee_minor: i64,
    /// Monthly interest rate for working-capital loans.
    pub working_rate: Decimal,
    /// Monthly interest rate for every other category.
    pub standard_rate: Decimal,
    /// Fraction of the principal charged per overdue day.
    pub daily_penalty_rate: Decimal,
    /// One-time fee charged the first time a loan is found overdue (0 disables).
    pub overdue_fee_minor: i64,
    /// Currency loans are booked in.
    pub currency: Currency,
}

impl Default for LoanConfig {
    fn default() -> Self {
        Self {
            fixed_fee_minor: 500,
            working_rate: Decimal::new(4, 2),
            standard_rate: Decimal::new(10, 2),
            daily_penalty_rate: Decimal::new(1, 2),
            overdue_fee_minor: 0,
            currency: Currency::Ngn,
        }
    }
}

/// Idempotency record configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdempotencyConfig {
    /// How long a cached response stays valid.
    pub ttl_secs: u64,
    /// How many times a losing concurrent request polls for the winner's response.
    pub wait_attempts: u32,
    /// Delay between polls in milliseconds.
    pub wait_interval_ms: u64,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 86_400, // 24 hours
            wait_attempts: 20,
            wait_interval_ms: 100,
        }
    }
}

/// Wallet provider configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider API base URL.
    pub base_url: String,
    /// Provider API key.
    pub api_key: String,
    /// Upper bound for a single provider call in milliseconds.
    pub timeout_ms: u64,
    /// Response code the provider uses for success.
    pub success_code: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9090".to_string(),
            api_key: String::new(),
            timeout_ms: 15_000,
            success_code: "00".to_string(),
        }
    }
}

/// Scheduled job intervals.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Interval between penalty accrual runs.
    pub penalty_interval_secs: u64,
    /// Interval between reconciliation runs.
    pub reconciliation_interval_secs: u64,
    /// Interval between expired idempotency record purges.
    pub purge_interval_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            penalty_interval_secs: 86_400,
            reconciliation_interval_secs: 3_600,
            purge_interval_secs: 3_600,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("KUDI").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
