//! Application configuration loaded from environment variables.

use std::time::Duration;

use domain::{ConsolidationRules, DEFAULT_MINIMUM_QUANTITY, PricePolicy};
use procurement::{CoordinatorConfig, SupplierSettings};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL connection string (unset: in-memory store)
/// - `MIN_ORDER_QUANTITY`: consolidation minimum (default: `1000`)
/// - `PRICE_POLICY`: `reject` or `keep-first` (default: `reject`)
/// - `BATCH_CONCURRENCY`: orders submitted at once by a batch (default: `1`)
/// - `REPROCESS_INTERVAL_SECS`: periodic batch interval (unset: off)
///
/// Supplier settings come from [`SupplierSettings::from_env`].
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub rules: ConsolidationRules,
    pub batch_concurrency: usize,
    pub reprocess_interval: Option<Duration>,
    pub supplier: SupplierSettings,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: env_parse("PORT").unwrap_or(defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: std::env::var("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            rules: ConsolidationRules {
                minimum_quantity: env_parse("MIN_ORDER_QUANTITY")
                    .unwrap_or(DEFAULT_MINIMUM_QUANTITY),
                price_policy: env_parse::<PricePolicy>("PRICE_POLICY").unwrap_or_default(),
            },
            batch_concurrency: env_parse("BATCH_CONCURRENCY")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.batch_concurrency),
            reprocess_interval: env_parse("REPROCESS_INTERVAL_SECS")
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs),
            supplier: SupplierSettings::from_env(),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Coordinator settings derived from this configuration.
    pub fn coordinator(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            rules: self.rules,
            retry: self.supplier.retry_policy(),
            batch_concurrency: self.batch_concurrency,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            rules: ConsolidationRules::default(),
            batch_concurrency: 1,
            reprocess_interval: None,
            supplier: SupplierSettings::default(),
        }
    }
}
