//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file with environment variable
//! overrides for deployment-specific values (database path, oracle
//! endpoint). Defaults mirror the production market parameters: 1% fee,
//! 0.01 SOL minimum net stake, 15-minute epochs, 60-second staleness bound.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

use crate::domain::{FeedId, BPS_DENOMINATOR};
use crate::engine::MarketParams;
use crate::error::{ConfigError, Result};
use crate::orchestrator;

/// SOL/USD Pyth feed id, the default market feed.
pub const SOL_USD_FEED_ID: &str =
    "0xef0d8b6fda2ceba41da15d4095d1da392a0d2f8ed0c6c7bc0f4cfac8c280b56d";

/// Main application configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Market parameters fixed for the engine's lifetime.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    /// Fee taken from every gross bet, basis points.
    pub fee_bps: u16,
    /// Minimum acceptable net stake, minor units (lamports).
    pub min_bet_lamports: u64,
    /// Epoch length in seconds.
    pub epoch_seconds: i64,
    /// Price feed the markets track.
    pub feed_id: String,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            fee_bps: 100,
            min_bet_lamports: 10_000_000,
            epoch_seconds: 900,
            feed_id: SOL_USD_FEED_ID.into(),
        }
    }
}

/// Price oracle connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    /// Hermes REST endpoint.
    pub endpoint: String,
    /// Maximum age of a price sample accepted for settlement, seconds.
    pub max_staleness_seconds: i64,
    /// Upper bound on any single oracle request, seconds.
    pub request_timeout_seconds: u64,
    /// In-process price cache TTL, milliseconds.
    pub cache_ttl_ms: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://hermes.pyth.network".into(),
            max_staleness_seconds: 60,
            request_timeout_seconds: 10,
            cache_ttl_ms: 2_000,
        }
    }
}

/// Settlement loop timing.
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    /// Interval between settlement cycles, seconds.
    pub poll_interval_seconds: u64,
    /// Create the next market once its boundary is this close, seconds.
    pub create_lookahead_seconds: i64,
    /// Cancel a market still unresolved this long after its end, seconds.
    pub cancel_after_seconds: i64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 30,
            create_lookahead_seconds: 60,
            cancel_after_seconds: 900,
        }
    }
}

/// Archive database settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path. Empty disables the archive entirely.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "updown.sqlite".into(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl LoggingConfig {
    /// Initialize the tracing subscriber with this logging configuration.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, applying environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;

        let mut config: Self = toml::from_str(&content).map_err(ConfigError::Parse)?;

        // Deployment-specific overrides come from the environment, never
        // from the checked-in config file.
        if let Ok(path) = std::env::var("UPDOWN_DATABASE_PATH") {
            config.database.path = path;
        }
        if let Ok(endpoint) = std::env::var("UPDOWN_ORACLE_ENDPOINT") {
            config.oracle.endpoint = endpoint;
        }

        config.validate()?;

        Ok(config)
    }

    /// Check every field the engine and orchestrator will trust.
    pub fn validate(&self) -> Result<()> {
        if u64::from(self.market.fee_bps) > BPS_DENOMINATOR {
            return Err(ConfigError::InvalidValue {
                field: "market.fee_bps",
                reason: format!("{} exceeds 10000", self.market.fee_bps),
            }
            .into());
        }
        if self.market.epoch_seconds <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "market.epoch_seconds",
                reason: "must be positive".into(),
            }
            .into());
        }
        if self.market.feed_id.is_empty() {
            return Err(ConfigError::MissingField {
                field: "market.feed_id",
            }
            .into());
        }
        if self.oracle.endpoint.is_empty() {
            return Err(ConfigError::MissingField {
                field: "oracle.endpoint",
            }
            .into());
        }
        Url::parse(&self.oracle.endpoint).map_err(|e| ConfigError::InvalidValue {
            field: "oracle.endpoint",
            reason: e.to_string(),
        })?;
        if self.oracle.max_staleness_seconds <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "oracle.max_staleness_seconds",
                reason: "must be positive".into(),
            }
            .into());
        }
        if self.oracle.request_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "oracle.request_timeout_seconds",
                reason: "must be positive".into(),
            }
            .into());
        }
        if self.orchestrator.poll_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "orchestrator.poll_interval_seconds",
                reason: "must be positive".into(),
            }
            .into());
        }
        Ok(())
    }

    /// The feed all markets track.
    #[must_use]
    pub fn feed(&self) -> FeedId {
        FeedId::new(self.market.feed_id.clone())
    }

    /// Engine parameters derived from this configuration.
    #[must_use]
    pub fn market_params(&self) -> MarketParams {
        MarketParams {
            fee_bps: self.market.fee_bps,
            min_bet: self.market.min_bet_lamports,
            epoch_seconds: self.market.epoch_seconds,
            max_staleness_seconds: self.oracle.max_staleness_seconds,
        }
    }

    /// Orchestrator settings derived from this configuration.
    #[must_use]
    pub fn orchestrator_settings(&self) -> orchestrator::Settings {
        orchestrator::Settings {
            poll_interval: Duration::from_secs(self.orchestrator.poll_interval_seconds),
            create_lookahead_seconds: self.orchestrator.create_lookahead_seconds,
            cancel_after_seconds: self.orchestrator.cancel_after_seconds,
            oracle_timeout: Duration::from_secs(self.oracle.request_timeout_seconds),
        }
    }

    /// Parsed oracle endpoint. Valid after `validate()`.
    pub fn oracle_endpoint(&self) -> Result<Url> {
        Ok(Url::parse(&self.oracle.endpoint)?)
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}
