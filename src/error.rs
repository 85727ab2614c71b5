use thiserror::Error;

use crate::domain::{MarketKey, MarketStatus, UserId};

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Settlement-engine errors with structured variants.
///
/// Everything here is returned to the immediate caller. The orchestrator
/// treats any variant affecting a single market as "skip this market,
/// continue the cycle"; [`EngineError::ConservationViolated`] additionally
/// freezes the affected market against further mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("market {key} not found")]
    MarketNotFound { key: MarketKey },

    #[error("no position for {user} in market {key}")]
    PositionNotFound { key: MarketKey, user: UserId },

    #[error("market {key} is not open for betting (status {status})")]
    MarketNotOpen { key: MarketKey, status: MarketStatus },

    #[error("market {key} has already ended")]
    MarketExpired { key: MarketKey },

    #[error("market {key} has not ended yet")]
    MarketNotEnded { key: MarketKey },

    #[error("market {key} is not closed (status {status})")]
    MarketNotClosed { key: MarketKey, status: MarketStatus },

    #[error("market {key} is not settled yet (status {status})")]
    MarketNotSettled { key: MarketKey, status: MarketStatus },

    #[error("market {key} is already settled (status {status})")]
    MarketAlreadySettled { key: MarketKey, status: MarketStatus },

    #[error("bet of {gross} nets below the minimum stake of {minimum}")]
    BetTooSmall { gross: u64, minimum: u64 },

    #[error("fee of {fee_bps} bps exceeds the 10000 bps ceiling")]
    FeeBpsOutOfRange { fee_bps: u16 },

    #[error("position for {user} in market {key} already claimed")]
    AlreadyClaimed { key: MarketKey, user: UserId },

    #[error("nothing to claim for {user} in market {key}")]
    NothingToClaim { key: MarketKey, user: UserId },

    #[error("resolution price is stale: age {age_seconds}s exceeds {max_staleness_seconds}s")]
    StalePrice {
        age_seconds: i64,
        max_staleness_seconds: i64,
    },

    #[error("price exponents {a} and {b} cannot be compared exactly")]
    IncomparablePrices { a: i32, b: i32 },

    #[error("arithmetic overflow updating market {key}")]
    Overflow { key: MarketKey },

    #[error(
        "conservation violated for market {key}: pools hold {pool_total}, positions sum to {position_total}"
    )]
    ConservationViolated {
        key: MarketKey,
        pool_total: u64,
        position_total: u64,
    },

    #[error("market {key} is frozen after an invariant violation")]
    MarketFrozen { key: MarketKey },
}

/// Oracle errors. All variants are transient from the orchestrator's point
/// of view: the affected market is retried on the next polling cycle.
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("price for feed {feed} is stale: age {age_seconds}s exceeds {max_staleness_seconds}s")]
    Stale {
        feed: String,
        age_seconds: i64,
        max_staleness_seconds: i64,
    },

    #[error("oracle request timed out after {timeout_seconds}s")]
    Timeout { timeout_seconds: u64 },

    #[error("oracle transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed {feed} missing from oracle response")]
    MissingFeed { feed: String },

    #[error("malformed oracle response: {reason}")]
    Malformed { reason: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
