//! Price oracle and clock trait definitions.
//!
//! These traits define the interface the settlement core expects from its
//! external collaborators. The orchestrator is the only component that
//! talks to an oracle; the engine only ever sees [`PricePoint`] values.

mod hermes;

use async_trait::async_trait;

use crate::domain::{FeedId, PricePoint};
use crate::error::OracleError;

pub use hermes::HermesOracle;

/// Source of the latest published price for a feed.
///
/// Implementations may fail or return stale data; callers are responsible
/// for bounding request time and checking `publish_time` against their
/// staleness budget.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Fetch the most recent price sample for `feed`.
    async fn latest_price(&self, feed: &FeedId) -> Result<PricePoint, OracleError>;

    /// Get the oracle name for logging/debugging.
    fn source_name(&self) -> &'static str;
}

/// Monotonic wall-clock source, unix seconds.
pub trait Clock: Send + Sync {
    /// Current time in unix seconds.
    fn now(&self) -> i64;
}

/// System wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        use std::time::{SystemTime, UNIX_EPOCH};

        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}
