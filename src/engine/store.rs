//! Authoritative market collection with per-key locking.
//!
//! Markets live in a concurrent map partitioned by [`MarketKey`]. Every
//! mutation happens under that entry's lock, so a bet being evaluated
//! against a market's status can never race the orchestrator flipping that
//! same status: whichever takes the lock first wins, and the other observes
//! the updated state. Operations on distinct markets never contend.

use dashmap::DashMap;

use crate::domain::{BetSide, Market, MarketKey, MarketStatus, PricePoint};
use crate::error::EngineError;

#[derive(Debug)]
struct MarketCell {
    market: Market,
    /// Set after a conservation failure; freezes all further mutation.
    frozen: bool,
}

/// Concurrent store of market aggregates.
#[derive(Debug, Default)]
pub struct MarketStore {
    markets: DashMap<MarketKey, MarketCell>,
}

impl MarketStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a market unless one already exists under its key.
    ///
    /// Returns true if the market was inserted. Existence is keyed, not
    /// timed: re-running the orchestrator's create step against the same
    /// boundary is a no-op once the market exists.
    pub fn insert_if_absent(&self, market: Market) -> bool {
        let mut inserted = false;
        self.markets.entry(market.key().clone()).or_insert_with(|| {
            inserted = true;
            MarketCell {
                market,
                frozen: false,
            }
        });
        inserted
    }

    /// True if a market exists under `key`.
    #[must_use]
    pub fn contains(&self, key: &MarketKey) -> bool {
        self.markets.contains_key(key)
    }

    /// Snapshot of one market.
    #[must_use]
    pub fn get(&self, key: &MarketKey) -> Option<Market> {
        self.markets.get(key).map(|cell| cell.market.clone())
    }

    /// True if the market was frozen by an invariant failure.
    #[must_use]
    pub fn is_frozen(&self, key: &MarketKey) -> bool {
        self.markets.get(key).map(|cell| cell.frozen).unwrap_or(false)
    }

    /// Freeze a market against further mutation.
    pub fn freeze(&self, key: &MarketKey) {
        if let Some(mut cell) = self.markets.get_mut(key) {
            cell.frozen = true;
        }
    }

    /// Snapshots of all markets, most recent epoch first.
    #[must_use]
    pub fn list(&self) -> Vec<Market> {
        let mut markets: Vec<Market> = self
            .markets
            .iter()
            .map(|cell| cell.market.clone())
            .collect();
        markets.sort_by_key(|m| std::cmp::Reverse(m.start_ts()));
        markets
    }

    /// Keys of all markets currently in `status`.
    #[must_use]
    pub fn keys_with_status(&self, status: MarketStatus) -> Vec<MarketKey> {
        self.markets
            .iter()
            .filter(|cell| cell.market.status() == status)
            .map(|cell| cell.market.key().clone())
            .collect()
    }

    /// Credit a net stake to one side of a market's pool.
    ///
    /// Status and expiry are re-validated under the entry lock; lifecycle
    /// lag (expired but still marked Open) is rejected here, not trusted
    /// from a stale status read.
    pub fn place_bet(
        &self,
        key: &MarketKey,
        side: BetSide,
        net: u64,
        now: i64,
    ) -> Result<Market, EngineError> {
        let mut cell = self
            .markets
            .get_mut(key)
            .ok_or_else(|| EngineError::MarketNotFound { key: key.clone() })?;
        if cell.frozen {
            return Err(EngineError::MarketFrozen { key: key.clone() });
        }

        cell.market.credit_stake(side, net, now)?;
        Ok(cell.market.clone())
    }

    /// Transition a market Open -> Closed.
    pub fn close(&self, key: &MarketKey, now: i64) -> Result<Market, EngineError> {
        self.transition(key, |market| market.close(now))
    }

    /// Transition a market Closed -> Resolved against `end`, applying the
    /// staleness gate first: a sample older than `max_staleness_seconds`
    /// is refused and the market stays Closed.
    pub fn resolve(
        &self,
        key: &MarketKey,
        end: PricePoint,
        now: i64,
        max_staleness_seconds: i64,
    ) -> Result<Market, EngineError> {
        if end.is_stale(now, max_staleness_seconds) {
            return Err(EngineError::StalePrice {
                age_seconds: end.age(now),
                max_staleness_seconds,
            });
        }
        self.transition(key, |market| market.resolve(end).map(|_| ()))
    }

    /// Transition a market Open/Closed -> Cancelled.
    pub fn cancel(&self, key: &MarketKey) -> Result<Market, EngineError> {
        self.transition(key, Market::cancel)
    }

    fn transition(
        &self,
        key: &MarketKey,
        apply: impl FnOnce(&mut Market) -> Result<(), EngineError>,
    ) -> Result<Market, EngineError> {
        let mut cell = self
            .markets
            .get_mut(key)
            .ok_or_else(|| EngineError::MarketNotFound { key: key.clone() })?;
        if cell.frozen {
            return Err(EngineError::MarketFrozen { key: key.clone() });
        }

        apply(&mut cell.market)?;
        Ok(cell.market.clone())
    }
}
