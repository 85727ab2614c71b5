//! Settlement engine facade.
//!
//! Wires the fee calculator, market store, and position ledger behind the
//! API the presentation layer calls, and mirrors every accepted mutation
//! into the archive when one is attached. The archive is a best-effort
//! durable mirror: a write failure is logged and never unwinds an
//! in-memory mutation that already happened.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::archive::MarketArchive;
use crate::domain::{
    settlement_payout, split_fee, BetSide, FeedId, Market, MarketKey, MarketStatus, Position,
    PricePoint, UserId,
};
use crate::error::EngineError;
use crate::oracle::Clock;

use super::ledger::PositionLedger;
use super::stats::DashboardStats;
use super::store::MarketStore;

/// Engine-level market parameters, fixed at startup.
#[derive(Debug, Clone, Copy)]
pub struct MarketParams {
    /// Fee taken from every gross bet, basis points.
    pub fee_bps: u16,
    /// Minimum acceptable net stake, minor units.
    pub min_bet: u64,
    /// Epoch length in seconds.
    pub epoch_seconds: i64,
    /// Maximum acceptable age of a resolution price sample.
    pub max_staleness_seconds: i64,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            fee_bps: 100,
            min_bet: 10_000_000,
            epoch_seconds: 900,
            max_staleness_seconds: 60,
        }
    }
}

/// Outcome of an accepted bet.
#[derive(Debug, Clone, Serialize)]
pub struct BetReceipt {
    pub market: MarketKey,
    pub user: UserId,
    pub side: BetSide,
    pub gross: u64,
    pub fee: u64,
    pub net: u64,
}

/// Outcome of a successful claim.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimReceipt {
    pub market: MarketKey,
    pub user: UserId,
    pub payout: u64,
}

/// The market settlement engine.
///
/// Owns authoritative market and position state. Bets and claims may arrive
/// concurrently from many callers; lifecycle transitions come only from the
/// orchestrator. All serialization happens on per-market and per-position
/// entry locks inside the store and ledger.
pub struct SettlementEngine {
    params: MarketParams,
    store: MarketStore,
    ledger: PositionLedger,
    clock: Arc<dyn Clock>,
    archive: Option<Arc<MarketArchive>>,
}

impl SettlementEngine {
    /// Create an engine with no archive attached.
    #[must_use]
    pub fn new(params: MarketParams, clock: Arc<dyn Clock>) -> Self {
        Self {
            params,
            store: MarketStore::new(),
            ledger: PositionLedger::new(),
            clock,
            archive: None,
        }
    }

    /// Attach a durable archive; accepted mutations are mirrored into it.
    #[must_use]
    pub fn with_archive(mut self, archive: Arc<MarketArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Engine parameters.
    #[must_use]
    pub const fn params(&self) -> &MarketParams {
        &self.params
    }

    /// Rehydrate state from archived rows. Intended for startup, before
    /// any concurrent access exists.
    pub fn restore(&self, markets: Vec<Market>, positions: Vec<(MarketKey, UserId, Position)>) {
        for market in markets {
            self.store.insert_if_absent(market);
        }
        for (market, user, position) in positions {
            self.ledger.restore(market, user, position);
        }
    }

    /// Open a market for the epoch of `feed` starting at `start_ts`.
    ///
    /// Idempotent by market key: if the boundary already has a market the
    /// call is a no-op returning `None`.
    pub fn open_market(
        &self,
        feed: FeedId,
        start_ts: i64,
        start: PricePoint,
    ) -> Option<Market> {
        let key = MarketKey::for_epoch(&feed, start_ts);
        let market = Market::open(key, feed, start_ts, self.params.epoch_seconds, start);
        if !self.store.insert_if_absent(market.clone()) {
            return None;
        }

        info!(
            market = %market.key(),
            start_ts = market.start_ts(),
            end_ts = market.end_ts(),
            start_price = %market.start_price(),
            "market opened"
        );
        self.mirror_market(&market);
        Some(market)
    }

    /// True if a market exists for `key`.
    #[must_use]
    pub fn has_market(&self, key: &MarketKey) -> bool {
        self.store.contains(key)
    }

    /// Fetch one market.
    ///
    /// # Errors
    ///
    /// `MarketNotFound` for unknown keys.
    pub fn market(&self, key: &MarketKey) -> Result<Market, EngineError> {
        self.store
            .get(key)
            .ok_or_else(|| EngineError::MarketNotFound { key: key.clone() })
    }

    /// All markets, most recent epoch first.
    #[must_use]
    pub fn markets(&self) -> Vec<Market> {
        self.store.list()
    }

    /// A user's position in one market, if any.
    #[must_use]
    pub fn position(&self, key: &MarketKey, user: &UserId) -> Option<Position> {
        self.ledger.position(key, user)
    }

    /// Place a gross bet on one side of a market.
    ///
    /// Splits the fee, credits the net stake to the market pool and the
    /// user's position, and returns the receipt. Pool and position updates
    /// use the same net amount, keeping conservation intact.
    ///
    /// # Errors
    ///
    /// `BetTooSmall` when the net stake is below the configured minimum,
    /// plus every market-side guard from [`MarketStore::place_bet`].
    pub fn place_bet(
        &self,
        key: &MarketKey,
        user: &UserId,
        side: BetSide,
        gross: u64,
    ) -> Result<BetReceipt, EngineError> {
        let fee_split = split_fee(gross, self.params.fee_bps)?;
        // A zero net stake is rejected even under a zero configured
        // minimum; an empty position must never materialize.
        if fee_split.net == 0 || fee_split.net < self.params.min_bet {
            return Err(EngineError::BetTooSmall {
                gross,
                minimum: self.params.min_bet,
            });
        }

        let now = self.clock.now();
        // Pool first, position second; both are infallible after the pool
        // accepts (a position is bounded by its side's pool total). The
        // conservation check runs at close time, when the market is quiet.
        let market = self.store.place_bet(key, side, fee_split.net, now)?;
        let position = self.ledger.record_stake(key, user, side, fee_split.net)?;

        let receipt = BetReceipt {
            market: key.clone(),
            user: user.clone(),
            side,
            gross,
            fee: fee_split.fee,
            net: fee_split.net,
        };
        info!(
            market = %key,
            user = %user,
            side = %side,
            gross,
            fee = receipt.fee,
            net = receipt.net,
            "bet accepted"
        );
        self.mirror_market(&market);
        self.mirror_position(key, user, &position);
        self.journal_bet(&receipt);
        Ok(receipt)
    }

    /// Claim a settled payout for `(market, user)`, exactly once.
    ///
    /// # Errors
    ///
    /// See [`PositionLedger::claim`]; additionally `MarketNotFound` for
    /// unknown markets and `MarketFrozen` after an invariant failure.
    pub fn claim(&self, key: &MarketKey, user: &UserId) -> Result<ClaimReceipt, EngineError> {
        let market = self.market(key)?;
        if self.store.is_frozen(key) {
            return Err(EngineError::MarketFrozen { key: key.clone() });
        }

        let payout = self.ledger.claim(&market, user)?;
        let receipt = ClaimReceipt {
            market: key.clone(),
            user: user.clone(),
            payout,
        };
        info!(market = %key, user = %user, payout, "claim paid");
        if let Some(position) = self.ledger.position(key, user) {
            self.mirror_position(key, user, &position);
        }
        self.journal_claim(&receipt);
        Ok(receipt)
    }

    /// Transition a market Open -> Closed and verify conservation while it
    /// is quiescent.
    ///
    /// # Errors
    ///
    /// Store guards, plus `ConservationViolated` if the pools disagree with
    /// the ledger; the market is frozen in that case.
    pub fn close_market(&self, key: &MarketKey) -> Result<Market, EngineError> {
        let market = self.store.close(key, self.clock.now())?;
        self.verify_conservation(key)?;
        self.mirror_market(&market);
        Ok(market)
    }

    /// Transition a market Closed -> Resolved against a fresh end price.
    ///
    /// # Errors
    ///
    /// Store guards, including the staleness gate.
    pub fn resolve_market(&self, key: &MarketKey, end: PricePoint) -> Result<Market, EngineError> {
        let market = self.store.resolve(
            key,
            end,
            self.clock.now(),
            self.params.max_staleness_seconds,
        )?;
        info!(
            market = %key,
            result = %market.result(),
            end_price = %end,
            "market resolved"
        );
        self.mirror_market(&market);
        Ok(market)
    }

    /// Cancel a market that will never resolve. Terminal; payouts refund
    /// net stakes like a Push.
    pub fn cancel_market(&self, key: &MarketKey) -> Result<Market, EngineError> {
        let market = self.store.cancel(key)?;
        warn!(market = %key, "market cancelled");
        self.mirror_market(&market);
        Ok(market)
    }

    /// Keys of open markets whose betting window has elapsed.
    #[must_use]
    pub fn markets_due_for_close(&self) -> Vec<MarketKey> {
        let now = self.clock.now();
        self.store
            .keys_with_status(MarketStatus::Open)
            .into_iter()
            .filter(|key| {
                self.store
                    .get(key)
                    .map(|m| m.is_expired(now))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Snapshots of closed markets awaiting resolution.
    #[must_use]
    pub fn markets_awaiting_resolution(&self) -> Vec<Market> {
        self.store
            .keys_with_status(MarketStatus::Closed)
            .into_iter()
            .filter_map(|key| self.store.get(&key))
            .collect()
    }

    /// Check pool totals against the ledger for one market.
    ///
    /// # Errors
    ///
    /// `ConservationViolated` on mismatch. The market is frozen against
    /// further mutation; this indicates a bug, not an operational fault.
    pub fn verify_conservation(&self, key: &MarketKey) -> Result<(), EngineError> {
        let market = self.market(key)?;
        let (up, down) = self.ledger.market_net_totals(key);
        let position_total = up.saturating_add(down);
        if market.total_up() != up || market.total_down() != down {
            self.store.freeze(key);
            return Err(EngineError::ConservationViolated {
                key: key.clone(),
                pool_total: market.pool_total(),
                position_total,
            });
        }
        Ok(())
    }

    /// Dashboard statistics, optionally scoped to one user.
    #[must_use]
    pub fn stats(&self, user: Option<&UserId>) -> DashboardStats {
        let markets = self.markets();
        let mut stats = DashboardStats {
            active_markets: markets
                .iter()
                .filter(|m| m.status() == MarketStatus::Open)
                .count(),
            total_volume: markets
                .iter()
                .fold(0u64, |acc, m| acc.saturating_add(m.pool_total())),
            ..DashboardStats::default()
        };

        let Some(user) = user else {
            return stats;
        };
        for (key, position) in self.ledger.positions_for_user(user) {
            let Ok(market) = self.market(&key) else {
                continue;
            };
            match market.status() {
                MarketStatus::Open => stats.user_active_bets += 1,
                MarketStatus::Resolved | MarketStatus::Cancelled if !position.claimed() => {
                    stats.claimable_winnings = stats
                        .claimable_winnings
                        .saturating_add(settlement_payout(&market, &position));
                }
                _ => {}
            }
        }
        stats
    }

    fn mirror_market(&self, market: &Market) {
        if let Some(archive) = &self.archive {
            if let Err(e) = archive.upsert_market(market) {
                warn!(market = %market.key(), error = %e, "archive market write failed");
            }
        }
    }

    fn mirror_position(&self, key: &MarketKey, user: &UserId, position: &Position) {
        if let Some(archive) = &self.archive {
            if let Err(e) = archive.upsert_position(key, user, position) {
                warn!(market = %key, user = %user, error = %e, "archive position write failed");
            }
        }
    }

    fn journal_bet(&self, receipt: &BetReceipt) {
        if let Some(archive) = &self.archive {
            if let Err(e) = archive.record_bet(receipt) {
                warn!(market = %receipt.market, error = %e, "archive bet journal failed");
            }
        }
    }

    fn journal_claim(&self, receipt: &ClaimReceipt) {
        if let Some(archive) = &self.archive {
            if let Err(e) = archive.record_claim(receipt) {
                warn!(market = %receipt.market, error = %e, "archive claim journal failed");
            }
        }
    }
}
