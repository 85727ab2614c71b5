//! Per-user position ledger with claim idempotency.
//!
//! Positions are keyed by `(market, user)` in a concurrent map. The entry
//! lock serializes concurrent mutation of the same position, so of any
//! number of simultaneous claim attempts exactly one succeeds and the rest
//! observe `AlreadyClaimed`. Claims never touch market aggregates; by the
//! time a claim is legal the market is settled and immutable.

use dashmap::DashMap;

use crate::domain::{settlement_payout, BetSide, Market, MarketKey, Position, UserId};
use crate::error::EngineError;

/// Ledger key: one position per `(market, user)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PositionKey {
    market: MarketKey,
    user: UserId,
}

/// Concurrent ledger of all positions.
#[derive(Debug, Default)]
pub struct PositionLedger {
    positions: DashMap<PositionKey, Position>,
}

impl PositionLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a position, crediting `net` to `side`.
    ///
    /// Never invoked with a non-positive amount: the engine rejects
    /// below-minimum bets before the ledger sees them.
    pub fn record_stake(
        &self,
        market: &MarketKey,
        user: &UserId,
        side: BetSide,
        net: u64,
    ) -> Result<Position, EngineError> {
        let key = PositionKey {
            market: market.clone(),
            user: user.clone(),
        };
        let mut position = self.positions.entry(key).or_default();
        position
            .credit(side, net)
            .ok_or_else(|| EngineError::Overflow {
                key: market.clone(),
            })?;
        Ok(position.clone())
    }

    /// Restore a stored position, replacing any existing entry.
    pub fn restore(&self, market: MarketKey, user: UserId, position: Position) {
        self.positions.insert(PositionKey { market, user }, position);
    }

    /// Snapshot of one position.
    #[must_use]
    pub fn position(&self, market: &MarketKey, user: &UserId) -> Option<Position> {
        self.positions
            .get(&PositionKey {
                market: market.clone(),
                user: user.clone(),
            })
            .map(|p| p.clone())
    }

    /// All of a user's positions with their market keys.
    #[must_use]
    pub fn positions_for_user(&self, user: &UserId) -> Vec<(MarketKey, Position)> {
        self.positions
            .iter()
            .filter(|entry| &entry.key().user == user)
            .map(|entry| (entry.key().market.clone(), entry.value().clone()))
            .collect()
    }

    /// All positions in one market with their owners.
    #[must_use]
    pub fn positions_for_market(&self, market: &MarketKey) -> Vec<(UserId, Position)> {
        self.positions
            .iter()
            .filter(|entry| &entry.key().market == market)
            .map(|entry| (entry.key().user.clone(), entry.value().clone()))
            .collect()
    }

    /// Sum of net stakes across all positions in one market, per side.
    /// Used by the conservation check against the market's pool totals.
    #[must_use]
    pub fn market_net_totals(&self, market: &MarketKey) -> (u64, u64) {
        self.positions
            .iter()
            .filter(|entry| &entry.key().market == market)
            .fold((0u64, 0u64), |(up, down), entry| {
                (
                    up.saturating_add(entry.value().up_net()),
                    down.saturating_add(entry.value().down_net()),
                )
            })
    }

    /// Settle a user's claim against a settled market.
    ///
    /// Atomic per `(market, user)`: the position's entry lock is held from
    /// the idempotency check through the claimed-flag flip.
    ///
    /// # Errors
    ///
    /// `PositionNotFound` if the user never bet in this market;
    /// `MarketNotSettled` unless the market is Resolved or Cancelled;
    /// `AlreadyClaimed` on repeat claims; `NothingToClaim` when the
    /// computed payout is zero (a loser in a resolved market).
    pub fn claim(&self, market: &Market, user: &UserId) -> Result<u64, EngineError> {
        let key = PositionKey {
            market: market.key().clone(),
            user: user.clone(),
        };
        let mut position = self
            .positions
            .get_mut(&key)
            .ok_or_else(|| EngineError::PositionNotFound {
                key: market.key().clone(),
                user: user.clone(),
            })?;

        if !market.status().is_settled() {
            return Err(EngineError::MarketNotSettled {
                key: market.key().clone(),
                status: market.status(),
            });
        }
        if position.claimed() {
            return Err(EngineError::AlreadyClaimed {
                key: market.key().clone(),
                user: user.clone(),
            });
        }

        let payout = settlement_payout(market, &position);
        if payout == 0 {
            return Err(EngineError::NothingToClaim {
                key: market.key().clone(),
                user: user.clone(),
            });
        }

        position.mark_claimed();
        Ok(payout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeedId, PricePoint};

    fn resolved_up_market() -> Market {
        let feed = FeedId::new("feed");
        let mut market = Market::open(
            MarketKey::for_epoch(&feed, 900),
            feed,
            900,
            900,
            PricePoint::new(100, -2, 0, 890),
        );
        market.credit_stake(BetSide::Up, 600_000_000, 1_000).unwrap();
        market
            .credit_stake(BetSide::Down, 400_000_000, 1_000)
            .unwrap();
        market.close(1_800).unwrap();
        market
            .resolve(PricePoint::new(101, -2, 0, 1_800))
            .unwrap();
        market
    }

    #[test]
    fn record_stake_upserts() {
        let ledger = PositionLedger::new();
        let market = MarketKey::new("m");
        let user = UserId::new("alice");

        ledger
            .record_stake(&market, &user, BetSide::Up, 100)
            .unwrap();
        let position = ledger
            .record_stake(&market, &user, BetSide::Up, 50)
            .unwrap();

        assert_eq!(position.up_net(), 150);
        assert_eq!(ledger.position(&market, &user).unwrap().up_net(), 150);
    }

    #[test]
    fn market_net_totals_sum_all_users() {
        let ledger = PositionLedger::new();
        let market = MarketKey::new("m");

        ledger
            .record_stake(&market, &UserId::new("a"), BetSide::Up, 100)
            .unwrap();
        ledger
            .record_stake(&market, &UserId::new("b"), BetSide::Up, 60)
            .unwrap();
        ledger
            .record_stake(&market, &UserId::new("b"), BetSide::Down, 40)
            .unwrap();
        ledger
            .record_stake(&MarketKey::new("other"), &UserId::new("a"), BetSide::Up, 7)
            .unwrap();

        assert_eq!(ledger.market_net_totals(&market), (160, 40));
    }

    #[test]
    fn claim_pays_winner_once() {
        let ledger = PositionLedger::new();
        let market = resolved_up_market();
        let user = UserId::new("alice");
        ledger
            .record_stake(market.key(), &user, BetSide::Up, 100_000_000)
            .unwrap();

        let payout = ledger.claim(&market, &user).unwrap();
        assert_eq!(payout, 166_666_666);

        let err = ledger.claim(&market, &user).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyClaimed { .. }));
    }

    #[test]
    fn claim_without_position_fails() {
        let ledger = PositionLedger::new();
        let market = resolved_up_market();
        let err = ledger.claim(&market, &UserId::new("ghost")).unwrap_err();
        assert!(matches!(err, EngineError::PositionNotFound { .. }));
    }

    #[test]
    fn claim_on_unsettled_market_fails() {
        let ledger = PositionLedger::new();
        let feed = FeedId::new("feed");
        let market = Market::open(
            MarketKey::for_epoch(&feed, 900),
            feed,
            900,
            900,
            PricePoint::new(100, -2, 0, 890),
        );
        let user = UserId::new("alice");
        ledger
            .record_stake(market.key(), &user, BetSide::Up, 100)
            .unwrap();

        let err = ledger.claim(&market, &user).unwrap_err();
        assert!(matches!(err, EngineError::MarketNotSettled { .. }));
    }

    #[test]
    fn loser_has_nothing_to_claim() {
        let ledger = PositionLedger::new();
        let market = resolved_up_market();
        let user = UserId::new("bob");
        ledger
            .record_stake(market.key(), &user, BetSide::Down, 100_000_000)
            .unwrap();

        let err = ledger.claim(&market, &user).unwrap_err();
        assert!(matches!(err, EngineError::NothingToClaim { .. }));
        // The flag must not flip on a failed claim.
        assert!(!ledger.position(market.key(), &user).unwrap().claimed());
    }

    #[test]
    fn concurrent_claims_pay_exactly_once() {
        use std::sync::Arc;

        let ledger = Arc::new(PositionLedger::new());
        let market = Arc::new(resolved_up_market());
        let user = UserId::new("alice");
        ledger
            .record_stake(market.key(), &user, BetSide::Up, 100_000_000)
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = Arc::clone(&ledger);
            let market = Arc::clone(&market);
            let user = user.clone();
            handles.push(std::thread::spawn(move || ledger.claim(&market, &user)));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let wins = results.iter().filter(|r| r.is_ok()).count();
        let repeats = results
            .iter()
            .filter(|r| matches!(r, Err(EngineError::AlreadyClaimed { .. })))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(repeats, 7);
    }
}
