#![allow(dead_code)]

use std::sync::Arc;

use updown::domain::{BetSide, FeedId, MarketKey, PricePoint, UserId};
use updown::engine::{MarketParams, SettlementEngine};
use updown::testkit::ManualClock;

pub const FEED: &str = "0xfeed";
pub const EPOCH: i64 = 900;

/// Production-shaped parameters: 1% fee, 0.01 SOL minimum net stake.
pub fn params() -> MarketParams {
    MarketParams {
        fee_bps: 100,
        min_bet: 10_000_000,
        epoch_seconds: EPOCH,
        max_staleness_seconds: 60,
    }
}

/// Parameters with the fee zeroed out, for payout tests with round pools.
pub fn no_fee_params() -> MarketParams {
    MarketParams {
        fee_bps: 0,
        ..params()
    }
}

pub fn feed() -> FeedId {
    FeedId::new(FEED)
}

pub fn user(name: &str) -> UserId {
    UserId::new(name)
}

pub fn price(mantissa: i64, publish_time: i64) -> PricePoint {
    PricePoint::new(mantissa, -8, 0, publish_time)
}

/// Engine plus its manual clock, frozen at `now`.
pub fn engine_at(params: MarketParams, now: i64) -> (Arc<SettlementEngine>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(now));
    let engine = Arc::new(SettlementEngine::new(params, clock.clone()));
    (engine, clock)
}

/// Open a market starting at `start_ts` with the given start price mantissa.
pub fn open_market(engine: &SettlementEngine, start_ts: i64, mantissa: i64) -> MarketKey {
    engine
        .open_market(feed(), start_ts, price(mantissa, start_ts - 5))
        .expect("market should not already exist")
        .key()
        .clone()
}

/// Place a bet that must succeed, returning the credited net amount.
pub fn bet(
    engine: &SettlementEngine,
    key: &MarketKey,
    who: &str,
    side: BetSide,
    gross: u64,
) -> u64 {
    engine
        .place_bet(key, &user(who), side, gross)
        .expect("bet should be accepted")
        .net
}
