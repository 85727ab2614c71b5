//! Archive round-trips: write-through from the engine, the activity
//! journal, and rehydration after a restart.

mod support;

use std::sync::Arc;

use tempfile::TempDir;
use updown::archive::{create_pool, run_migrations, MarketArchive};
use updown::domain::{BetSide, MarketResult, MarketStatus};
use updown::engine::SettlementEngine;
use updown::error::EngineError;
use updown::testkit::ManualClock;

use support::*;

fn archive_in(dir: &TempDir) -> Arc<MarketArchive> {
    let path = dir.path().join("archive.sqlite");
    let pool = create_pool(path.to_str().unwrap()).unwrap();
    run_migrations(&pool).unwrap();
    Arc::new(MarketArchive::new(pool))
}

fn engine_with_archive(
    archive: Arc<MarketArchive>,
    now: i64,
) -> (Arc<SettlementEngine>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(now));
    let engine = Arc::new(
        SettlementEngine::new(no_fee_params(), clock.clone()).with_archive(archive),
    );
    (engine, clock)
}

#[test]
fn accepted_mutations_are_mirrored() {
    let dir = TempDir::new().unwrap();
    let archive = archive_in(&dir);
    let (engine, clock) = engine_with_archive(archive.clone(), 1_750);

    let key = open_market(&engine, 1_800, 12_433_864_799);
    bet(&engine, &key, "alice", BetSide::Up, 100_000_000);
    bet(&engine, &key, "bob", BetSide::Down, 100_000_000);

    clock.set(2_700);
    engine.close_market(&key).unwrap();
    engine
        .resolve_market(&key, price(12_500_000_000, 2_695))
        .unwrap();
    engine.claim(&key, &user("alice")).unwrap();

    let snapshot = archive.load().unwrap();
    assert_eq!(snapshot.markets.len(), 1);
    let market = &snapshot.markets[0];
    assert_eq!(market.key(), &key);
    assert_eq!(market.status(), MarketStatus::Resolved);
    assert_eq!(market.result(), MarketResult::Up);
    assert_eq!(market.total_up(), 100_000_000);
    assert_eq!(market.total_down(), 100_000_000);
    assert_eq!(market.end_price().unwrap().price, 12_500_000_000);

    assert_eq!(snapshot.positions.len(), 2);
    let alice = snapshot
        .positions
        .iter()
        .find(|(_, u, _)| u == &user("alice"))
        .unwrap();
    assert!(alice.2.claimed());

    // Two bets and one claim in the journal.
    assert_eq!(archive.activity_count(&key).unwrap(), 3);
}

#[test]
fn restart_rehydrates_state_and_keeps_claims_idempotent() {
    let dir = TempDir::new().unwrap();

    let key = {
        let archive = archive_in(&dir);
        let (engine, clock) = engine_with_archive(archive, 1_750);
        let key = open_market(&engine, 1_800, 12_433_864_799);
        bet(&engine, &key, "alice", BetSide::Up, 100_000_000);
        bet(&engine, &key, "bob", BetSide::Down, 100_000_000);
        clock.set(2_700);
        engine.close_market(&key).unwrap();
        engine
            .resolve_market(&key, price(12_500_000_000, 2_695))
            .unwrap();
        engine.claim(&key, &user("alice")).unwrap();
        key
    };

    // "Restart": a fresh engine fed from the same database.
    let archive = archive_in(&dir);
    let (engine, _clock) = engine_with_archive(archive.clone(), 2_800);
    let snapshot = archive.load().unwrap();
    engine.restore(snapshot.markets, snapshot.positions);

    let market = engine.market(&key).unwrap();
    assert_eq!(market.status(), MarketStatus::Resolved);
    engine.verify_conservation(&key).unwrap();

    // Alice's claim survived the restart; Bob still has nothing to claim.
    let err = engine.claim(&key, &user("alice")).unwrap_err();
    assert!(matches!(err, EngineError::AlreadyClaimed { .. }));
    let err = engine.claim(&key, &user("bob")).unwrap_err();
    assert!(matches!(err, EngineError::NothingToClaim { .. }));
}

#[test]
fn open_market_round_trips_without_end_price() {
    let dir = TempDir::new().unwrap();
    let archive = archive_in(&dir);
    let (engine, _clock) = engine_with_archive(archive.clone(), 1_750);

    let key = open_market(&engine, 1_800, 12_433_864_799);
    let snapshot = archive.load().unwrap();
    assert_eq!(snapshot.markets.len(), 1);
    let market = &snapshot.markets[0];
    assert_eq!(market.key(), &key);
    assert_eq!(market.status(), MarketStatus::Open);
    assert!(market.end_price().is_none());
    assert_eq!(market.start_price().price, 12_433_864_799);
}

#[test]
fn archive_failure_does_not_unwind_engine_state() {
    let dir = TempDir::new().unwrap();

    // A database that never had its migrations run: every archive write
    // fails with "no such table". The engine must keep operating on its
    // in-memory state regardless.
    let path = dir.path().join("no-migrations.sqlite");
    let pool = create_pool(path.to_str().unwrap()).unwrap();
    let archive = Arc::new(MarketArchive::new(pool));
    let (engine, _clock) = engine_with_archive(archive, 1_750);

    let key = open_market(&engine, 1_800, 12_433_864_799);
    bet(&engine, &key, "alice", BetSide::Up, 100_000_000);

    assert_eq!(engine.market(&key).unwrap().total_up(), 100_000_000);
    engine.verify_conservation(&key).unwrap();
}
