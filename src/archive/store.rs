//! SQLite archive of markets, positions, and settlement activity.
//!
//! A durable mirror of the engine's in-memory state plus an append-only
//! journal of bets and claims for audit. Writes are upserts keyed the same
//! way the engine keys its maps, so replaying a write is harmless.

use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{Market, MarketKey, Position, UserId};
use crate::engine::{BetReceipt, ClaimReceipt};
use crate::error::{Error, Result};

use super::connection::DbPool;
use super::model::{to_db_amount, ActivityRow, MarketRow, PositionRow};
use super::schema::{activity, markets, positions};

/// Archived engine state loaded at startup.
#[derive(Debug, Default)]
pub struct ArchiveSnapshot {
    pub markets: Vec<Market>,
    pub positions: Vec<(MarketKey, UserId, Position)>,
}

/// SQLite-backed settlement archive.
pub struct MarketArchive {
    /// Database connection pool.
    pool: DbPool,
}

impl MarketArchive {
    /// Create a new archive with the given connection pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(
        &self,
    ) -> Result<
        diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<diesel::SqliteConnection>>,
    > {
        self.pool
            .get()
            .map_err(|e| Error::Connection(e.to_string()))
    }

    /// Insert or replace a market row.
    pub fn upsert_market(&self, market: &Market) -> Result<()> {
        let row = MarketRow::from_domain(market, Utc::now())?;
        let mut conn = self.conn()?;
        diesel::replace_into(markets::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Insert or replace a position row.
    pub fn upsert_position(
        &self,
        market: &MarketKey,
        user: &UserId,
        position: &Position,
    ) -> Result<()> {
        let row = PositionRow::from_domain(market, user, position, Utc::now())?;
        let mut conn = self.conn()?;
        diesel::replace_into(positions::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Append a bet to the activity journal.
    pub fn record_bet(&self, receipt: &BetReceipt) -> Result<()> {
        let row = ActivityRow {
            id: Uuid::new_v4().to_string(),
            ts: Utc::now().to_rfc3339(),
            kind: "BET".to_string(),
            market_key: receipt.market.to_string(),
            user_id: Some(receipt.user.to_string()),
            side: Some(receipt.side.as_str().to_string()),
            gross: Some(to_db_amount(receipt.gross)?),
            fee: Some(to_db_amount(receipt.fee)?),
            net: Some(to_db_amount(receipt.net)?),
            payout: None,
        };
        self.append(row)
    }

    /// Append a claim to the activity journal.
    pub fn record_claim(&self, receipt: &ClaimReceipt) -> Result<()> {
        let row = ActivityRow {
            id: Uuid::new_v4().to_string(),
            ts: Utc::now().to_rfc3339(),
            kind: "CLAIM".to_string(),
            market_key: receipt.market.to_string(),
            user_id: Some(receipt.user.to_string()),
            side: None,
            gross: None,
            fee: None,
            net: None,
            payout: Some(to_db_amount(receipt.payout)?),
        };
        self.append(row)
    }

    fn append(&self, row: ActivityRow) -> Result<()> {
        let mut conn = self.conn()?;
        diesel::insert_into(activity::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Load every archived market and position, for engine rehydration.
    pub fn load(&self) -> Result<ArchiveSnapshot> {
        let mut conn = self.conn()?;

        let market_rows: Vec<MarketRow> = markets::table
            .order(markets::start_ts.desc())
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        let position_rows: Vec<PositionRow> = positions::table
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(ArchiveSnapshot {
            markets: market_rows
                .into_iter()
                .map(MarketRow::into_domain)
                .collect::<Result<_>>()?,
            positions: position_rows
                .into_iter()
                .map(PositionRow::into_domain)
                .collect::<Result<_>>()?,
        })
    }

    /// Number of journal entries for one market.
    pub fn activity_count(&self, market: &MarketKey) -> Result<i64> {
        let mut conn = self.conn()?;
        activity::table
            .filter(activity::market_key.eq(market.as_str()))
            .count()
            .get_result(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))
    }
}
