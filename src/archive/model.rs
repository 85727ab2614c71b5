//! Row models mapping archive tables to domain types.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::{
    FeedId, Market, MarketKey, MarketResult, MarketStatus, Position, PricePoint, UserId,
};
use crate::error::{Error, Result};

use super::schema::{activity, markets, positions};

/// One archived market.
#[derive(Debug, Clone, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = markets)]
pub struct MarketRow {
    pub key: String,
    pub feed_id: String,
    pub start_ts: i64,
    pub end_ts: i64,
    pub start_price: i64,
    pub start_expo: i32,
    pub start_conf: i64,
    pub start_publish_time: i64,
    pub end_price: Option<i64>,
    pub end_expo: Option<i32>,
    pub end_conf: Option<i64>,
    pub end_publish_time: Option<i64>,
    pub total_up: i64,
    pub total_down: i64,
    pub status: String,
    pub result: String,
    pub updated_at: String,
}

impl MarketRow {
    /// Build a row from a domain market.
    ///
    /// # Errors
    /// Returns a parse error if an amount exceeds the i64 range SQLite can
    /// store, which no realistic pool ever does.
    pub fn from_domain(market: &Market, updated_at: DateTime<Utc>) -> Result<Self> {
        let start = market.start_price();
        let end = market.end_price();
        Ok(Self {
            key: market.key().to_string(),
            feed_id: market.feed().to_string(),
            start_ts: market.start_ts(),
            end_ts: market.end_ts(),
            start_price: start.price,
            start_expo: start.expo,
            start_conf: to_db_amount(start.conf)?,
            start_publish_time: start.publish_time,
            end_price: end.map(|p| p.price),
            end_expo: end.map(|p| p.expo),
            end_conf: end.map(|p| to_db_amount(p.conf)).transpose()?,
            end_publish_time: end.map(|p| p.publish_time),
            total_up: to_db_amount(market.total_up())?,
            total_down: to_db_amount(market.total_down())?,
            status: market.status().as_str().to_string(),
            result: market.result().as_str().to_string(),
            updated_at: updated_at.to_rfc3339(),
        })
    }

    /// Rebuild the domain market this row mirrors.
    ///
    /// # Errors
    /// Returns a parse error for unknown status/result strings or negative
    /// amounts.
    pub fn into_domain(self) -> Result<Market> {
        let status: MarketStatus = self.status.parse().map_err(Error::Parse)?;
        let result: MarketResult = self.result.parse().map_err(Error::Parse)?;
        let start = PricePoint::new(
            self.start_price,
            self.start_expo,
            from_db_amount(self.start_conf)?,
            self.start_publish_time,
        );
        let end = match (self.end_price, self.end_expo, self.end_publish_time) {
            (Some(price), Some(expo), Some(publish_time)) => Some(PricePoint::new(
                price,
                expo,
                self.end_conf.map(from_db_amount).transpose()?.unwrap_or(0),
                publish_time,
            )),
            _ => None,
        };

        Ok(Market::restore(
            MarketKey::new(self.key),
            FeedId::new(self.feed_id),
            self.start_ts,
            self.end_ts,
            start,
            end,
            from_db_amount(self.total_up)?,
            from_db_amount(self.total_down)?,
            status,
            result,
        ))
    }
}

/// One archived position.
#[derive(Debug, Clone, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = positions)]
pub struct PositionRow {
    pub market_key: String,
    pub user_id: String,
    pub up_net: i64,
    pub down_net: i64,
    pub claimed: bool,
    pub updated_at: String,
}

impl PositionRow {
    /// Build a row from a domain position.
    ///
    /// # Errors
    /// Returns a parse error if an amount exceeds the i64 range.
    pub fn from_domain(
        market: &MarketKey,
        user: &UserId,
        position: &Position,
        updated_at: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            market_key: market.to_string(),
            user_id: user.to_string(),
            up_net: to_db_amount(position.up_net())?,
            down_net: to_db_amount(position.down_net())?,
            claimed: position.claimed(),
            updated_at: updated_at.to_rfc3339(),
        })
    }

    /// Rebuild the `(market, user, position)` triple this row mirrors.
    ///
    /// # Errors
    /// Returns a parse error for negative amounts.
    pub fn into_domain(self) -> Result<(MarketKey, UserId, Position)> {
        Ok((
            MarketKey::new(self.market_key),
            UserId::new(self.user_id),
            Position::restore(
                from_db_amount(self.up_net)?,
                from_db_amount(self.down_net)?,
                self.claimed,
            ),
        ))
    }
}

/// One append-only journal entry (a bet or a claim).
#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = activity)]
pub struct ActivityRow {
    pub id: String,
    pub ts: String,
    pub kind: String,
    pub market_key: String,
    pub user_id: Option<String>,
    pub side: Option<String>,
    pub gross: Option<i64>,
    pub fee: Option<i64>,
    pub net: Option<i64>,
    pub payout: Option<i64>,
}

pub(crate) fn to_db_amount(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| Error::Parse(format!("amount {value} exceeds i64 range")))
}

pub(crate) fn from_db_amount(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| Error::Parse(format!("negative stored amount {value}")))
}
