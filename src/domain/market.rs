//! Market aggregate and lifecycle state machine.
//!
//! A market is one fixed-duration betting epoch on one price feed. Its
//! lifecycle is `Open -> Closed -> Resolved`, with `Cancelled` as the
//! fallback terminal state when no acceptable end price ever materializes.
//! Every transition is guarded here; callers cannot put a market into an
//! inconsistent state through the public API.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

use super::ids::{FeedId, MarketKey};
use super::price::PricePoint;

/// Lifecycle status of a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketStatus {
    /// Accepting bets until `end_ts`.
    Open,
    /// Betting window over, awaiting an end price.
    Closed,
    /// End price recorded, result fixed. Terminal.
    Resolved,
    /// No result will ever be assigned; stakes are refundable. Terminal.
    Cancelled,
}

impl MarketStatus {
    /// Stable string form used in storage and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MarketStatus::Open => "Open",
            MarketStatus::Closed => "Closed",
            MarketStatus::Resolved => "Resolved",
            MarketStatus::Cancelled => "Cancelled",
        }
    }

    /// True for the two terminal states in which claims are allowed.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, MarketStatus::Resolved | MarketStatus::Cancelled)
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Open" => Ok(MarketStatus::Open),
            "Closed" => Ok(MarketStatus::Closed),
            "Resolved" => Ok(MarketStatus::Resolved),
            "Cancelled" => Ok(MarketStatus::Cancelled),
            other => Err(format!("unknown market status '{other}'")),
        }
    }
}

/// Settled outcome of a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketResult {
    /// Not yet resolved. Present exactly while status is Open or Closed.
    Unset,
    /// End price strictly above start price.
    Up,
    /// End price strictly below start price.
    Down,
    /// End price exactly equal to start price; stakes are refunded.
    Push,
}

impl MarketResult {
    /// Stable string form used in storage and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MarketResult::Unset => "Unset",
            MarketResult::Up => "Up",
            MarketResult::Down => "Down",
            MarketResult::Push => "Push",
        }
    }
}

impl fmt::Display for MarketResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Unset" => Ok(MarketResult::Unset),
            "Up" => Ok(MarketResult::Up),
            "Down" => Ok(MarketResult::Down),
            "Push" => Ok(MarketResult::Push),
            other => Err(format!("unknown market result '{other}'")),
        }
    }
}

/// Side of a bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetSide {
    Up,
    Down,
}

impl BetSide {
    /// Stable string form used in storage and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            BetSide::Up => "Up",
            BetSide::Down => "Down",
        }
    }
}

impl fmt::Display for BetSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BetSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Up" | "up" => Ok(BetSide::Up),
            "Down" | "down" => Ok(BetSide::Down),
            other => Err(format!("unknown bet side '{other}'")),
        }
    }
}

/// One betting epoch on one price feed.
///
/// Pools hold the sum of net (post-fee) stakes per side in integer minor
/// units. The invariant `total_up + total_down == sum of position nets` is
/// checked by the engine whenever the market goes quiet (close time).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Market {
    key: MarketKey,
    feed: FeedId,
    start_ts: i64,
    end_ts: i64,
    start: PricePoint,
    end: Option<PricePoint>,
    total_up: u64,
    total_down: u64,
    status: MarketStatus,
    result: MarketResult,
}

impl Market {
    /// Open a new market for the epoch starting at `start_ts`.
    #[must_use]
    pub fn open(
        key: MarketKey,
        feed: FeedId,
        start_ts: i64,
        epoch_seconds: i64,
        start: PricePoint,
    ) -> Self {
        Self {
            key,
            feed,
            start_ts,
            end_ts: start_ts + epoch_seconds,
            start,
            end: None,
            total_up: 0,
            total_down: 0,
            status: MarketStatus::Open,
            result: MarketResult::Unset,
        }
    }

    /// Reconstruct a market from stored parts. Used by the archive when
    /// rehydrating state after a restart; trusts the stored invariants.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        key: MarketKey,
        feed: FeedId,
        start_ts: i64,
        end_ts: i64,
        start: PricePoint,
        end: Option<PricePoint>,
        total_up: u64,
        total_down: u64,
        status: MarketStatus,
        result: MarketResult,
    ) -> Self {
        Self {
            key,
            feed,
            start_ts,
            end_ts,
            start,
            end,
            total_up,
            total_down,
            status,
            result,
        }
    }

    /// Get the market key.
    #[must_use]
    pub const fn key(&self) -> &MarketKey {
        &self.key
    }

    /// Get the feed this market tracks.
    #[must_use]
    pub const fn feed(&self) -> &FeedId {
        &self.feed
    }

    /// Epoch start, unix seconds.
    #[must_use]
    pub const fn start_ts(&self) -> i64 {
        self.start_ts
    }

    /// Epoch end, unix seconds.
    #[must_use]
    pub const fn end_ts(&self) -> i64 {
        self.end_ts
    }

    /// Price snapshot taken when the market was created.
    #[must_use]
    pub const fn start_price(&self) -> &PricePoint {
        &self.start
    }

    /// Price snapshot recorded at resolution; present iff Resolved.
    #[must_use]
    pub const fn end_price(&self) -> Option<&PricePoint> {
        self.end.as_ref()
    }

    /// Net stake total on the Up side.
    #[must_use]
    pub const fn total_up(&self) -> u64 {
        self.total_up
    }

    /// Net stake total on the Down side.
    #[must_use]
    pub const fn total_down(&self) -> u64 {
        self.total_down
    }

    /// Net stake total on one side.
    #[must_use]
    pub const fn side_total(&self, side: BetSide) -> u64 {
        match side {
            BetSide::Up => self.total_up,
            BetSide::Down => self.total_down,
        }
    }

    /// Combined pool. Cannot overflow: `credit_stake` bounds the sum.
    #[must_use]
    pub const fn pool_total(&self) -> u64 {
        self.total_up + self.total_down
    }

    /// Current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> MarketStatus {
        self.status
    }

    /// Settled outcome; `Unset` until resolution.
    #[must_use]
    pub const fn result(&self) -> MarketResult {
        self.result
    }

    /// True once the betting window is over, regardless of status.
    #[must_use]
    pub const fn is_expired(&self, now: i64) -> bool {
        now >= self.end_ts
    }

    /// Add a net stake to one side's pool.
    ///
    /// The expiry check is re-validated here rather than trusted from the
    /// status field: the orchestrator closes markets on a polling interval,
    /// so a market can sit expired-but-Open for a few seconds.
    ///
    /// # Errors
    ///
    /// `MarketNotOpen` unless status is Open; `MarketExpired` once
    /// `now >= end_ts`; `Overflow` if the pools cannot absorb the stake.
    pub fn credit_stake(&mut self, side: BetSide, net: u64, now: i64) -> Result<(), EngineError> {
        match self.status {
            MarketStatus::Open => {}
            status => {
                return Err(EngineError::MarketNotOpen {
                    key: self.key.clone(),
                    status,
                })
            }
        }
        if self.is_expired(now) {
            return Err(EngineError::MarketExpired {
                key: self.key.clone(),
            });
        }

        let overflow = || EngineError::Overflow {
            key: self.key.clone(),
        };
        let (new_up, new_down) = match side {
            BetSide::Up => (self.total_up.checked_add(net).ok_or_else(overflow)?, self.total_down),
            BetSide::Down => (self.total_up, self.total_down.checked_add(net).ok_or_else(overflow)?),
        };
        // Keep the combined pool representable so pool_total() stays total.
        new_up.checked_add(new_down).ok_or_else(overflow)?;

        self.total_up = new_up;
        self.total_down = new_down;
        Ok(())
    }

    /// Transition Open -> Closed once the betting window has elapsed.
    ///
    /// # Errors
    ///
    /// `MarketNotOpen` if not Open; `MarketNotEnded` before `end_ts`.
    pub fn close(&mut self, now: i64) -> Result<(), EngineError> {
        match self.status {
            MarketStatus::Open => {}
            status => {
                return Err(EngineError::MarketNotOpen {
                    key: self.key.clone(),
                    status,
                })
            }
        }
        if !self.is_expired(now) {
            return Err(EngineError::MarketNotEnded {
                key: self.key.clone(),
            });
        }

        self.status = MarketStatus::Closed;
        Ok(())
    }

    /// Transition Closed -> Resolved against `end`, fixing the result.
    ///
    /// The comparison is exact integer arithmetic on a common exponent
    /// (see [`PricePoint::cmp_value`]); equality is a Push.
    ///
    /// # Errors
    ///
    /// `MarketNotClosed` unless status is Closed; `IncomparablePrices` if
    /// the exponent spread defeats exact comparison.
    pub fn resolve(&mut self, end: PricePoint) -> Result<MarketResult, EngineError> {
        match self.status {
            MarketStatus::Closed => {}
            status => {
                return Err(EngineError::MarketNotClosed {
                    key: self.key.clone(),
                    status,
                })
            }
        }

        let ordering = end
            .cmp_value(&self.start)
            .ok_or(EngineError::IncomparablePrices {
                a: end.expo,
                b: self.start.expo,
            })?;
        self.result = match ordering {
            Ordering::Greater => MarketResult::Up,
            Ordering::Less => MarketResult::Down,
            Ordering::Equal => MarketResult::Push,
        };
        self.end = Some(end);
        self.status = MarketStatus::Resolved;
        Ok(self.result)
    }

    /// Transition Open/Closed -> Cancelled. No result is assigned; payout
    /// logic treats Cancelled exactly like a Push.
    ///
    /// # Errors
    ///
    /// `MarketAlreadySettled` if already Resolved or Cancelled.
    pub fn cancel(&mut self) -> Result<(), EngineError> {
        match self.status {
            MarketStatus::Open | MarketStatus::Closed => {
                self.status = MarketStatus::Cancelled;
                Ok(())
            }
            status => Err(EngineError::MarketAlreadySettled {
                key: self.key.clone(),
                status,
            }),
        }
    }
}
