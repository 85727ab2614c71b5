//! Updown - pari-mutuel settlement of 15-minute up/down price markets.
//!
//! Every 15-minute epoch a market opens with a recorded start price,
//! accepts proportional stakes on "price will be higher" (Up) or "price
//! will be lower" (Down), closes at a fixed end time, resolves against an
//! end price, and pays winners a pool share proportional to their stake.
//!
//! # Architecture
//!
//! - **[`domain`]** - pure types and arithmetic: markets, positions, the
//!   lifecycle state machine, fee/payout math, fixed-point prices
//! - **[`engine`]** - the settlement engine: market store, position
//!   ledger, and the facade the presentation layer calls
//! - **[`oracle`]** - price oracle and clock ports plus the Pyth Hermes
//!   REST adapter
//! - **[`orchestrator`]** - the periodic loop that creates, closes, and
//!   resolves markets
//! - **[`archive`]** - SQLite mirror of markets and positions surviving
//!   restarts, with an append-only activity journal
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML files
//! - [`error`] - Error types for the crate
//! - [`cli`] - clap-based command-line interface
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use updown::domain::{BetSide, FeedId, PricePoint, UserId};
//! use updown::engine::{MarketParams, SettlementEngine};
//! use updown::oracle::SystemClock;
//!
//! let engine = SettlementEngine::new(MarketParams::default(), Arc::new(SystemClock));
//! let feed = FeedId::new("0xef0d");
//! let start = PricePoint::new(12_433_864_799, -8, 0, 1_700_000_000);
//! let market = engine.open_market(feed, 1_700_000_900, start).unwrap();
//! let _receipt = engine.place_bet(
//!     market.key(),
//!     &UserId::new("alice"),
//!     BetSide::Up,
//!     1_000_000_000,
//! );
//! ```

pub mod archive;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod oracle;
pub mod orchestrator;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
