//! The market settlement engine.
//!
//! - [`MarketStore`] - authoritative market aggregates, per-key locking
//! - [`PositionLedger`] - per-user positions and claim idempotency
//! - [`SettlementEngine`] - the facade callers and the orchestrator use

mod ledger;
mod settlement;
mod stats;
mod store;

pub use ledger::PositionLedger;
pub use settlement::{BetReceipt, ClaimReceipt, MarketParams, SettlementEngine};
pub use stats::DashboardStats;
pub use store::MarketStore;
