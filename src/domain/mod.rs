//! Oracle-agnostic domain logic for pari-mutuel up/down markets.

mod ids;
mod market;
mod payout;
mod position;
mod price;

// Core domain types
pub use ids::{FeedId, MarketKey, UserId};
pub use market::{BetSide, Market, MarketResult, MarketStatus};
pub use position::Position;
pub use price::PricePoint;

// Fee and payout arithmetic
pub use payout::{proportional_payout, settlement_payout, split_fee, FeeSplit, BPS_DENOMINATOR};
