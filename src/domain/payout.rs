//! Fee and payout arithmetic.
//!
//! Pure functions, no state. All amounts are integer minor units (lamports);
//! every division rounds down. Flooring the fee favors the bettor by at most
//! one minor unit; flooring the payout leaves a small residual (dust) in the
//! pool after all winners claim.

use crate::error::EngineError;

use super::market::{Market, MarketResult, MarketStatus};
use super::position::Position;

/// Basis-point denominator for fee math.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Result of splitting a gross bet into fee and net stake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    /// Amount routed to the treasury.
    pub fee: u64,
    /// Amount credited to the pool and the bettor's position.
    pub net: u64,
}

/// Split a gross amount into `(fee, net)` at `fee_bps` basis points.
///
/// `fee = floor(gross * fee_bps / 10_000)`, `net = gross - fee`.
///
/// # Errors
///
/// Rejects `fee_bps` above 10_000. Trusted callers validate their config up
/// front, so this is defensive only.
pub fn split_fee(gross: u64, fee_bps: u16) -> Result<FeeSplit, EngineError> {
    if u64::from(fee_bps) > BPS_DENOMINATOR {
        return Err(EngineError::FeeBpsOutOfRange { fee_bps });
    }

    let fee = (u128::from(gross) * u128::from(fee_bps) / u128::from(BPS_DENOMINATOR)) as u64;
    Ok(FeeSplit {
        fee,
        net: gross - fee,
    })
}

/// Pari-mutuel share of `pool_total` for a `stake` on the winning side.
///
/// `floor(pool_total * stake / winning_side_total)`; zero when the winning
/// side holds no stake at all (no winners, nothing to distribute). The
/// intermediate product is computed in u128 and cannot overflow.
#[must_use]
pub fn proportional_payout(stake: u64, winning_side_total: u64, pool_total: u64) -> u64 {
    if winning_side_total == 0 {
        return 0;
    }

    (u128::from(pool_total) * u128::from(stake) / u128::from(winning_side_total)) as u64
}

/// Payout owed to `position` under the market's settled outcome.
///
/// Winning-side stakes receive a proportional share of the combined pool;
/// Push and Cancelled refund the position's own net stakes in full (no
/// redistribution); losers receive zero. Markets that are not yet settled
/// pay nothing - callers guard on status before invoking claims.
#[must_use]
pub fn settlement_payout(market: &Market, position: &Position) -> u64 {
    match market.status() {
        MarketStatus::Open | MarketStatus::Closed => 0,
        MarketStatus::Cancelled => position.total_net(),
        MarketStatus::Resolved => match market.result() {
            MarketResult::Push => position.total_net(),
            MarketResult::Up => {
                proportional_payout(position.up_net(), market.total_up(), market.pool_total())
            }
            MarketResult::Down => {
                proportional_payout(position.down_net(), market.total_down(), market.pool_total())
            }
            // A resolved market always carries a result; nothing to pay if
            // the invariant is somehow broken.
            MarketResult::Unset => 0,
        },
    }
}
