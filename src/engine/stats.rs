//! Derived dashboard statistics.

use serde::Serialize;

/// Aggregate engine statistics, optionally scoped to one user.
///
/// A derived read over markets and positions, not a primary entity: the
/// numbers are recomputed from current state on every call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    /// Markets currently accepting bets.
    pub active_markets: usize,
    /// Sum of both pools across every market ever created, minor units.
    pub total_volume: u64,
    /// The user's positions in still-open markets.
    pub user_active_bets: usize,
    /// Payouts the user could collect right now from settled markets.
    pub claimable_winnings: u64,
}
