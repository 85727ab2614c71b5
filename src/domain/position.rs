//! Per-user net exposure in one market.

use serde::{Deserialize, Serialize};

use super::market::BetSide;

/// One user's cumulative net stakes in one market.
///
/// Created on the user's first bet, updated additively on later bets, and
/// never deleted. A user may hold stakes on both sides at once. `claimed`
/// moves false -> true exactly once, when a settled payout is collected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    up_net: u64,
    down_net: u64,
    claimed: bool,
}

impl Position {
    /// Create an empty position.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstruct a position from stored parts.
    #[must_use]
    pub const fn restore(up_net: u64, down_net: u64, claimed: bool) -> Self {
        Self {
            up_net,
            down_net,
            claimed,
        }
    }

    /// Cumulative net stake on Up.
    #[must_use]
    pub const fn up_net(&self) -> u64 {
        self.up_net
    }

    /// Cumulative net stake on Down.
    #[must_use]
    pub const fn down_net(&self) -> u64 {
        self.down_net
    }

    /// Net stake on one side.
    #[must_use]
    pub const fn stake_on(&self, side: BetSide) -> u64 {
        match side {
            BetSide::Up => self.up_net,
            BetSide::Down => self.down_net,
        }
    }

    /// Combined net stake across both sides.
    #[must_use]
    pub const fn total_net(&self) -> u64 {
        self.up_net + self.down_net
    }

    /// Whether the settled payout has been collected.
    #[must_use]
    pub const fn claimed(&self) -> bool {
        self.claimed
    }

    /// Add a net stake to one side.
    ///
    /// Returns `None` on overflow. In practice a position's stakes are
    /// bounded by its market's pool totals, which are themselves checked,
    /// so this cannot fail for stakes the store has accepted.
    #[must_use]
    pub fn credit(&mut self, side: BetSide, net: u64) -> Option<()> {
        let (up, down) = match side {
            BetSide::Up => (self.up_net.checked_add(net)?, self.down_net),
            BetSide::Down => (self.up_net, self.down_net.checked_add(net)?),
        };
        up.checked_add(down)?;
        self.up_net = up;
        self.down_net = down;
        Some(())
    }

    /// Mark the payout as collected.
    pub fn mark_claimed(&mut self) {
        self.claimed = true;
    }
}
