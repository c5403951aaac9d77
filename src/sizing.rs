//! Position Sizing
//!
//! Stake for one trade as a fraction of the current bankroll:
//! - momentum multiplier when the EMA gap is wide,
//! - one-time recovery multiplier after a recent loss,
//! - profit-taking override after a win streak,
//! - final clamp so the stake never exceeds the bankroll.
//!
//! Every multiplier applies to a base recomputed from the current bankroll,
//! so nothing compounds across rounds (not a martingale).

use rust_decimal::Decimal;

use crate::config::{RecoveryRule, SimConfig};
use crate::engine::RecentResults;

/// Per-round sizing inputs computed by the engine before staking.
#[derive(Debug, Clone, Copy, Default)]
pub struct StakeFlags {
    /// |ema_gap_pct| at or above `momentum_threshold`
    pub has_momentum: bool,
    /// Win streak hit exactly `profit_taking_wins`
    pub is_profit_taking: bool,
}

/// Stake for the next trade. Caller guarantees `bankroll > 0`.
pub fn stake(
    bankroll: Decimal,
    flags: &StakeFlags,
    recent: &RecentResults,
    config: &SimConfig,
) -> Decimal {
    // Profit taking overrides every multiplier for this one trade.
    if flags.is_profit_taking {
        return (bankroll * config.profit_taking_fraction).min(bankroll);
    }

    let mut stake = bankroll * config.base_fraction;

    if flags.has_momentum {
        stake *= config.momentum_multiplier;
    }

    if recovery_armed(recent, config.recovery_rule) {
        stake *= config.recovery_multiplier;
    }

    stake.min(bankroll)
}

/// Whether the recent results match the configured recovery pattern.
fn recovery_armed(recent: &RecentResults, rule: RecoveryRule) -> bool {
    match rule {
        RecoveryRule::AfterSingleLoss => {
            // Exactly one loss, and it was the most recent result.
            recent.last() == Some(false) && recent.prev() != Some(false)
        }
        RecoveryRule::AfterTwoLosses => {
            recent.last() == Some(false) && recent.prev() == Some(false)
        }
    }
}
