//! Error taxonomy
//!
//! Only configuration problems are errors: they abort before a run starts.
//! Per-round data problems are skips (see `types::SkipReason`), and bust is
//! a `types::RunStatus`, reported rather than thrown.

use rust_decimal::Decimal;
use thiserror::Error;

/// Invalid strategy configuration, rejected before any round is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: String },

    #[error("fee_rate must be within [0, 1), got {0}")]
    InvalidFeeRate(Decimal),

    #[error("{name} must exceed 1.0 (a payout at or below 1.0 can never profit), got {value}")]
    PayoutFloorTooLow { name: &'static str, value: Decimal },

    #[error("circuit_breaker_loss_count must be at least 1")]
    ZeroLossCount,

    #[error("circuit_breaker_cooldown_minutes must be positive, got {0}")]
    NonPositiveCooldown(i64),

    #[error("hybrid_lookback must be at least 2, got {0}")]
    LookbackTooShort(usize),
}
