//! Core Types
//!
//! Shared records and enums for the replay engine:
//! - Round inputs as recorded on-chain (`RoundRecord`)
//! - Strategy outputs (`Signal`, `Trade`)
//! - Per-round skip accounting (`SkipReason`)
//!
//! All money values (pools, stakes, payouts, bankroll) are `Decimal`.
//! Percentages and indicator values stay `f64`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of a binary UP/DOWN round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Up,
    Down,
}

impl Side {
    /// The other side of the round.
    pub fn opposite(&self) -> Side {
        match self {
            Side::Up => Side::Down,
            Side::Down => Side::Up,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Up => write!(f, "UP"),
            Side::Down => write!(f, "DOWN"),
        }
    }
}

/// Recorded outcome of a round. `Unknown` covers rounds whose close was
/// never recorded (node outage, cancelled round); they settle nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Winner {
    Up,
    Down,
    Unknown,
}

impl Winner {
    pub fn side(&self) -> Option<Side> {
        match self {
            Winner::Up => Some(Side::Up),
            Winner::Down => Some(Side::Down),
            Winner::Unknown => None,
        }
    }
}

/// EMA crossover state captured at lock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EmaSignal {
    Bull,
    Bear,
    Neutral,
}

impl EmaSignal {
    /// Directional reading, `None` when the EMAs are flat.
    pub fn direction(&self) -> Option<Side> {
        match self {
            EmaSignal::Bull => Some(Side::Up),
            EmaSignal::Bear => Some(Side::Down),
            EmaSignal::Neutral => None,
        }
    }
}

/// One historical round, validated at the ingest boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    /// On-chain round id
    pub epoch: u64,
    /// Lock timestamp (unix seconds) — rounds replay in this order
    pub lock_ts: i64,
    /// Price at lock
    pub lock_price: Decimal,
    /// Price at close
    pub close_price: Decimal,
    /// Recorded outcome
    pub winner: Winner,
    /// Total staked on UP at lock (BNB)
    pub bull_pool: Decimal,
    /// Total staked on DOWN at lock (BNB)
    pub bear_pool: Decimal,
    /// Realized payout multiple for the winning side (0 when unrecorded)
    pub winner_payout_multiple: Decimal,
    /// EMA crossover state at lock
    pub ema_signal: EmaSignal,
    /// Percent gap between fast and slow EMA at lock
    pub ema_gap_pct: f64,
}

impl RoundRecord {
    pub fn total_pool(&self) -> Decimal {
        self.bull_pool + self.bear_pool
    }

    /// Side holding the larger pool. `None` when the pools tie or the
    /// round is empty — there is no crowd to read.
    pub fn crowd_side(&self) -> Option<Side> {
        if self.bull_pool > self.bear_pool {
            Some(Side::Up)
        } else if self.bear_pool > self.bull_pool {
            Some(Side::Down)
        } else {
            None
        }
    }

    /// Fee-adjusted payout multiple a bet on `side` would earn if it won:
    /// `total * (1 - fee) / pool_on_side`. `None` when that side's pool is
    /// zero (payout undefined on a single-sided round).
    pub fn implied_payout(&self, side: Side, fee_rate: Decimal) -> Option<Decimal> {
        let pool = match side {
            Side::Up => self.bull_pool,
            Side::Down => self.bear_pool,
        };
        if pool <= Decimal::ZERO {
            return None;
        }
        Some(self.total_pool() * (Decimal::ONE - fee_rate) / pool)
    }
}

/// A betting decision for one round, before settlement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    pub side: Side,
    /// Payout multiple implied by the pools at decision time
    pub implied_payout: Decimal,
    /// True when the hybrid mean-reversion rule produced this signal
    pub used_hybrid: bool,
}

/// One settled bet. Append-only: the engine never mutates past trades.
#[derive(Debug, Clone, Serialize)]
pub struct Trade {
    pub epoch: u64,
    pub side: Side,
    pub stake: Decimal,
    pub won: bool,
    /// Payout multiple the trade settled at (0 on a loss)
    pub payout: Decimal,
    /// Signed profit: `stake * (payout - 1)` on a win, `-stake` on a loss
    pub profit: Decimal,
    pub bankroll_after: Decimal,
    /// True when the hybrid rule placed this trade
    pub used_hybrid: bool,
}

/// Why a round produced no trade. Counted per reason in the run result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// EMA state is Neutral — no directional read
    NoEmaSignal,
    /// |ema_gap_pct| below the configured gap threshold
    WeakGap,
    /// Both pools empty
    EmptyPool,
    /// Pools exactly equal — no crowd side
    CrowdTie,
    /// Chosen side's implied payout below the floor
    PayoutBelowMin,
    /// Consensus payout above the ceiling (crowd too lopsided)
    PayoutAboveMax,
    /// Contrarian requires the EMA to fade the crowd, but it agrees
    EmaAgreesWithCrowd,
    /// Consensus requires the EMA to follow the crowd, but it disagrees
    EmaDisagreesWithCrowd,
    /// Hybrid window not yet filled
    HybridWarmup,
    /// Hybrid found neither an oversold/overbought band position nor momentum
    HybridNoSetup,
    /// Circuit breaker is cooling down and the hybrid fallback is disabled
    HybridDisabled,
    /// Round outcome was never recorded
    UnknownWinner,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::NoEmaSignal => "no_ema_signal",
            SkipReason::WeakGap => "weak_gap",
            SkipReason::EmptyPool => "empty_pool",
            SkipReason::CrowdTie => "crowd_tie",
            SkipReason::PayoutBelowMin => "payout_below_min",
            SkipReason::PayoutAboveMax => "payout_above_max",
            SkipReason::EmaAgreesWithCrowd => "ema_agrees_with_crowd",
            SkipReason::EmaDisagreesWithCrowd => "ema_disagrees_with_crowd",
            SkipReason::HybridWarmup => "hybrid_warmup",
            SkipReason::HybridNoSetup => "hybrid_no_setup",
            SkipReason::HybridDisabled => "hybrid_disabled",
            SkipReason::UnknownWinner => "unknown_winner",
        };
        write!(f, "{}", s)
    }
}

/// How a replay ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// All rounds processed with bankroll remaining
    Completed,
    /// Bankroll hit zero; replay stopped early
    Busted,
    /// Too few usable rounds to evaluate anything
    InsufficientData,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Busted => write!(f, "busted"),
            RunStatus::InsufficientData => write!(f, "insufficient_data"),
        }
    }
}
