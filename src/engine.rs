//! Simulation Engine
//!
//! Replays recorded rounds against one strategy configuration:
//! 1. poll the circuit breaker for the regime at lock time
//! 2. pick the signal rule (primary while Active, hybrid while Cooldown)
//! 3. generate a signal or record the skip reason
//! 4. size the stake from the current bankroll
//! 5. settle against the recorded winner
//! 6. feed the breaker, the recent-results buffer, and the win streak
//! 7. update peak / drawdown and append the trade
//! 8. stop with status Busted the moment the bankroll hits zero
//!
//! The context is the single owner of all mutable run state; identical
//! rounds and config always produce an identical trade log.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::SimConfig;
use crate::error::ConfigError;
use crate::risk::{CircuitBreaker, Regime};
use crate::signal::{self, Mode};
use crate::sizing::{self, StakeFlags};
use crate::types::{RoundRecord, RunStatus, SkipReason, Trade};

/// Minimum rounds required before a run says anything at all.
pub const MIN_ROUNDS_FOR_EVAL: usize = 10;

/// Last two settled results, oldest evicted first. Drives the recovery
/// multiplier.
#[derive(Debug, Clone, Default)]
pub struct RecentResults {
    slots: [Option<bool>; 2],
}

impl RecentResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, won: bool) {
        self.slots[0] = self.slots[1];
        self.slots[1] = Some(won);
    }

    /// Most recent result.
    pub fn last(&self) -> Option<bool> {
        self.slots[1]
    }

    /// Result before the most recent one.
    pub fn prev(&self) -> Option<bool> {
        self.slots[0]
    }
}

/// Mutable state of one run. Single owner; nothing else holds run state.
#[derive(Debug)]
struct SimulationContext {
    bankroll: Decimal,
    peak_bankroll: Decimal,
    max_drawdown_pct: f64,
    consecutive_wins: u32,
    recent: RecentResults,
    /// Close prices of every round seen so far, capped at the hybrid window.
    closes: Vec<f64>,
    close_cap: usize,
}

impl SimulationContext {
    fn new(config: &SimConfig) -> Self {
        Self {
            bankroll: config.initial_bankroll,
            peak_bankroll: config.initial_bankroll,
            max_drawdown_pct: 0.0,
            consecutive_wins: 0,
            recent: RecentResults::new(),
            closes: Vec::with_capacity(config.hybrid_lookback),
            close_cap: config.hybrid_lookback,
        }
    }

    /// Every round feeds the indicator history, traded or not.
    fn push_close(&mut self, close: Decimal) {
        if let Some(c) = close.to_f64() {
            if self.closes.len() == self.close_cap {
                self.closes.remove(0);
            }
            self.closes.push(c);
        }
    }

    fn update_drawdown(&mut self) {
        if self.bankroll > self.peak_bankroll {
            self.peak_bankroll = self.bankroll;
        }
        if self.peak_bankroll > Decimal::ZERO {
            let dd = (self.peak_bankroll - self.bankroll) / self.peak_bankroll;
            let dd_pct = dd.to_f64().unwrap_or(0.0) * 100.0;
            if dd_pct > self.max_drawdown_pct {
                self.max_drawdown_pct = dd_pct;
            }
        }
    }
}

/// Outcome of one replay.
#[derive(Debug)]
pub struct RunResult {
    pub status: RunStatus,
    pub initial_bankroll: Decimal,
    pub final_bankroll: Decimal,
    pub peak_bankroll: Decimal,
    pub max_drawdown_pct: f64,
    pub trades: Vec<Trade>,
    /// Rounds that produced no trade, counted per reason
    pub skips: BTreeMap<SkipReason, usize>,
    /// Rounds walked before the run ended (traded or skipped)
    pub rounds_processed: usize,
}

/// Replay `rounds` (already sorted by lock time) under `config`.
pub fn simulate(rounds: &[RoundRecord], config: &SimConfig) -> Result<RunResult, ConfigError> {
    config.validate()?;

    let mut ctx = SimulationContext::new(config);
    let mut breaker = CircuitBreaker::new(
        config.circuit_breaker_loss_count,
        config.circuit_breaker_cooldown_minutes,
    );
    let mut trades: Vec<Trade> = Vec::new();
    let mut skips: BTreeMap<SkipReason, usize> = BTreeMap::new();
    let mut rounds_processed = 0usize;
    let mut status = RunStatus::Completed;

    if rounds.len() < MIN_ROUNDS_FOR_EVAL {
        return Ok(RunResult {
            status: RunStatus::InsufficientData,
            initial_bankroll: config.initial_bankroll,
            final_bankroll: ctx.bankroll,
            peak_bankroll: ctx.peak_bankroll,
            max_drawdown_pct: 0.0,
            trades,
            skips,
            rounds_processed: 0,
        });
    }

    for round in rounds {
        rounds_processed += 1;

        let mode = match breaker.regime_at(round.lock_ts) {
            Regime::Active => Mode::Primary(config.mode),
            Regime::Cooldown if config.hybrid_enabled => Mode::Hybrid,
            Regime::Cooldown => {
                *skips.entry(SkipReason::HybridDisabled).or_insert(0) += 1;
                ctx.push_close(round.close_price);
                continue;
            }
        };

        // A round with no recorded outcome cannot settle a bet.
        if round.winner.side().is_none() {
            *skips.entry(SkipReason::UnknownWinner).or_insert(0) += 1;
            ctx.push_close(round.close_price);
            continue;
        }

        let signal = match signal::generate(round, mode, &ctx.closes, config) {
            Ok(signal) => signal,
            Err(reason) => {
                *skips.entry(reason).or_insert(0) += 1;
                ctx.push_close(round.close_price);
                continue;
            }
        };

        let flags = StakeFlags {
            has_momentum: round.ema_gap_pct.abs() >= config.momentum_threshold,
            is_profit_taking: ctx.consecutive_wins == config.profit_taking_wins,
        };
        let stake = sizing::stake(ctx.bankroll, &flags, &ctx.recent, config);

        let won = round.winner.side() == Some(signal.side);
        let payout = if won {
            // Settle at the recorded multiple when the chain recorded one,
            // otherwise at the payout implied by the pools at decision time.
            if round.winner_payout_multiple > Decimal::ZERO {
                round.winner_payout_multiple
            } else {
                signal.implied_payout
            }
        } else {
            Decimal::ZERO
        };
        let profit = if won {
            stake * (payout - Decimal::ONE)
        } else {
            -stake
        };

        ctx.bankroll += profit;
        if ctx.bankroll <= Decimal::ZERO {
            ctx.bankroll = Decimal::ZERO;
        }

        if won {
            breaker.record_win();
            ctx.consecutive_wins += 1;
        } else {
            breaker.record_loss(round.lock_ts);
            ctx.consecutive_wins = 0;
        }
        ctx.recent.push(won);
        ctx.update_drawdown();

        debug!(
            epoch = round.epoch,
            side = %signal.side,
            %stake,
            won,
            bankroll = %ctx.bankroll,
            hybrid = signal.used_hybrid,
            "Settled trade"
        );

        trades.push(Trade {
            epoch: round.epoch,
            side: signal.side,
            stake,
            won,
            payout,
            profit,
            bankroll_after: ctx.bankroll,
            used_hybrid: signal.used_hybrid,
        });

        ctx.push_close(round.close_price);

        if ctx.bankroll == Decimal::ZERO {
            status = RunStatus::Busted;
            break;
        }
    }

    Ok(RunResult {
        status,
        initial_bankroll: config.initial_bankroll,
        final_bankroll: ctx.bankroll,
        peak_bankroll: ctx.peak_bankroll,
        max_drawdown_pct: ctx.max_drawdown_pct,
        trades,
        skips,
        rounds_processed,
    })
}
