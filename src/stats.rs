//! Run Statistics
//!
//! Metrics derived from a finished run's trade log. Pure derivation: the
//! engine never reads these back.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::engine::RunResult;
use crate::types::{RunStatus, Trade};

#[derive(Debug, Clone, Serialize)]
pub struct RunMetrics {
    pub status: RunStatus,
    pub rounds_processed: usize,
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    /// Wins / total trades, 0.0 with no trades
    pub win_rate: f64,
    /// (final - initial) / initial * 100; -100.0 on bust
    pub roi_pct: f64,
    pub initial_bankroll: Decimal,
    pub final_bankroll: Decimal,
    pub peak_bankroll: Decimal,
    pub max_drawdown_pct: f64,
    /// Gross profit / gross loss; None with no losing trades
    pub profit_factor: Option<f64>,
    pub avg_win: Decimal,
    pub avg_loss: Decimal,
    pub longest_win_streak: usize,
    pub longest_loss_streak: usize,
    /// Trades placed by the hybrid fallback
    pub hybrid_trades: usize,
    /// Rounds that produced no trade, all reasons combined
    pub skipped_rounds: usize,
}

impl RunMetrics {
    pub fn from_result(result: &RunResult) -> Self {
        let trades = &result.trades;
        let total = trades.len();
        let wins = trades.iter().filter(|t| t.won).count();
        let losses = total - wins;

        let gross_profit: Decimal = trades
            .iter()
            .filter(|t| t.won)
            .map(|t| t.profit)
            .sum();
        let gross_loss: Decimal = trades
            .iter()
            .filter(|t| !t.won)
            .map(|t| -t.profit)
            .sum();

        let profit_factor = if gross_loss > Decimal::ZERO {
            Some(
                (gross_profit / gross_loss).to_f64().unwrap_or(0.0),
            )
        } else {
            None
        };

        let avg_win = if wins > 0 {
            gross_profit / Decimal::from(wins as u64)
        } else {
            Decimal::ZERO
        };
        let avg_loss = if losses > 0 {
            gross_loss / Decimal::from(losses as u64)
        } else {
            Decimal::ZERO
        };

        let roi_pct = if result.initial_bankroll > Decimal::ZERO {
            ((result.final_bankroll - result.initial_bankroll) / result.initial_bankroll)
                .to_f64()
                .unwrap_or(0.0)
                * 100.0
        } else {
            0.0
        };

        Self {
            status: result.status,
            rounds_processed: result.rounds_processed,
            total_trades: total,
            wins,
            losses,
            win_rate: if total > 0 { wins as f64 / total as f64 } else { 0.0 },
            roi_pct,
            initial_bankroll: result.initial_bankroll,
            final_bankroll: result.final_bankroll,
            peak_bankroll: result.peak_bankroll,
            max_drawdown_pct: result.max_drawdown_pct,
            profit_factor,
            avg_win,
            avg_loss,
            longest_win_streak: longest_streak(trades, true),
            longest_loss_streak: longest_streak(trades, false),
            hybrid_trades: trades.iter().filter(|t| t.used_hybrid).count(),
            skipped_rounds: result.skips.values().sum(),
        }
    }
}

/// Longest run of consecutive trades with `won == target`.
pub fn longest_streak(trades: &[Trade], target: bool) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for trade in trades {
        if trade.won == target {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn make_trade(won: bool, profit: Decimal) -> Trade {
        Trade {
            epoch: 1,
            side: Side::Up,
            stake: dec!(0.05),
            won,
            payout: if won { dec!(2.0) } else { Decimal::ZERO },
            profit,
            bankroll_after: dec!(1.0),
            used_hybrid: false,
        }
    }

    fn make_result(trades: Vec<Trade>, final_bankroll: Decimal) -> RunResult {
        RunResult {
            status: RunStatus::Completed,
            initial_bankroll: dec!(1.0),
            final_bankroll,
            peak_bankroll: dec!(1.2),
            max_drawdown_pct: 5.0,
            rounds_processed: trades.len(),
            trades,
            skips: BTreeMap::new(),
        }
    }

    #[test]
    fn win_rate_and_profit_factor() {
        let trades = vec![
            make_trade(true, dec!(0.10)),
            make_trade(true, dec!(0.10)),
            make_trade(false, dec!(-0.05)),
            make_trade(false, dec!(-0.05)),
        ];
        let metrics = RunMetrics::from_result(&make_result(trades, dec!(1.10)));
        assert_eq!(metrics.wins, 2);
        assert_eq!(metrics.losses, 2);
        assert!((metrics.win_rate - 0.5).abs() < 1e-9);
        // 0.20 gross profit / 0.10 gross loss
        assert!((metrics.profit_factor.unwrap() - 2.0).abs() < 1e-9);
        assert_eq!(metrics.avg_win, dec!(0.10));
        assert_eq!(metrics.avg_loss, dec!(0.05));
    }

    #[test]
    fn profit_factor_undefined_without_losses() {
        let trades = vec![make_trade(true, dec!(0.10))];
        let metrics = RunMetrics::from_result(&make_result(trades, dec!(1.10)));
        assert_eq!(metrics.profit_factor, None);
    }

    #[test]
    fn roi_is_minus_hundred_on_bust() {
        let trades = vec![make_trade(false, dec!(-1.0))];
        let mut result = make_result(trades, Decimal::ZERO);
        result.status = RunStatus::Busted;
        let metrics = RunMetrics::from_result(&result);
        assert!((metrics.roi_pct - (-100.0)).abs() < 1e-9);
    }

    #[test]
    fn streaks() {
        let trades = vec![
            make_trade(true, dec!(0.1)),
            make_trade(true, dec!(0.1)),
            make_trade(true, dec!(0.1)),
            make_trade(false, dec!(-0.1)),
            make_trade(false, dec!(-0.1)),
            make_trade(true, dec!(0.1)),
        ];
        assert_eq!(longest_streak(&trades, true), 3);
        assert_eq!(longest_streak(&trades, false), 2);
    }

    #[test]
    fn empty_log_yields_zeroes() {
        let metrics = RunMetrics::from_result(&make_result(vec![], dec!(1.0)));
        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.profit_factor, None);
        assert_eq!(metrics.longest_win_streak, 0);
    }
}
