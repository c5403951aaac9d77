//! Parameter Sweeps
//!
//! Replays the same rounds across a grid of strategy parameters and ranks
//! the outcomes by ROI. The sweep is a pure outer driver: each combination
//! runs through `engine::simulate` unchanged, so one sweep row is always
//! identical to a single run with the same config.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::config::{SimConfig, StrategyMode};
use crate::engine;
use crate::error::ConfigError;
use crate::stats::RunMetrics;
use crate::types::RoundRecord;

/// Sweep axes. An empty axis keeps the base config's value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SweepGrid {
    pub enabled: bool,
    #[serde(default)]
    pub base_fraction: Vec<Decimal>,
    #[serde(default)]
    pub min_payout: Vec<Decimal>,
    #[serde(default)]
    pub momentum_multiplier: Vec<Decimal>,
    #[serde(default)]
    pub circuit_breaker_loss_count: Vec<u32>,
    #[serde(default)]
    pub cooldown_minutes: Vec<i64>,
    #[serde(default)]
    pub mode: Vec<StrategyMode>,
    #[serde(default)]
    pub hybrid_enabled: Vec<bool>,
}

impl SweepGrid {
    /// Cartesian product of all axes over the base config.
    pub fn expand(&self, base: &SimConfig) -> Vec<SimConfig> {
        let base_fractions = axis(&self.base_fraction, base.base_fraction);
        let min_payouts = axis(&self.min_payout, base.min_payout);
        let momentum_multipliers = axis(&self.momentum_multiplier, base.momentum_multiplier);
        let loss_counts = axis(&self.circuit_breaker_loss_count, base.circuit_breaker_loss_count);
        let cooldowns = axis(&self.cooldown_minutes, base.circuit_breaker_cooldown_minutes);
        let modes = axis(&self.mode, base.mode);
        let hybrids = axis(&self.hybrid_enabled, base.hybrid_enabled);

        let mut configs = Vec::new();
        for &base_fraction in &base_fractions {
            for &min_payout in &min_payouts {
                for &momentum_multiplier in &momentum_multipliers {
                    for &loss_count in &loss_counts {
                        for &cooldown in &cooldowns {
                            for &mode in &modes {
                                for &hybrid_enabled in &hybrids {
                                    configs.push(SimConfig {
                                        base_fraction,
                                        min_payout,
                                        momentum_multiplier,
                                        circuit_breaker_loss_count: loss_count,
                                        circuit_breaker_cooldown_minutes: cooldown,
                                        mode,
                                        hybrid_enabled,
                                        ..base.clone()
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }
        configs
    }
}

fn axis<T: Copy>(values: &[T], fallback: T) -> Vec<T> {
    if values.is_empty() {
        vec![fallback]
    } else {
        values.to_vec()
    }
}

/// One grid point's configuration and outcome.
#[derive(Debug)]
pub struct SweepOutcome {
    pub config: SimConfig,
    pub metrics: RunMetrics,
}

/// Replay every grid combination, best ROI first.
pub fn run_sweep(
    rounds: &[RoundRecord],
    base: &SimConfig,
    grid: &SweepGrid,
) -> Result<Vec<SweepOutcome>, ConfigError> {
    let configs = grid.expand(base);
    info!(combinations = configs.len(), "Running parameter sweep");

    let mut outcomes = Vec::with_capacity(configs.len());
    for config in configs {
        let result = engine::simulate(rounds, &config)?;
        let metrics = RunMetrics::from_result(&result);
        outcomes.push(SweepOutcome { config, metrics });
    }

    outcomes.sort_by(|a, b| {
        b.metrics
            .roi_pct
            .partial_cmp(&a.metrics.roi_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(outcomes)
}

/// Flat CSV row for one sweep outcome.
#[derive(Debug, Serialize)]
struct SweepRow {
    mode: StrategyMode,
    base_fraction: Decimal,
    min_payout: Decimal,
    momentum_multiplier: Decimal,
    loss_count: u32,
    cooldown_minutes: i64,
    hybrid_enabled: bool,
    status: crate::types::RunStatus,
    trades: usize,
    win_rate: f64,
    roi_pct: f64,
    max_drawdown_pct: f64,
    profit_factor: Option<f64>,
    final_bankroll: Decimal,
}

/// Write the ranked sweep results as CSV.
pub fn export_csv<P: AsRef<Path>>(outcomes: &[SweepOutcome], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to create sweep CSV at {}", path.display()))?;

    for outcome in outcomes {
        writer.serialize(SweepRow {
            mode: outcome.config.mode,
            base_fraction: outcome.config.base_fraction,
            min_payout: outcome.config.min_payout,
            momentum_multiplier: outcome.config.momentum_multiplier,
            loss_count: outcome.config.circuit_breaker_loss_count,
            cooldown_minutes: outcome.config.circuit_breaker_cooldown_minutes,
            hybrid_enabled: outcome.config.hybrid_enabled,
            status: outcome.metrics.status,
            trades: outcome.metrics.total_trades,
            win_rate: outcome.metrics.win_rate,
            roi_pct: outcome.metrics.roi_pct,
            max_drawdown_pct: outcome.metrics.max_drawdown_pct,
            profit_factor: outcome.metrics.profit_factor,
            final_bankroll: outcome.metrics.final_bankroll,
        })?;
    }
    writer.flush().context("Failed to flush sweep CSV")?;
    info!(rows = outcomes.len(), "Exported sweep results to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EmaSignal, Winner};
    use rust_decimal_macros::dec;

    fn make_rounds(n: usize) -> Vec<RoundRecord> {
        (0..n)
            .map(|i| RoundRecord {
                epoch: i as u64 + 1,
                lock_ts: 1_700_000_000 + i as i64 * 300,
                lock_price: dec!(300),
                close_price: dec!(300.5),
                winner: if i % 2 == 0 { Winner::Up } else { Winner::Down },
                bull_pool: dec!(30),
                bear_pool: dec!(70),
                winner_payout_multiple: dec!(2.0),
                ema_signal: EmaSignal::Bull,
                ema_gap_pct: 0.05,
            })
            .collect()
    }

    #[test]
    fn empty_grid_expands_to_base_config() {
        let grid = SweepGrid::default();
        let configs = grid.expand(&SimConfig::default());
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].base_fraction, dec!(0.045));
    }

    #[test]
    fn expansion_is_cartesian() {
        let grid = SweepGrid {
            base_fraction: vec![dec!(0.03), dec!(0.05)],
            min_payout: vec![dec!(1.4), dec!(1.5), dec!(1.6)],
            mode: vec![StrategyMode::Contrarian, StrategyMode::Consensus],
            ..SweepGrid::default()
        };
        let configs = grid.expand(&SimConfig::default());
        assert_eq!(configs.len(), 2 * 3 * 2);
    }

    #[test]
    fn sweep_results_sorted_by_roi() {
        let rounds = make_rounds(40);
        let grid = SweepGrid {
            base_fraction: vec![dec!(0.01), dec!(0.05), dec!(0.1)],
            ..SweepGrid::default()
        };
        let outcomes = run_sweep(&rounds, &SimConfig::default(), &grid).unwrap();
        assert_eq!(outcomes.len(), 3);
        for pair in outcomes.windows(2) {
            assert!(pair[0].metrics.roi_pct >= pair[1].metrics.roi_pct);
        }
    }

    #[test]
    fn sweep_row_matches_single_run() {
        let rounds = make_rounds(40);
        let grid = SweepGrid {
            min_payout: vec![dec!(1.5)],
            ..SweepGrid::default()
        };
        let outcomes = run_sweep(&rounds, &SimConfig::default(), &grid).unwrap();

        let single_config = SimConfig {
            min_payout: dec!(1.5),
            ..SimConfig::default()
        };
        let single = engine::simulate(&rounds, &single_config).unwrap();
        let single_metrics = RunMetrics::from_result(&single);

        assert_eq!(outcomes[0].metrics.total_trades, single_metrics.total_trades);
        assert_eq!(outcomes[0].metrics.final_bankroll, single_metrics.final_bankroll);
    }
}
