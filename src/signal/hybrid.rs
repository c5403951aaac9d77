//! Hybrid Mean Reversion
//!
//! Fallback rule used while the circuit breaker cools down. Reads the last
//! `hybrid_lookback` close prices: a lock price pinned to the lower Bollinger
//! band (or a sharp down move over the window) is treated as oversold and
//! bet UP, symmetric for DOWN. Indicator math runs on `f64`; only the payout
//! check touches `Decimal`.

use rust_decimal::prelude::ToPrimitive;

use crate::config::SimConfig;
use crate::types::{RoundRecord, Signal, Side, SkipReason};

pub fn generate(
    round: &RoundRecord,
    closes: &[f64],
    config: &SimConfig,
) -> Result<Signal, SkipReason> {
    if closes.len() < config.hybrid_lookback {
        return Err(SkipReason::HybridWarmup);
    }
    let window = &closes[closes.len() - config.hybrid_lookback..];

    let price = round
        .lock_price
        .to_f64()
        .ok_or(SkipReason::HybridNoSetup)?;

    let band_position = band_position(window, price);
    let momentum = window_momentum(window);

    let oversold = band_position.map_or(false, |p| p <= config.hybrid_band_entry)
        || momentum <= -config.hybrid_momentum_threshold;
    let overbought = band_position.map_or(false, |p| p >= 1.0 - config.hybrid_band_entry)
        || momentum >= config.hybrid_momentum_threshold;

    let side = match (oversold, overbought) {
        (true, false) => Side::Up,
        (false, true) => Side::Down,
        // Neither setup, or the indicators contradict each other.
        _ => return Err(SkipReason::HybridNoSetup),
    };

    let payout = round
        .implied_payout(side, config.fee_rate)
        .ok_or(SkipReason::EmptyPool)?;
    if payout < config.hybrid_min_payout {
        return Err(SkipReason::PayoutBelowMin);
    }

    Ok(Signal {
        side,
        implied_payout: payout,
        used_hybrid: true,
    })
}

/// Position of `price` inside the 2-sigma Bollinger band of the window:
/// 0.0 at the lower band, 1.0 at the upper. `None` when the band has zero
/// width (flat window) — momentum decides alone in that case.
fn band_position(window: &[f64], price: f64) -> Option<f64> {
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    if stddev == 0.0 {
        return None;
    }
    let lower = mean - 2.0 * stddev;
    let upper = mean + 2.0 * stddev;
    Some((price - lower) / (upper - lower))
}

/// Relative move across the window: (last - first) / first.
fn window_momentum(window: &[f64]) -> f64 {
    let first = window[0];
    let last = window[window.len() - 1];
    if first == 0.0 {
        return 0.0;
    }
    (last - first) / first
}
