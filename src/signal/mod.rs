//! Signal Generation
//!
//! Pure decision functions: given one round's recorded state (and, for the
//! hybrid rule, recent close prices) produce a `Signal` or the reason no
//! trade was taken. `Err(SkipReason)` means "pass on this round", never a
//! failure — the engine counts skips per reason.

pub mod hybrid;

use crate::config::{SimConfig, StrategyMode};
use crate::types::{RoundRecord, Signal, Side, SkipReason};
use rust_decimal::Decimal;

/// Which rule evaluates the round, chosen by the engine per the circuit
/// breaker regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Primary(StrategyMode),
    Hybrid,
}

/// Evaluate one round. `closes` is the close-price history of prior rounds,
/// oldest first (only the hybrid rule reads it).
pub fn generate(
    round: &RoundRecord,
    mode: Mode,
    closes: &[f64],
    config: &SimConfig,
) -> Result<Signal, SkipReason> {
    // Guards shared by every mode.
    if round.total_pool() <= Decimal::ZERO {
        return Err(SkipReason::EmptyPool);
    }
    let ema_dir = round.ema_signal.direction().ok_or(SkipReason::NoEmaSignal)?;
    if round.ema_gap_pct.abs() < config.gap_threshold {
        return Err(SkipReason::WeakGap);
    }

    match mode {
        Mode::Primary(StrategyMode::Contrarian) => contrarian(round, ema_dir, config),
        Mode::Primary(StrategyMode::Consensus) => consensus(round, ema_dir, config),
        Mode::Hybrid => hybrid::generate(round, closes, config),
    }
}

/// Bet the EMA direction only when the crowd leans the other way: the
/// thin side carries the payout.
fn contrarian(
    round: &RoundRecord,
    ema_dir: Side,
    config: &SimConfig,
) -> Result<Signal, SkipReason> {
    let crowd = round.crowd_side().ok_or(SkipReason::CrowdTie)?;
    if ema_dir == crowd {
        return Err(SkipReason::EmaAgreesWithCrowd);
    }
    let payout = round
        .implied_payout(ema_dir, config.fee_rate)
        .ok_or(SkipReason::EmptyPool)?;
    if payout < config.min_payout {
        return Err(SkipReason::PayoutBelowMin);
    }
    Ok(Signal {
        side: ema_dir,
        implied_payout: payout,
        used_hybrid: false,
    })
}

/// Bet the EMA direction only when the crowd agrees, and only while the
/// crowd is not so lopsided that the payout collapses toward 1.0.
fn consensus(
    round: &RoundRecord,
    ema_dir: Side,
    config: &SimConfig,
) -> Result<Signal, SkipReason> {
    let crowd = round.crowd_side().ok_or(SkipReason::CrowdTie)?;
    if ema_dir != crowd {
        return Err(SkipReason::EmaDisagreesWithCrowd);
    }
    let payout = round
        .implied_payout(ema_dir, config.fee_rate)
        .ok_or(SkipReason::EmptyPool)?;
    if payout < config.min_payout {
        return Err(SkipReason::PayoutBelowMin);
    }
    if payout > config.consensus_max_payout {
        return Err(SkipReason::PayoutAboveMax);
    }
    Ok(Signal {
        side: ema_dir,
        implied_payout: payout,
        used_hybrid: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EmaSignal, Winner};
    use rust_decimal_macros::dec;

    fn make_round(ema: EmaSignal, bull: Decimal, bear: Decimal) -> RoundRecord {
        RoundRecord {
            epoch: 42,
            lock_ts: 1_700_000_000,
            lock_price: dec!(310.5),
            close_price: dec!(311.0),
            winner: Winner::Up,
            bull_pool: bull,
            bear_pool: bear,
            winner_payout_multiple: Decimal::ZERO,
            ema_signal: ema,
            ema_gap_pct: 0.3,
        }
    }

    fn contrarian_config() -> SimConfig {
        SimConfig::default()
    }

    fn consensus_config() -> SimConfig {
        SimConfig {
            mode: StrategyMode::Consensus,
            ..SimConfig::default()
        }
    }

    #[test]
    fn contrarian_bets_against_crowd() {
        let config = contrarian_config();
        // Crowd on DOWN, EMA bullish: bet UP at the fat payout.
        let round = make_round(EmaSignal::Bull, dec!(20), dec!(80));
        let signal =
            generate(&round, Mode::Primary(StrategyMode::Contrarian), &[], &config).unwrap();
        assert_eq!(signal.side, Side::Up);
        assert!(!signal.used_hybrid);
        // 100 * 0.97 / 20 = 4.85
        assert_eq!(signal.implied_payout, dec!(4.85));
    }

    #[test]
    fn contrarian_skips_when_ema_follows_crowd() {
        let config = contrarian_config();
        let round = make_round(EmaSignal::Bull, dec!(80), dec!(20));
        let result = generate(&round, Mode::Primary(StrategyMode::Contrarian), &[], &config);
        assert_eq!(result, Err(SkipReason::EmaAgreesWithCrowd));
    }

    #[test]
    fn neutral_ema_skips_in_every_mode() {
        let config = contrarian_config();
        let round = make_round(EmaSignal::Neutral, dec!(20), dec!(80));
        for mode in [
            Mode::Primary(StrategyMode::Contrarian),
            Mode::Primary(StrategyMode::Consensus),
            Mode::Hybrid,
        ] {
            let closes = vec![300.0; 32];
            let result = generate(&round, mode, &closes, &config);
            assert_eq!(result, Err(SkipReason::NoEmaSignal));
        }
    }

    #[test]
    fn weak_gap_skips() {
        let config = SimConfig {
            gap_threshold: 0.5,
            ..contrarian_config()
        };
        let round = make_round(EmaSignal::Bull, dec!(20), dec!(80));
        let result = generate(&round, Mode::Primary(StrategyMode::Contrarian), &[], &config);
        assert_eq!(result, Err(SkipReason::WeakGap));
    }

    #[test]
    fn pool_tie_skips() {
        let config = contrarian_config();
        let round = make_round(EmaSignal::Bull, dec!(50), dec!(50));
        let result = generate(&round, Mode::Primary(StrategyMode::Contrarian), &[], &config);
        assert_eq!(result, Err(SkipReason::CrowdTie));
    }

    #[test]
    fn empty_round_skips() {
        let config = contrarian_config();
        let round = make_round(EmaSignal::Bull, dec!(0), dec!(0));
        let result = generate(&round, Mode::Primary(StrategyMode::Contrarian), &[], &config);
        assert_eq!(result, Err(SkipReason::EmptyPool));
    }

    #[test]
    fn single_sided_pool_skips() {
        let config = contrarian_config();
        // Crowd on DOWN, EMA bullish, but nobody staked UP: payout undefined.
        let round = make_round(EmaSignal::Bull, dec!(0), dec!(80));
        let result = generate(&round, Mode::Primary(StrategyMode::Contrarian), &[], &config);
        assert_eq!(result, Err(SkipReason::EmptyPool));
    }

    #[test]
    fn contrarian_enforces_payout_floor() {
        let config = contrarian_config();
        // Crowd barely on DOWN: UP payout 100*0.97/49 ≈ 1.98 passes,
        // but with a higher floor it does not.
        let round = make_round(EmaSignal::Bull, dec!(49), dec!(51));
        assert!(generate(&round, Mode::Primary(StrategyMode::Contrarian), &[], &config).is_ok());

        let strict = SimConfig {
            min_payout: dec!(2.5),
            ..contrarian_config()
        };
        let result = generate(&round, Mode::Primary(StrategyMode::Contrarian), &[], &strict);
        assert_eq!(result, Err(SkipReason::PayoutBelowMin));
    }

    #[test]
    fn consensus_bets_with_crowd_inside_payout_band() {
        let config = consensus_config();
        // Crowd slightly on UP, EMA bullish: payout 100*0.97/55 ≈ 1.7636
        let round = make_round(EmaSignal::Bull, dec!(55), dec!(45));
        let signal =
            generate(&round, Mode::Primary(StrategyMode::Consensus), &[], &config).unwrap();
        assert_eq!(signal.side, Side::Up);
    }

    #[test]
    fn consensus_skips_when_ema_fades_crowd() {
        let config = consensus_config();
        let round = make_round(EmaSignal::Bear, dec!(55), dec!(45));
        let result = generate(&round, Mode::Primary(StrategyMode::Consensus), &[], &config);
        assert_eq!(result, Err(SkipReason::EmaDisagreesWithCrowd));
    }

    #[test]
    fn consensus_rejects_collapsed_payout() {
        let config = consensus_config();
        // Crowd heavily on UP: payout 100*0.97/80 = 1.2125 < 1.45
        let round = make_round(EmaSignal::Bull, dec!(80), dec!(20));
        let result = generate(&round, Mode::Primary(StrategyMode::Consensus), &[], &config);
        assert_eq!(result, Err(SkipReason::PayoutBelowMin));
    }

    #[test]
    fn consensus_rejects_payout_above_ceiling() {
        let config = consensus_config();
        // Crowd barely on UP: payout 100*0.97/50.5 ≈ 1.9208 > 1.90
        let round = make_round(EmaSignal::Bull, dec!(50.5), dec!(49.5));
        let result = generate(&round, Mode::Primary(StrategyMode::Consensus), &[], &config);
        assert_eq!(result, Err(SkipReason::PayoutAboveMax));
    }
}
