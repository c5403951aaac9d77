//! Configuration management for PredSim
//!
//! Loads from config files + environment variables via .env. Strategy
//! parameters live in `SimConfig`; the surrounding application settings
//! (data source, output directory, sweep grid) in `AppConfig`.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sweep::SweepGrid;

/// Primary signal rule used while the circuit breaker is Active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyMode {
    /// Bet with the EMA only when it fades the crowd
    Contrarian,
    /// Bet with the EMA only when it follows the crowd
    Consensus,
}

impl std::fmt::Display for StrategyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyMode::Contrarian => write!(f, "contrarian"),
            StrategyMode::Consensus => write!(f, "consensus"),
        }
    }
}

/// Which recent loss pattern arms the recovery multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryRule {
    /// Exactly one loss, and it was the most recent result
    AfterSingleLoss,
    /// The last two results were both losses
    AfterTwoLosses,
}

/// Strategy parameters for one simulation run.
#[derive(Debug, Clone, Deserialize)]
pub struct SimConfig {
    /// Starting bankroll (BNB)
    pub initial_bankroll: Decimal,
    /// Fraction of bankroll staked per trade
    pub base_fraction: Decimal,
    /// |ema_gap_pct| at or above this arms the momentum multiplier
    pub momentum_threshold: f64,
    /// Stake multiplier on strong EMA gap
    pub momentum_multiplier: Decimal,
    /// One-time stake multiplier after a recent loss
    pub recovery_multiplier: Decimal,
    /// Loss pattern that arms the recovery multiplier
    pub recovery_rule: RecoveryRule,
    /// Consecutive wins that trigger the profit-taking stake
    pub profit_taking_wins: u32,
    /// Bankroll fraction staked on the profit-taking trade
    pub profit_taking_fraction: Decimal,
    /// Minimum implied payout to take any primary-mode trade
    pub min_payout: Decimal,
    /// Minimum implied payout for hybrid trades
    pub hybrid_min_payout: Decimal,
    /// Maximum implied payout accepted in consensus mode
    pub consensus_max_payout: Decimal,
    /// Minimum |ema_gap_pct| to consider a round at all
    pub gap_threshold: f64,
    /// Protocol fee taken from the total pool
    pub fee_rate: Decimal,
    /// Consecutive losses that trip the circuit breaker
    pub circuit_breaker_loss_count: u32,
    /// Cooldown length after the breaker trips
    pub circuit_breaker_cooldown_minutes: i64,
    /// Primary signal rule
    pub mode: StrategyMode,
    /// Fall back to hybrid mean reversion during cooldown
    pub hybrid_enabled: bool,
    /// Closes in the hybrid Bollinger/momentum window
    pub hybrid_lookback: usize,
    /// Band position at or below which the price counts as oversold
    /// (symmetric: 1 - entry counts as overbought)
    pub hybrid_band_entry: f64,
    /// Window momentum magnitude that counts as a reversion setup
    pub hybrid_momentum_threshold: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            initial_bankroll: dec!(1.0),
            base_fraction: dec!(0.045),
            momentum_threshold: 0.15,
            momentum_multiplier: dec!(1.889),
            recovery_multiplier: dec!(1.5),
            recovery_rule: RecoveryRule::AfterSingleLoss,
            profit_taking_wins: 2,
            profit_taking_fraction: dec!(0.02),
            min_payout: dec!(1.45),
            hybrid_min_payout: dec!(1.60),
            consensus_max_payout: dec!(1.90),
            gap_threshold: 0.0,
            fee_rate: dec!(0.03),
            circuit_breaker_loss_count: 3,
            circuit_breaker_cooldown_minutes: 30,
            mode: StrategyMode::Contrarian,
            hybrid_enabled: true,
            hybrid_lookback: 20,
            hybrid_band_entry: 0.2,
            hybrid_momentum_threshold: 0.012,
        }
    }
}

impl SimConfig {
    /// Reject invalid parameters before any round is processed. Values are
    /// never silently clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive_decimals = [
            ("initial_bankroll", self.initial_bankroll),
            ("base_fraction", self.base_fraction),
            ("momentum_multiplier", self.momentum_multiplier),
            ("recovery_multiplier", self.recovery_multiplier),
            ("profit_taking_fraction", self.profit_taking_fraction),
        ];
        for (name, value) in positive_decimals {
            if value <= Decimal::ZERO {
                return Err(ConfigError::NonPositive {
                    name,
                    value: value.to_string(),
                });
            }
        }
        if self.momentum_threshold < 0.0 {
            return Err(ConfigError::NonPositive {
                name: "momentum_threshold",
                value: self.momentum_threshold.to_string(),
            });
        }
        if self.gap_threshold < 0.0 {
            return Err(ConfigError::NonPositive {
                name: "gap_threshold",
                value: self.gap_threshold.to_string(),
            });
        }
        if self.hybrid_momentum_threshold <= 0.0 {
            return Err(ConfigError::NonPositive {
                name: "hybrid_momentum_threshold",
                value: self.hybrid_momentum_threshold.to_string(),
            });
        }
        if self.fee_rate < Decimal::ZERO || self.fee_rate >= Decimal::ONE {
            return Err(ConfigError::InvalidFeeRate(self.fee_rate));
        }
        let payout_floors = [
            ("min_payout", self.min_payout),
            ("hybrid_min_payout", self.hybrid_min_payout),
            ("consensus_max_payout", self.consensus_max_payout),
        ];
        for (name, value) in payout_floors {
            if value <= Decimal::ONE {
                return Err(ConfigError::PayoutFloorTooLow { name, value });
            }
        }
        if self.circuit_breaker_loss_count == 0 {
            return Err(ConfigError::ZeroLossCount);
        }
        if self.circuit_breaker_cooldown_minutes <= 0 {
            return Err(ConfigError::NonPositiveCooldown(
                self.circuit_breaker_cooldown_minutes,
            ));
        }
        if self.hybrid_lookback < 2 {
            return Err(ConfigError::LookbackTooShort(self.hybrid_lookback));
        }
        Ok(())
    }
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub data: DataConfig,
    pub sim: SimConfig,
    pub sweep: SweepGrid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Path to the rounds CSV
    pub rounds_csv: String,
    /// Directory for trade logs and metrics dumps
    pub output_dir: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Config::builder()
            // Data defaults
            .set_default("data.rounds_csv", "./data/rounds.csv")?
            .set_default("data.output_dir", "./data/out")?
            // Simulation defaults
            .set_default("sim.initial_bankroll", 1.0)?
            .set_default("sim.base_fraction", 0.045)?
            .set_default("sim.momentum_threshold", 0.15)?
            .set_default("sim.momentum_multiplier", 1.889)?
            .set_default("sim.recovery_multiplier", 1.5)?
            .set_default("sim.recovery_rule", "after_single_loss")?
            .set_default("sim.profit_taking_wins", 2)?
            .set_default("sim.profit_taking_fraction", 0.02)?
            .set_default("sim.min_payout", 1.45)?
            .set_default("sim.hybrid_min_payout", 1.60)?
            .set_default("sim.consensus_max_payout", 1.90)?
            .set_default("sim.gap_threshold", 0.0)?
            .set_default("sim.fee_rate", 0.03)?
            .set_default("sim.circuit_breaker_loss_count", 3)?
            .set_default("sim.circuit_breaker_cooldown_minutes", 30)?
            .set_default("sim.mode", "contrarian")?
            .set_default("sim.hybrid_enabled", true)?
            .set_default("sim.hybrid_lookback", 20)?
            .set_default("sim.hybrid_band_entry", 0.2)?
            .set_default("sim.hybrid_momentum_threshold", 0.012)?
            // Sweep defaults (axes default to empty in SweepGrid)
            .set_default("sweep.enabled", false)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (PREDSIM_*)
            .add_source(Environment::with_prefix("PREDSIM").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(app_config)
    }

    /// Generate a digest of the config for startup logging
    pub fn digest(&self) -> String {
        format!(
            "mode={} bankroll={} base_fraction={} min_payout={} breaker={}x{}m hybrid={} sweep={}",
            self.sim.mode,
            self.sim.initial_bankroll,
            self.sim.base_fraction,
            self.sim.min_payout,
            self.sim.circuit_breaker_loss_count,
            self.sim.circuit_breaker_cooldown_minutes,
            self.sim.hybrid_enabled,
            self.sweep.enabled,
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
