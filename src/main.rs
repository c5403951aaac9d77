//! PredSim binary: load config, ingest rounds, run a single replay or a
//! parameter sweep, and write the artifacts (trade log CSV, metrics JSON,
//! sweep table) under the configured output directory.

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use predsim::config::AppConfig;
use predsim::engine::{self, RunResult};
use predsim::ingest;
use predsim::stats::RunMetrics;
use predsim::sweep;
use predsim::types::RunStatus;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let app_config = AppConfig::load().context("Failed to load configuration")?;
    info!("Starting predsim: {}", app_config.digest());

    // Reject bad strategy parameters before touching any data.
    app_config
        .sim
        .validate()
        .context("Invalid strategy configuration")?;

    let (rounds, skipped_rows) = ingest::load_rounds(&app_config.data.rounds_csv)?;
    if skipped_rows > 0 {
        warn!(skipped_rows, "Some CSV rows were malformed and ignored");
    }

    let output_dir = PathBuf::from(&app_config.data.output_dir);
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output dir {}", output_dir.display()))?;
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");

    if app_config.sweep.enabled {
        let outcomes = sweep::run_sweep(&rounds, &app_config.sim, &app_config.sweep)?;
        let path = output_dir.join(format!("sweep_{stamp}.csv"));
        sweep::export_csv(&outcomes, &path)?;

        if let Some(best) = outcomes.first() {
            info!(
                roi_pct = best.metrics.roi_pct,
                trades = best.metrics.total_trades,
                mode = %best.config.mode,
                base_fraction = %best.config.base_fraction,
                min_payout = %best.config.min_payout,
                "Best sweep combination"
            );
        }
        return Ok(());
    }

    let result = engine::simulate(&rounds, &app_config.sim)?;
    let metrics = RunMetrics::from_result(&result);

    write_trade_log(&result, &output_dir.join(format!("trades_{stamp}.csv")))?;
    let metrics_path = output_dir.join(format!("metrics_{stamp}.json"));
    fs::write(
        &metrics_path,
        serde_json::to_string_pretty(&metrics).context("Failed to serialize metrics")?,
    )
    .with_context(|| format!("Failed to write {}", metrics_path.display()))?;

    for (reason, count) in &result.skips {
        info!(%reason, count, "Skipped rounds");
    }

    match result.status {
        RunStatus::Completed => info!(
            trades = metrics.total_trades,
            win_rate = format!("{:.1}%", metrics.win_rate * 100.0),
            roi = format!("{:+.2}%", metrics.roi_pct),
            final_bankroll = %metrics.final_bankroll,
            max_drawdown = format!("{:.1}%", metrics.max_drawdown_pct),
            "Run completed"
        ),
        RunStatus::Busted => info!(
            trades = metrics.total_trades,
            rounds_survived = result.rounds_processed,
            "Run BUSTED: bankroll reached zero"
        ),
        RunStatus::InsufficientData => warn!(
            rounds = rounds.len(),
            minimum = engine::MIN_ROUNDS_FOR_EVAL,
            "Insufficient data: nothing to evaluate"
        ),
    }

    Ok(())
}

fn write_trade_log(result: &RunResult, path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to create trade log at {}", path.display()))?;
    for trade in &result.trades {
        writer.serialize(trade)?;
    }
    writer.flush().context("Failed to flush trade log")?;
    info!(trades = result.trades.len(), "Wrote trade log to {}", path.display());
    Ok(())
}
