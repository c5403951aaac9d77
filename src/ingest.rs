//! Round Ingestion
//!
//! Validated boundary between the rounds CSV and the engine. Rows arrive
//! lossy (`RawRound`, everything optional) and either pass validation into a
//! `RoundRecord` or get skipped with a warning — bad data never reaches the
//! arithmetic as a NaN or a negative pool. Rounds are sorted by
//! `(lock_ts, epoch)` so the replay walks them in lock order.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

use crate::types::{EmaSignal, RoundRecord, Winner};

/// One CSV row before validation.
#[derive(Debug, Deserialize)]
pub struct RawRound {
    pub epoch: Option<u64>,
    pub lock_ts: Option<i64>,
    pub lock_price: Option<Decimal>,
    pub close_price: Option<Decimal>,
    pub winner: Option<String>,
    pub bull_pool: Option<Decimal>,
    pub bear_pool: Option<Decimal>,
    pub winner_payout_multiple: Option<Decimal>,
    pub ema_signal: Option<String>,
    pub ema_gap_pct: Option<f64>,
}

impl RawRound {
    /// Promote to a `RoundRecord`, or `None` when the row is unusable.
    /// Missing EMA state degrades to Neutral and a missing winner to Unknown
    /// (the round still contributes its close price to indicator history);
    /// missing ids, prices, or pools reject the row outright.
    pub fn validate(self) -> Option<RoundRecord> {
        let epoch = self.epoch?;
        let lock_ts = self.lock_ts?;
        let lock_price = self.lock_price.filter(|p| *p > Decimal::ZERO)?;
        let close_price = self.close_price.filter(|p| *p > Decimal::ZERO)?;
        let bull_pool = self.bull_pool.filter(|p| *p >= Decimal::ZERO)?;
        let bear_pool = self.bear_pool.filter(|p| *p >= Decimal::ZERO)?;

        let winner_payout_multiple = match self.winner_payout_multiple {
            Some(m) if m < Decimal::ZERO => return None,
            Some(m) => m,
            None => Decimal::ZERO,
        };

        let ema_gap_pct = match self.ema_gap_pct {
            Some(g) if !g.is_finite() => return None,
            Some(g) => g,
            None => 0.0,
        };

        let winner = match self.winner.as_deref().map(str::to_ascii_lowercase) {
            Some(w) if w == "up" || w == "bull" => Winner::Up,
            Some(w) if w == "down" || w == "bear" => Winner::Down,
            _ => Winner::Unknown,
        };

        let ema_signal = match self.ema_signal.as_deref().map(str::to_ascii_lowercase) {
            Some(s) if s == "bull" => EmaSignal::Bull,
            Some(s) if s == "bear" => EmaSignal::Bear,
            _ => EmaSignal::Neutral,
        };

        Some(RoundRecord {
            epoch,
            lock_ts,
            lock_price,
            close_price,
            winner,
            bull_pool,
            bear_pool,
            winner_payout_multiple,
            ema_signal,
            ema_gap_pct,
        })
    }
}

/// Load and validate the rounds CSV. Returns the sorted rounds and the
/// number of rows skipped as malformed.
pub fn load_rounds<P: AsRef<Path>>(path: P) -> Result<(Vec<RoundRecord>, usize)> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open rounds CSV at {}", path.display()))?;

    let mut rounds = Vec::new();
    let mut skipped = 0usize;

    for (idx, result) in reader.deserialize::<RawRound>().enumerate() {
        let row = idx + 2; // 1-based, after the header
        match result {
            Ok(raw) => match raw.validate() {
                Some(round) => rounds.push(round),
                None => {
                    skipped += 1;
                    warn!(row, "Skipping round with missing or invalid fields");
                }
            },
            Err(e) => {
                skipped += 1;
                warn!(row, error = %e, "Skipping unparseable round row");
            }
        }
    }

    rounds.sort_by_key(|r| (r.lock_ts, r.epoch));

    info!(
        loaded = rounds.len(),
        skipped,
        "Loaded rounds from {}",
        path.display()
    );
    Ok((rounds, skipped))
}
