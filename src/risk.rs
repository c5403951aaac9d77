//! Risk Management
//!
//! Loss-streak circuit breaker. After a configured number of consecutive
//! losses the breaker trips into Cooldown for a fixed window of round time;
//! during Cooldown the engine consults the hybrid fallback instead of the
//! primary rule. Time is round lock time, never wall-clock, so replays stay
//! deterministic.

use serde::Serialize;

/// Breaker state as seen by the engine when a round locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// Primary rule in force
    Active,
    /// Cooling down; hybrid fallback (or skip) until the window passes
    Cooldown,
}

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    loss_count_to_trip: u32,
    cooldown_secs: i64,
    consecutive_losses: u32,
    /// Lock timestamp at which Cooldown ends. Never decreases.
    cooldown_until: i64,
}

impl CircuitBreaker {
    pub fn new(loss_count_to_trip: u32, cooldown_minutes: i64) -> Self {
        Self {
            loss_count_to_trip,
            cooldown_secs: cooldown_minutes * 60,
            consecutive_losses: 0,
            cooldown_until: i64::MIN,
        }
    }

    /// Regime in force for a round locking at `lock_ts`. Cooldown ends the
    /// moment `lock_ts` reaches `cooldown_until`.
    pub fn regime_at(&self, lock_ts: i64) -> Regime {
        if lock_ts < self.cooldown_until {
            Regime::Cooldown
        } else {
            Regime::Active
        }
    }

    /// A win clears the loss streak regardless of regime.
    pub fn record_win(&mut self) {
        self.consecutive_losses = 0;
    }

    /// A loss extends the streak; reaching the trip count opens a cooldown
    /// window from the losing round's lock time and clears the streak.
    pub fn record_loss(&mut self, lock_ts: i64) {
        self.consecutive_losses += 1;
        if self.consecutive_losses >= self.loss_count_to_trip {
            self.cooldown_until = self.cooldown_until.max(lock_ts + self.cooldown_secs);
            self.consecutive_losses = 0;
        }
    }

    pub fn consecutive_losses(&self) -> u32 {
        self.consecutive_losses
    }
}
