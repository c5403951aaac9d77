//! PredSim Library
//!
//! Deterministic replay of betting strategies against recorded UP/DOWN
//! 5-minute crypto prediction rounds

pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod risk;
pub mod signal;
pub mod sizing;
pub mod stats;
pub mod sweep;
pub mod types;
