//! Configuration management for the load harness.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;

/// Harness configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Host the server under test listens on
    pub host: String,
    /// Port the server under test listens on
    pub port: u16,
    /// Total number of seats to exercise (split into three equal groups)
    pub seats: usize,
    /// Number of concurrent clients, split between allocators and buyers
    pub concurrency: usize,
    /// Seed for the fuzzer's random message selection
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8099,
            seats: 300,
            concurrency: 10,
            seed: 42,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// - `SEATBOOK_HOST` (default `127.0.0.1`)
    /// - `SEATBOOK_PORT` (default `8099`)
    /// - `SEATBOOK_SEATS` (default `300`)
    /// - `SEATBOOK_CONCURRENCY` (default `10`)
    /// - `SEATBOOK_SEED` (default `42`)
    ///
    /// Unparseable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("SEATBOOK_HOST").unwrap_or(defaults.host),
            port: parsed("SEATBOOK_PORT").unwrap_or(defaults.port),
            seats: parsed("SEATBOOK_SEATS").unwrap_or(defaults.seats),
            concurrency: parsed("SEATBOOK_CONCURRENCY").unwrap_or(defaults.concurrency),
            seed: parsed("SEATBOOK_SEED").unwrap_or(defaults.seed),
        }
    }

    /// `host:port` of the server under test.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Repeaters to create per verb: a third of the concurrency, at least one.
    #[must_use]
    pub fn repeaters_per_verb(&self) -> usize {
        (self.concurrency / 3).max(1)
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}
