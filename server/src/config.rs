//! Static server configuration, read once at startup from flags and environment.

use clap::{Parser, ValueEnum};
use shared::{
    FIELD_HEIGHT, FIELD_WIDTH, MAX_TARGETS, MIN_CLICKABLE_SIDE, MIN_TARGET_HEIGHT,
    MIN_TARGET_WIDTH, TARGET_SIZE_VARIANCE,
};
use std::time::Duration;

/// How the spawn timer reacts to successive hits
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SpawnPolicy {
    /// One replacement attempt per tick once the first target was hit
    Steady,
    /// Every hit permanently adds one more attempt per tick
    Compounding,
}

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about)]
pub struct Config {
    /// Address to bind to
    #[clap(short = 'H', long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,
    /// Port to listen on
    #[clap(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,
    /// Idle time before a session is probed, in milliseconds
    #[clap(long, env = "PING_TIMEOUT_MS", default_value_t = 10_000)]
    pub ping_timeout_ms: u64,
    /// Period of the liveness sweep, in milliseconds
    #[clap(long, default_value_t = 10_000)]
    pub liveness_interval_ms: u64,
    /// Period of the replacement spawn timer, in milliseconds
    #[clap(long, default_value_t = 1_000)]
    pub spawn_interval_ms: u64,
    /// Maximum number of live targets
    #[clap(long, env = "MAX_TARGETS", default_value_t = MAX_TARGETS)]
    pub max_targets: usize,
    /// Smallest target width; a side of 2 is the least a strict bounds test can hit
    #[clap(
        long,
        default_value_t = MIN_TARGET_WIDTH,
        value_parser = clap::value_parser!(u16).range(MIN_CLICKABLE_SIDE as i64..)
    )]
    pub min_width: u16,
    #[clap(
        long,
        default_value_t = MIN_TARGET_HEIGHT,
        value_parser = clap::value_parser!(u16).range(MIN_CLICKABLE_SIDE as i64..)
    )]
    pub min_height: u16,
    /// Largest random amount added on top of the minimum size
    #[clap(long, default_value_t = TARGET_SIZE_VARIANCE)]
    pub size_variance: u16,
    #[clap(long, default_value_t = FIELD_WIDTH)]
    pub field_width: u16,
    #[clap(long, default_value_t = FIELD_HEIGHT)]
    pub field_height: u16,
    #[clap(long, value_enum, default_value_t = SpawnPolicy::Steady)]
    pub spawn_policy: SpawnPolicy,
}

impl Config {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    pub fn liveness_interval(&self) -> Duration {
        Duration::from_millis(self.liveness_interval_ms)
    }

    pub fn spawn_interval(&self) -> Duration {
        Duration::from_millis(self.spawn_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            ping_timeout_ms: 10_000,
            liveness_interval_ms: 10_000,
            spawn_interval_ms: 1_000,
            max_targets: MAX_TARGETS,
            min_width: MIN_TARGET_WIDTH,
            min_height: MIN_TARGET_HEIGHT,
            size_variance: TARGET_SIZE_VARIANCE,
            field_width: FIELD_WIDTH,
            field_height: FIELD_HEIGHT,
            spawn_policy: SpawnPolicy::Steady,
        }
    }
}
