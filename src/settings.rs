use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::Config;
use serde::Deserialize;

/// Runtime settings. Every field has a default and can be overridden through
/// the environment with the MAPPER_ prefix (e.g. MAPPER_OUTPUT_PATH,
/// MAPPER_REQUEST_DELAY_MS).
#[derive(Debug, Deserialize)]
pub struct Settings {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub cache_path: PathBuf,
    pub nominatim_url: String,
    pub user_agent: String,
    pub checkpoint_every: usize,
    pub request_delay_ms: u64,
    pub retry_delay_ms: u64,
    pub timeout_secs: u64,
    pub retry_timeout_secs: u64,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Config::builder()
            .set_default("input_path", "data/raw_schools.json")?
            .set_default("output_path", "data/schools.csv")?
            .set_default("cache_path", "data/geocode_cache.sqlite")?
            .set_default("nominatim_url", "https://nominatim.openstreetmap.org/search")?
            .set_default("user_agent", "Exchange School Mapper 1.0")?
            .set_default("checkpoint_every", 50)?
            .set_default("request_delay_ms", 1000)?
            .set_default("retry_delay_ms", 2000)?
            .set_default("timeout_secs", 10)?
            .set_default("retry_timeout_secs", 15)?
            .add_source(config::Environment::with_prefix("MAPPER"))
            .build()
            .context("building configuration")?
            .try_deserialize()
            .context("invalid configuration value")
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_timeout(&self) -> Duration {
        Duration::from_secs(self.retry_timeout_secs)
    }
}

// ── Tests ──
