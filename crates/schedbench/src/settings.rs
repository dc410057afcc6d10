//! Harness settings
//!
//! Loop tuning loaded from `SCHEDBENCH_`-prefixed environment variables,
//! falling back to the benchmark's contractual defaults.

use std::time::Duration;

use anyhow::Result;
use schedbench_lib::BenchConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct BenchSettings {
    /// Placer tick in milliseconds
    #[serde(default = "default_placer_interval_ms")]
    pub placer_interval_ms: u64,

    /// Reaper tick in milliseconds
    #[serde(default = "default_reaper_interval_ms")]
    pub reaper_interval_ms: u64,

    /// PRNG seed used when --seed is not given
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_placer_interval_ms() -> u64 {
    100
}

fn default_reaper_interval_ms() -> u64 {
    1000
}

fn default_seed() -> u64 {
    42
}

impl Default for BenchSettings {
    fn default() -> Self {
        Self {
            placer_interval_ms: default_placer_interval_ms(),
            reaper_interval_ms: default_reaper_interval_ms(),
            seed: default_seed(),
        }
    }
}

impl BenchSettings {
    /// Load settings from the environment.
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("SCHEDBENCH"))
            .build()?;

        Ok(settings.try_deserialize().unwrap_or_default())
    }

    /// Turn the settings into a benchmark configuration.
    pub fn bench_config(&self, seed: u64) -> BenchConfig {
        BenchConfig {
            placer_interval: Duration::from_millis(self.placer_interval_ms),
            reaper_interval: Duration::from_millis(self.reaper_interval_ms),
            reaper_seed: seed,
        }
    }
}
