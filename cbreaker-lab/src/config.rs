use anyhow::Result;
use cbreaker_core::BreakerConfig;
use config::{Config as ConfigLoader, Environment, File};
use serde::Deserialize;
use std::time::Duration;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub breaker_name: String,
    #[validate(nested)]
    pub breaker: BreakerConfig,
    #[validate(range(min = 1))]
    pub workers: usize,
    pub calls_per_worker: usize,
    pub call_interval_ms: u64,
    #[validate(nested)]
    pub dependency: DependencyConfig,
}

/// Behaviour of the simulated dependency
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct DependencyConfig {
    pub latency_ms: u64,
    /// Probability that a call outside the outage window fails
    #[validate(range(min = 0.0, max = 1.0))]
    pub failure_rate: f64,
    /// Offset from the start of the run at which every call starts failing
    pub outage_start_ms: u64,
    pub outage_duration_ms: u64,
}

impl Config {
    pub fn load() -> Result<Self> {
        let loader = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("CBREAKER").separator("__"))
            .build()?;

        Self::from_loader(loader)
    }

    fn from_loader(loader: ConfigLoader) -> Result<Self> {
        let config: Self = loader.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn call_interval(&self) -> Duration {
        Duration::from_millis(self.call_interval_ms)
    }
}

impl DependencyConfig {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    pub fn outage_window(&self) -> (Duration, Duration) {
        let start = Duration::from_millis(self.outage_start_ms);
        (start, start + Duration::from_millis(self.outage_duration_ms))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "cbreaker_lab=info,cbreaker_core=info".to_string(),
            breaker_name: "simulated-dependency".to_string(),
            breaker: BreakerConfig::default(),
            workers: 4,
            calls_per_worker: 100,
            call_interval_ms: 10,
            dependency: DependencyConfig::default(),
        }
    }
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            latency_ms: 2,
            failure_rate: 0.05,
            outage_start_ms: 300,
            outage_duration_ms: 300,
        }
    }
}
