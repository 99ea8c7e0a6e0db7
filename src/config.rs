use serde::Deserialize;
use std::time::Duration;

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub probes: ProbeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Total time budget for a run, checked before each round.
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
    /// Pause between a retry verdict and the next round.
    #[serde(default = "default_retry_pause_ms")]
    pub retry_pause_ms: u64,
    /// Abort in-flight probes once the deadline passes instead of letting
    /// the round finish.
    #[serde(default)]
    pub hard_deadline: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProbeConfig {
    /// Seed for the simulated probes. Probe B uses `seed + 1`.
    pub seed: Option<u64>,
    #[serde(default)]
    pub max_latency_ms: u64,
    /// Per-call timeout; an expired call counts as a failure.
    pub timeout_ms: Option<u64>,
}

fn default_deadline_ms() -> u64 {
    15_000
}

fn default_retry_pause_ms() -> u64 {
    1_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deadline_ms: default_deadline_ms(),
            retry_pause_ms: default_retry_pause_ms(),
            hard_deadline: false,
        }
    }
}

impl EngineConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn retry_pause(&self) -> Duration {
        Duration::from_millis(self.retry_pause_ms)
    }
}

impl ProbeConfig {
    pub fn max_latency(&self) -> Duration {
        Duration::from_millis(self.max_latency_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("TWINPROBE")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        Self::load_with(config_path, environment())
    }

    fn load_with(config_path: Option<&str>, env: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Load from file if specified
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("twinprobe").required(false));
        }

        // Environment variable overrides, e.g. TWINPROBE_ENGINE__DEADLINE_MS
        builder = builder.add_source(env);

        let config: AppConfig = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.engine.retry_pause_ms == 0 {
            return Err(AppError::Config(
                "engine.retry_pause_ms must be greater than zero".to_string(),
            ));
        }
        if self.probes.timeout_ms == Some(0) {
            return Err(AppError::Config(
                "probes.timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
