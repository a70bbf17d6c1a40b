//! Sweeper Configuration
//!
//! Layered from an optional file, `config/default`, `config/local` and
//! `LENDLOOP__*` environment variables. CLI flags are applied on top in
//! `main`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use lendloop_engine::EngineConfig;

/// Sweeper configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Marketplace rules handed to the engine
    #[serde(default)]
    pub engine: EngineConfig,

    /// Penalty sweep schedule
    #[serde(default)]
    pub sweep: SweepSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// When penalties are swept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSettings {
    /// Seconds between sweeps
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Sweep immediately instead of waiting one interval
    #[serde(default = "default_true")]
    pub run_on_start: bool,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            run_on_start: true,
        }
    }
}

impl SweepSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl SweeperConfig {
    /// Load configuration from the optional file, default locations and environment
    ///
    /// Not validated here; call [`SweeperConfig::validate`] after overrides.
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        // e.g. LENDLOOP__ENGINE__STARTING_GRANT=50
        builder = builder.add_source(
            config::Environment::with_prefix("LENDLOOP")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        // validated by the caller once CLI overrides are applied
        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sweep.interval_secs == 0 {
            anyhow::bail!("sweep.interval_secs must be positive");
        }
        self.engine.validate()?;
        Ok(())
    }
}

// =============================================================================
// Default Functions
// =============================================================================

fn default_interval() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_true() -> bool {
    true
}
