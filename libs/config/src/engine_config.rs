//! Engine Configuration Module
//!
//! Loads engine configuration from built-in defaults, an optional TOML file
//! and `CPAMM_`-prefixed environment variables, in that order of precedence.

use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File, Map};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Environment variable prefix for overrides (`CPAMM_ENGINE__DEFAULT_FEE_BPS=25`)
pub const ENV_PREFIX: &str = "CPAMM";

/// Basis-point denominator; a fee must stay strictly below it.
const FEE_SCALING: u64 = 10_000;

/// Main engine configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct EngineConfig {
    /// Pool engine settings
    #[serde(default)]
    pub engine: EngineSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Pool engine settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EngineSettings {
    /// Fee in basis points applied by `create_pool_with_default_fee` (30 = 0.3%)
    pub default_fee_bps: u64,
}

/// Logging settings consumed by [`crate::init_tracing`]
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `cpamm=debug,warn`
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_fee_bps: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration with an optional TOML file and environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Load with `env` standing in for the process environment when given
    fn load_with_env(path: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self> {
        let defaults = EngineConfig::default();

        let mut builder = Config::builder()
            .set_default("engine.default_fee_bps", defaults.engine.default_fee_bps)
            .context("Failed to set default fee")?
            .set_default("logging.level", defaults.logging.level)
            .context("Failed to set default log level")?
            .set_default("logging.json", defaults.logging.json)
            .context("Failed to set default log format")?;

        if let Some(path) = path {
            info!("Loading engine config: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config: EngineConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        debug!(?config, "Engine configuration loaded");
        Ok(config)
    }

    /// Reject settings the engine would refuse at pool creation
    pub fn validate(&self) -> Result<()> {
        if self.engine.default_fee_bps >= FEE_SCALING {
            bail!(
                "default_fee_bps must be below {}, got {}",
                FEE_SCALING,
                self.engine.default_fee_bps
            );
        }
        if self.logging.level.trim().is_empty() {
            bail!("logging.level must not be empty");
        }
        Ok(())
    }
}

/// Convenience function to load configuration with defaults
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    EngineConfig::load(path)
}
