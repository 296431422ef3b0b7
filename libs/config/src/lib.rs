//! # CPAMM Configuration
//!
//! Centralized configuration for the constant-product AMM engine.
//!
//! ## Features
//!
//! - **Engine Settings**: default fee tier for pools created without an explicit fee
//! - **Logging**: tracing filter level and output format
//! - **Layering**: built-in defaults, an optional TOML file, then `CPAMM_` environment variables
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cpamm_config::{init_tracing, load_config};
//!
//! let config = load_config(None).expect("configuration");
//! init_tracing(&config.logging).expect("subscriber");
//! assert!(config.engine.default_fee_bps < 10_000);
//! ```

pub mod engine_config;
pub mod logging;

pub use engine_config::{load_config, EngineConfig, EngineSettings, LoggingConfig, ENV_PREFIX};
pub use logging::init_tracing;
