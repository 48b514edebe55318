//! Weather Aggregator Core Library
//!
//! Shared pieces for the aggregator services:
//! - Layered configuration file discovery (XDG-compliant)
//! - Common constants

mod config;

pub use config::{find_config_file, load_config, ConfigError, ConfigSource};

/// Application name used for XDG and system config paths
pub const APP_NAME: &str = "weather-aggregator";

/// Default API port
pub const DEFAULT_API_PORT: u16 = 3000;

/// File name of the SQLite database inside the data directory
pub const DATABASE_FILE: &str = "forecasts.sqlite";
