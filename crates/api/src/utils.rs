use clap::Parser;
use fern::{
    colors::{Color, ColoredLevelConfig},
    Dispatch,
};
use log::LevelFilter;
use std::env;
use time::{format_description::well_known::Iso8601, OffsetDateTime};
use weather_aggregator_core::{find_config_file, load_config, ConfigSource, DEFAULT_API_PORT};

use crate::WeatherConditionStyle;

#[derive(Parser, Clone, Debug, serde::Deserialize, Default)]
#[command(
    author,
    version,
    about = "Weather forecast aggregation API with CSV export"
)]
pub struct Cli {
    /// Path to config file (TOML format)
    /// Searched in order: this flag, $WEATHER_API_CONFIG, ./weather-api.toml,
    /// $XDG_CONFIG_HOME/weather-aggregator/weather-api.toml,
    /// /etc/weather-aggregator/weather-api.toml
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, env = "WEATHER_API_LEVEL")]
    pub level: Option<String>,

    /// Host to listen on (use 0.0.0.0 for all interfaces)
    #[arg(short, long, env = "WEATHER_API_HOST")]
    #[serde(alias = "host")]
    pub domain: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "WEATHER_API_PORT")]
    pub port: Option<String>,

    /// Directory holding the forecasts.sqlite database
    #[arg(long, env = "WEATHER_API_DB_DIR")]
    pub db_dir: Option<String>,

    /// Maximum number of pooled database connections
    #[arg(long, env = "WEATHER_API_DB_MAX_CONNECTIONS")]
    pub db_max_connections: Option<u32>,

    /// Write weather_condition with the legacy `"" value ""` padding (default true)
    #[arg(long, env = "WEATHER_API_LEGACY_WEATHER_CONDITION")]
    pub legacy_weather_condition: Option<bool>,
}

impl Cli {
    pub fn host(&self) -> String {
        self.domain
            .clone()
            .unwrap_or_else(|| "127.0.0.1".to_string())
    }

    pub fn port(&self) -> String {
        self.port
            .clone()
            .unwrap_or_else(|| DEFAULT_API_PORT.to_string())
    }

    pub fn db_dir(&self) -> String {
        self.db_dir.clone().unwrap_or_else(|| "./data".to_string())
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections.unwrap_or(5).max(1)
    }

    pub fn weather_condition_style(&self) -> WeatherConditionStyle {
        match self.legacy_weather_condition {
            Some(false) => WeatherConditionStyle::Standard,
            _ => WeatherConditionStyle::Legacy,
        }
    }

    /// Fill every unset value from `file`
    pub fn merge(self, file: Cli) -> Cli {
        Cli {
            config: self.config,
            level: self.level.or(file.level),
            domain: self.domain.or(file.domain),
            port: self.port.or(file.port),
            db_dir: self.db_dir.or(file.db_dir),
            db_max_connections: self.db_max_connections.or(file.db_max_connections),
            legacy_weather_condition: self
                .legacy_weather_condition
                .or(file.legacy_weather_condition),
        }
    }
}

/// Load configuration from CLI args, config file, and environment
pub fn get_config_info() -> anyhow::Result<Cli> {
    let cli_args = Cli::parse();

    let source = match cli_args.config {
        Some(ref path) => ConfigSource::Explicit(path.into()),
        None => find_config_file("WEATHER_API_CONFIG", "weather-api.toml"),
    };

    // the logger is not set up yet
    if let Some(path) = source.path() {
        println!("Loading config from: {}", path.display());
    }

    let file_config: Cli = load_config(&source)?;

    Ok(cli_args.merge(file_config))
}

pub fn get_log_level(cli: &Cli) -> LevelFilter {
    let level_str = cli
        .level
        .clone()
        .or_else(|| env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string());

    match level_str.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

pub fn setup_logger() -> Dispatch {
    let colors = ColoredLevelConfig::new()
        .trace(Color::White)
        .debug(Color::Cyan)
        .info(Color::Blue)
        .warn(Color::Yellow)
        .error(Color::Magenta);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            let timestamp = OffsetDateTime::now_utc()
                .format(&Iso8601::DEFAULT)
                .unwrap_or_default();
            out.finish(format_args!(
                "[{} {}] {}: {}",
                timestamp,
                colors.color(record.level()),
                record.target(),
                message
            ));
        })
        .chain(std::io::stdout())
}
