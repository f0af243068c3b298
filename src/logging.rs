//! Tracing setup.
//!
//! Log output always goes to stderr: stdout carries the protocol and must
//! not be interleaved with diagnostics. `RUST_LOG`, when set, takes
//! precedence over the configured level.
//!
//! # Example
//! ```no_run
//! use spp_nidaq::logging::{self, LogFormat, LoggingConfig};
//!
//! # fn main() -> Result<(), String> {
//! let config = LoggingConfig {
//!     level: "debug".to_string(),
//!     format: LogFormat::Json,
//!     ansi: false,
//! };
//! logging::init(&config)?;
//! tracing::debug!(backend = "simulated", "Logging ready");
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tracing::{Level, Subscriber};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Accepted level names.
pub const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Output format for log events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human oriented
    Pretty,
    /// One line per event
    #[default]
    Compact,
    /// One JSON object per event, for log aggregation
    Json,
}

/// `[logging]` configuration section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_level")]
    pub level: String,
    /// Output format
    #[serde(default)]
    pub format: LogFormat,
    /// Whether to colour output (pretty and compact formats)
    #[serde(default)]
    pub ansi: bool,
}

fn default_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            ansi: false,
        }
    }
}

/// Parse a level name (case-insensitive).
pub fn parse_level(level: &str) -> Result<Level, String> {
    level.parse::<Level>().map_err(|_| {
        format!(
            "Invalid log level '{}'. Must be one of: {}",
            level,
            LEVELS.join(", ")
        )
    })
}

/// Build the subscriber described by `config` without installing it.
pub fn build_subscriber(
    config: &LoggingConfig,
) -> Result<impl Subscriber + Send + Sync + 'static, String> {
    let level = parse_level(&config.level)?;
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    let layer = match config.format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_ansi(config.ansi)
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_ansi(config.ansi)
            .with_target(false)
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed(),
    };

    Ok(tracing_subscriber::registry().with(layer))
}

/// Install the global subscriber.
///
/// Idempotent: when a subscriber is already installed (tests, repeated
/// calls) this returns `Ok(())`.
pub fn init(config: &LoggingConfig) -> Result<(), String> {
    build_subscriber(config)?.try_init().or_else(|e| {
        if e.to_string().contains("already been set") {
            Ok(())
        } else {
            Err(format!("Failed to initialize tracing: {}", e))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_level("WARN").unwrap(), Level::WARN);
        let err = parse_level("verbose").unwrap_err();
        assert!(err.contains("Invalid log level 'verbose'"));
    }

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "warn");
        assert_eq!(config.format, LogFormat::Compact);
        assert!(!config.ansi);
    }

    #[test]
    #[serial]
    fn test_subscriber_applies_level() {
        std::env::remove_var("RUST_LOG");
        for format in [LogFormat::Pretty, LogFormat::Compact, LogFormat::Json] {
            let config = LoggingConfig {
                level: "info".to_string(),
                format,
                ansi: false,
            };
            let subscriber = build_subscriber(&config).unwrap();
            assert_eq!(subscriber.max_level_hint(), Some(LevelFilter::INFO));
            tracing::subscriber::with_default(subscriber, || {
                tracing::info!(?format, "Scoped subscriber");
            });
        }
    }

    #[test]
    fn test_bad_level_is_rejected() {
        let config = LoggingConfig {
            level: "loud".to_string(),
            ..LoggingConfig::default()
        };
        assert!(build_subscriber(&config).is_err());
        assert!(init(&config).is_err());
    }
}
