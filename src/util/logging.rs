//! tracing-subscriber setup
//!
//! Logs go to stderr so that `discover` and `pipeline` output on stdout stays
//! machine-readable. Initialization happens at most once per process.
//!
//! ```no_run
//! use appcompose::util::logging;
//!
//! // APPCOMPOSE_LOG_LEVEL=debug APPCOMPOSE_LOG_JSON=true
//! logging::init_from_env();
//! tracing::info!(phase = "install", "Starting phase");
//! ```

use std::env;
use std::io;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Minimum level for appcompose's own events
    pub level: Level,

    /// One JSON object per event instead of human-readable lines
    pub use_json: bool,

    /// Include the module target (e.g. appcompose::driver::docker)
    pub include_target: bool,

    /// Include file and line number
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: false,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// `APPCOMPOSE_LOG_LEVEL` and `APPCOMPOSE_LOG_JSON`, defaults otherwise
    pub fn from_env() -> Self {
        let level = env::var("APPCOMPOSE_LOG_LEVEL")
            .map(|v| parse_level(&v))
            .unwrap_or(Level::INFO);

        let use_json = env::var("APPCOMPOSE_LOG_JSON")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        Self {
            level,
            use_json,
            include_target: level >= Level::DEBUG,
            ..Default::default()
        }
    }
}

/// Case-insensitive level name; unknown names fall back to INFO with a warning on stderr
pub fn parse_level(level_str: &str) -> Level {
    match level_str.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

/// `RUST_LOG` directives when set, otherwise `appcompose=<level>` with everything else at warn
fn build_filter(level: Level) -> EnvFilter {
    if env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }
    EnvFilter::new(format!("warn,appcompose={}", level))
}

pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(config.level);
        let layer = fmt::layer()
            .with_writer(io::stderr)
            .with_target(config.include_target)
            .with_file(config.include_location)
            .with_line_number(config.include_location);

        // A subscriber installed elsewhere (e.g. by a test harness) wins
        let _ = if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(layer.json())
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()
        };
    });
}

pub fn init_default() {
    init_logging(LoggingConfig::default());
}

pub fn init_from_env() {
    init_logging(LoggingConfig::from_env());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("Debug"), Level::DEBUG);
        assert_eq!(parse_level(" WARN "), Level::WARN);
        assert_eq!(parse_level("error"), Level::ERROR);
        assert_eq!(parse_level("chatty"), Level::INFO);
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        env::set_var("APPCOMPOSE_LOG_LEVEL", "debug");
        env::set_var("APPCOMPOSE_LOG_JSON", "true");

        let config = LoggingConfig::from_env();

        env::remove_var("APPCOMPOSE_LOG_LEVEL");
        env::remove_var("APPCOMPOSE_LOG_JSON");

        assert_eq!(config.level, Level::DEBUG);
        assert!(config.use_json);
        assert!(config.include_target);
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        env::remove_var("APPCOMPOSE_LOG_LEVEL");
        env::remove_var("APPCOMPOSE_LOG_JSON");

        assert_eq!(LoggingConfig::from_env(), LoggingConfig::default());
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(LoggingConfig::with_level(Level::ERROR));
        init_default();
    }
}
