//! Structured logging setup
//!
//! Wires a `tracing` subscriber with an `EnvFilter` and either pretty or JSON
//! output on stderr. Stdout stays free for command output such as the JSON
//! case reports.
//!
//! # Example
//!
//! ```no_run
//! use jmx_smoke::util::logging;
//!
//! // Reads JMX_SMOKE_LOG_LEVEL, JMX_SMOKE_LOG_JSON and RUST_LOG
//! logging::init_from_env();
//!
//! tracing::info!(base_image = "openjdk:8-jre", "Running smoke case");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for this crate's own events
    pub level: Level,

    /// Emit one JSON object per event
    pub use_json: bool,

    /// Include the module target (e.g. jmx_smoke::scrape)
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
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

    /// Directives applied on top of `RUST_LOG`
    ///
    /// HTTP and Docker client crates are held at `warn` unless `RUST_LOG` is
    /// set, since the scraper's retry loop makes them very chatty.
    pub fn directives(&self, rust_log_set: bool) -> Vec<String> {
        let mut directives = vec![format!("jmx_smoke={}", self.level.as_str().to_lowercase())];
        if !rust_log_set {
            directives.extend(
                ["h2=warn", "hyper=warn", "hyper_util=warn", "reqwest=warn", "bollard=warn"]
                    .iter()
                    .map(|d| d.to_string()),
            );
        }
        directives
    }
}

/// Parses a log level name, falling back to INFO
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
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

/// Installs the global subscriber; later calls are ignored
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let rust_log_set = env::var("RUST_LOG").is_ok();
        let mut filter = EnvFilter::from_default_env();
        for directive in config.directives(rust_log_set) {
            match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(e) => eprintln!("Ignoring log directive '{}': {}", directive, e),
            }
        }

        let registry = tracing_subscriber::registry().with(filter);
        if config.use_json {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(config.include_target)
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            registry
                .with(
                    fmt::layer()
                        .with_target(config.include_target)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    });
}

/// Initializes logging from `JMX_SMOKE_LOG_LEVEL` and `JMX_SMOKE_LOG_JSON`
pub fn init_from_env() {
    let level_str = env::var("JMX_SMOKE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let use_json = env::var("JMX_SMOKE_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    init_logging(LoggingConfig {
        level: parse_level(&level_str),
        use_json,
        ..Default::default()
    });
}
