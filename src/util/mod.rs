//! Utility modules for jmx-smoke

pub mod logging;

pub use logging::{init_from_env, init_logging, LoggingConfig};
