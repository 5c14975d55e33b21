//! jmx-smoke - smoke tests for the JMX Prometheus agent
//!
//! This library builds a Docker image per Java runtime, runs the example
//! application with the agent attached, scrapes its `/metrics` endpoint and
//! checks that the expected metric lines are exposed.
//!
//! # Core Concepts
//!
//! - **Scrape**: a single HTTP GET against the metrics endpoint. The
//!   [`scrape::Scraper`] retries transport failures until a timeout elapses,
//!   and stops at the first response it gets.
//! - **Metric lines**: the response body split on newlines, checked by literal
//!   prefix in [`assertions`].
//! - **Base image**: the Java runtime the test image is built `FROM`. The
//!   [`matrix`] module runs one smoke case per base image.
//!
//! # Example Usage
//!
//! ```no_run
//! use jmx_smoke::{SmokeCase, SmokeCheck, SmokeConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SmokeConfig::from_env()?;
//! let report = SmokeCase::new(&config, "openjdk:11-jre")
//!     .run(&[SmokeCheck::jvm_metric(), SmokeCheck::tabular_metric()])?;
//! assert!(report.passed());
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`scrape`]: endpoint descriptor and the scrape-with-retry routine
//! - [`assertions`]: metric line lookups and expectations
//! - [`container`]: Dockerfile rendering, build context and container lifecycle
//! - [`matrix`]: base image list and per-image smoke cases
//! - [`config`]: harness configuration from the environment

pub mod assertions;
pub mod cli;
pub mod config;
pub mod container;
pub mod error;
pub mod matrix;
pub mod scrape;
pub mod util;

pub use assertions::{AssertionError, Expectation, MetricLines};
pub use config::{ConfigError, SmokeConfig};
pub use container::{ContainerError, ContainerSpec, JavaContainer};
pub use error::SmokeError;
pub use matrix::{CaseReport, SmokeCase, SmokeCheck, BASE_IMAGES};
pub use scrape::{Endpoint, ScrapeError, Scraper};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
