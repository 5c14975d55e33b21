//! Configuration for the smoke harness
//!
//! Settings come from environment variables with defaults that match the
//! Maven module layout the harness runs in: the example application and the
//! agent are built by sibling modules and picked up from their `target/`
//! directories.
//!
//! # Environment Variables
//!
//! - `JMX_SMOKE_PROJECT_VERSION`: agent version - default: `project.version` from the properties file
//! - `JMX_SMOKE_PROPERTIES`: properties file holding `project.version` - default: "resources/test.properties"
//! - `JMX_SMOKE_DOCKERFILE`: Dockerfile template - default: "resources/Dockerfile"
//! - `JMX_SMOKE_APPLICATION_JAR`: example application jar - default: "../jmx_example_application/target/jmx_example_application.jar"
//! - `JMX_SMOKE_AGENT_DIR`: directory holding the agent jar - default: "../../jmx_prometheus_javaagent/target"
//! - `JMX_SMOKE_AGENT_CONFIG`: agent `config.yml` - default: "resources/config.yml"
//! - `JMX_SMOKE_EXPOSED_PORT`: agent HTTP port inside the container - default: "9000"
//! - `JMX_SMOKE_READINESS_PATTERN`: log line regex signalling readiness - default: ".*registered.*"
//! - `JMX_SMOKE_SCRAPE_TIMEOUT`: seconds to keep retrying a scrape - default: "10"
//! - `JMX_SMOKE_REQUEST_TIMEOUT`: seconds for a single scrape request - default: "5"
//! - `JMX_SMOKE_STARTUP_TIMEOUT`: seconds to wait for readiness - default: "120"
//! - `JMX_SMOKE_KEEP_IMAGES`: keep built images after a case (true|false) - default: "false"

use regex::Regex;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PROPERTIES: &str = "resources/test.properties";
const DEFAULT_DOCKERFILE: &str = "resources/Dockerfile";
const DEFAULT_APPLICATION_JAR: &str =
    "../jmx_example_application/target/jmx_example_application.jar";
const DEFAULT_AGENT_DIR: &str = "../../jmx_prometheus_javaagent/target";
const DEFAULT_AGENT_CONFIG: &str = "resources/config.yml";
const DEFAULT_EXPOSED_PORT: u16 = 9000;
const DEFAULT_READINESS_PATTERN: &str = ".*registered.*";
const DEFAULT_SCRAPE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;
const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 120;

const PROJECT_VERSION_KEY: &str = "project.version";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Property '{key}' not found in {}", .path.display())]
    MissingProperty { key: String, path: PathBuf },

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Settings shared by every smoke case
#[derive(Debug, Clone)]
pub struct SmokeConfig {
    /// Agent version, used to name the agent jar
    pub project_version: String,

    /// Dockerfile with a `${base.image}` placeholder
    pub dockerfile_template: PathBuf,

    pub application_jar: PathBuf,

    /// Directory containing `jmx_prometheus_javaagent-<version>.jar`
    pub agent_dir: PathBuf,

    pub agent_config: PathBuf,

    pub exposed_port: u16,

    pub readiness_pattern: String,

    pub scrape_timeout: Duration,

    pub request_timeout: Duration,

    pub startup_timeout: Duration,

    pub keep_images: bool,
}

impl SmokeConfig {
    /// Loads configuration from `JMX_SMOKE_*` variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let project_version = match env::var("JMX_SMOKE_PROJECT_VERSION") {
            Ok(version) => version,
            Err(_) => {
                let path = path_var("JMX_SMOKE_PROPERTIES", DEFAULT_PROPERTIES);
                load_project_version(&path)?
            }
        };

        Ok(Self {
            project_version,
            dockerfile_template: path_var("JMX_SMOKE_DOCKERFILE", DEFAULT_DOCKERFILE),
            application_jar: path_var("JMX_SMOKE_APPLICATION_JAR", DEFAULT_APPLICATION_JAR),
            agent_dir: path_var("JMX_SMOKE_AGENT_DIR", DEFAULT_AGENT_DIR),
            agent_config: path_var("JMX_SMOKE_AGENT_CONFIG", DEFAULT_AGENT_CONFIG),
            exposed_port: parse_var("JMX_SMOKE_EXPOSED_PORT", DEFAULT_EXPOSED_PORT)?,
            readiness_pattern: env::var("JMX_SMOKE_READINESS_PATTERN")
                .unwrap_or_else(|_| DEFAULT_READINESS_PATTERN.to_string()),
            scrape_timeout: Duration::from_secs(parse_var(
                "JMX_SMOKE_SCRAPE_TIMEOUT",
                DEFAULT_SCRAPE_TIMEOUT_SECS,
            )?),
            request_timeout: Duration::from_secs(parse_var(
                "JMX_SMOKE_REQUEST_TIMEOUT",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            startup_timeout: Duration::from_secs(parse_var(
                "JMX_SMOKE_STARTUP_TIMEOUT",
                DEFAULT_STARTUP_TIMEOUT_SECS,
            )?),
            keep_images: parse_var("JMX_SMOKE_KEEP_IMAGES", false)?,
        })
    }

    /// Configuration with every default and an explicit version, without
    /// touching the environment or the filesystem
    pub fn with_version(project_version: impl Into<String>) -> Self {
        Self {
            project_version: project_version.into(),
            dockerfile_template: PathBuf::from(DEFAULT_DOCKERFILE),
            application_jar: PathBuf::from(DEFAULT_APPLICATION_JAR),
            agent_dir: PathBuf::from(DEFAULT_AGENT_DIR),
            agent_config: PathBuf::from(DEFAULT_AGENT_CONFIG),
            exposed_port: DEFAULT_EXPOSED_PORT,
            readiness_pattern: DEFAULT_READINESS_PATTERN.to_string(),
            scrape_timeout: Duration::from_secs(DEFAULT_SCRAPE_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            startup_timeout: Duration::from_secs(DEFAULT_STARTUP_TIMEOUT_SECS),
            keep_images: false,
        }
    }

    /// Path of the agent jar for the configured version
    pub fn agent_jar(&self) -> PathBuf {
        self.agent_dir
            .join(crate::container::template::agent_jar_name(&self.project_version))
    }

    /// Checks that values make sense and that every artifact exists
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project_version.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "project version cannot be empty".to_string(),
            ));
        }

        if self.exposed_port == 0 {
            return Err(ConfigError::ValidationFailed(
                "exposed port cannot be 0".to_string(),
            ));
        }

        if self.scrape_timeout.is_zero()
            || self.request_timeout.is_zero()
            || self.startup_timeout.is_zero()
        {
            return Err(ConfigError::ValidationFailed(
                "timeouts must be greater than 0".to_string(),
            ));
        }

        Regex::new(&self.readiness_pattern).map_err(|e| ConfigError::ParseError {
            field: "readiness_pattern".to_string(),
            error: e.to_string(),
        })?;

        let agent_jar = self.agent_jar();
        for path in [
            &self.dockerfile_template,
            &self.application_jar,
            &agent_jar,
            &self.agent_config,
        ] {
            if !path.is_file() {
                return Err(ConfigError::ValidationFailed(format!(
                    "file not found: {}",
                    path.display()
                )));
            }
        }

        Ok(())
    }
}

fn path_var(name: &str, default: &str) -> PathBuf {
    env::var_os(name)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::ParseError {
            field: name.to_string(),
            error: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Parses a Java-style `.properties` file
///
/// Supports `key=value` and `key: value`, skipping blank lines and lines
/// starting with `#` or `!`. Escapes and line continuations are not handled.
pub fn parse_properties(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let split = line.find(['=', ':'])?;
            let (key, value) = line.split_at(split);
            Some((key.trim().to_string(), value[1..].trim().to_string()))
        })
        .collect()
}

pub fn load_properties(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_properties(&content))
}

/// Reads `project.version` from a properties file
pub fn load_project_version(path: &Path) -> Result<String, ConfigError> {
    load_properties(path)?
        .remove(PROJECT_VERSION_KEY)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingProperty {
            key: PROJECT_VERSION_KEY.to_string(),
            path: path.to_path_buf(),
        })
}
