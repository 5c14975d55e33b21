//! Docker image and container lifecycle for smoke cases
//!
//! A smoke case builds its own image `FROM` a base Java image, runs it with
//! the agent's HTTP port published, and removes everything again when the
//! case ends.

pub mod context;
pub mod driver;
pub mod template;

pub use context::BuildContext;
pub use driver::{ContainerSpec, JavaContainer};

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Artifact not found: {}", .path.display())]
    MissingArtifact { path: PathBuf },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Invalid readiness pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Docker error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("Image build failed for {image}: {message}")]
    BuildFailed { image: String, message: String },

    #[error("Container {container} did not log '{pattern}' within {timeout:?}")]
    ReadinessTimeout {
        container: String,
        pattern: String,
        timeout: Duration,
    },

    #[error("Container {container} exited before logging '{pattern}'")]
    ExitedBeforeReady { container: String, pattern: String },

    #[error("No host port bound for {port}/tcp on container {container}")]
    PortNotMapped { container: String, port: u16 },
}
