//! Building, starting and tearing down the test container
//!
//! [`JavaContainer`] exposes a blocking API on top of `bollard` by driving
//! its own Tokio runtime, so it must not be created or dropped from inside an
//! async context. The container is force-removed when the value is dropped,
//! which scopes it to the smoke case that started it.

use super::template::{agent_jar_name, image_name, render_dockerfile};
use super::{BuildContext, ContainerError};
use crate::config::SmokeConfig;
use crate::scrape::Endpoint;
use bollard::container::{
    Config, LogsOptions, RemoveContainerOptions, StartContainerOptions,
};
use bollard::image::BuildImageOptions;
use bollard::service::{HostConfig, PortBinding};
use bollard::Docker;
use bytes::Bytes;
use futures_util::stream::StreamExt;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

/// Address published ports are bound to and scraped from
const HOST_IP: &str = "127.0.0.1";

const APPLICATION_JAR_NAME: &str = "jmx_example_application.jar";
const AGENT_CONFIG_NAME: &str = "config.yml";
const DOCKERFILE_NAME: &str = "Dockerfile";

/// Everything needed to build and run one test container
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub base_image: String,
    pub image_name: String,
    pub context: BuildContext,
    pub exposed_port: u16,
    pub readiness_pattern: String,
    /// How many log lines must match before the container counts as ready
    pub readiness_times: usize,
    pub startup_timeout: Duration,
    pub keep_image: bool,
}

impl ContainerSpec {
    /// Renders the Dockerfile for `base_image` and collects the artifacts
    pub fn from_config(config: &SmokeConfig, base_image: &str) -> Result<Self, ContainerError> {
        let template = fs::read_to_string(&config.dockerfile_template).map_err(|source| {
            ContainerError::Io {
                path: config.dockerfile_template.clone(),
                source,
            }
        })?;

        let context = BuildContext::new()
            .with_file(APPLICATION_JAR_NAME, &config.application_jar)
            .with_file(agent_jar_name(&config.project_version), config.agent_jar())
            .with_file(AGENT_CONFIG_NAME, &config.agent_config)
            .with_content(DOCKERFILE_NAME, render_dockerfile(&template, base_image));

        Ok(Self {
            base_image: base_image.to_string(),
            image_name: image_name(base_image),
            context,
            exposed_port: config.exposed_port,
            readiness_pattern: config.readiness_pattern.clone(),
            readiness_times: 1,
            startup_timeout: config.startup_timeout,
            keep_image: config.keep_images,
        })
    }
}

/// A running container, removed on [`JavaContainer::stop`] or drop
pub struct JavaContainer {
    runtime: Runtime,
    docker: Docker,
    id: String,
    image_name: String,
    keep_image: bool,
    endpoint: Endpoint,
    startup_logs: String,
    removed: bool,
}

impl JavaContainer {
    /// Builds the image, starts the container and waits for readiness
    pub fn start(spec: ContainerSpec) -> Result<Self, ContainerError> {
        let readiness = readiness_regex(&spec.readiness_pattern)?;
        let tarball = spec.context.to_tar()?;

        let runtime = Runtime::new().map_err(ContainerError::Runtime)?;
        let docker = Docker::connect_with_local_defaults()?;

        info!(base_image = %spec.base_image, image = %spec.image_name, "Building image");
        runtime.block_on(build_image(&docker, &spec.image_name, tarball))?;

        let created = runtime.block_on(create_container(
            &docker,
            &spec.image_name,
            spec.exposed_port,
        ));
        let id = match created {
            Ok(id) => id,
            Err(e) => {
                // No container to own the image yet, so release it here
                let plan = Teardown::image_only(spec.keep_image);
                runtime.block_on(teardown(&docker, None, &spec.image_name, plan));
                return Err(e);
            }
        };

        // From here on drop removes the container, also on the error paths below
        let mut container = Self {
            runtime,
            docker,
            id,
            image_name: spec.image_name.clone(),
            keep_image: spec.keep_image,
            endpoint: Endpoint::new(HOST_IP, 0),
            startup_logs: String::new(),
            removed: false,
        };

        container.runtime.block_on(
            container
                .docker
                .start_container(&container.id, None::<StartContainerOptions<String>>),
        )?;
        debug!(container = %container.id, "Container started");

        container.startup_logs = container.runtime.block_on(wait_for_log(
            &container.docker,
            &container.id,
            &readiness,
            spec.readiness_times,
            spec.startup_timeout,
        ))?;

        let port = container
            .runtime
            .block_on(host_port(&container.docker, &container.id, spec.exposed_port))?;
        container.endpoint = Endpoint::new(HOST_IP, port).with_origin_port(spec.exposed_port);

        info!(
            container = %container.id,
            endpoint = %container.endpoint,
            "Container ready"
        );
        Ok(container)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    /// Host and mapped port of the agent's HTTP server
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Log output seen while waiting for readiness
    pub fn startup_logs(&self) -> &str {
        &self.startup_logs
    }

    /// Full stdout and stderr of the container so far
    pub fn logs(&self) -> Result<String, ContainerError> {
        self.runtime.block_on(async {
            let options = LogsOptions::<String> {
                stdout: true,
                stderr: true,
                ..Default::default()
            };
            let mut stream = self.docker.logs(&self.id, Some(options));
            let mut output = String::new();
            while let Some(chunk) = stream.next().await {
                output.push_str(&chunk?.to_string());
            }
            Ok::<String, ContainerError>(output)
        })
    }

    /// Removes the container, and the image unless it is kept
    pub fn stop(mut self) -> Result<(), ContainerError> {
        self.remove()
    }

    fn remove(&mut self) -> Result<(), ContainerError> {
        if self.removed {
            return Ok(());
        }
        self.removed = true;

        let plan = Teardown::container_and_image(self.keep_image);
        match self
            .runtime
            .block_on(teardown(&self.docker, Some(self.id.as_str()), &self.image_name, plan))
        {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// What gets removed when a container's scope ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Teardown {
    container: bool,
    image: bool,
}

impl Teardown {
    /// Image built but no container created
    fn image_only(keep_image: bool) -> Self {
        Self {
            container: false,
            image: !keep_image,
        }
    }

    fn container_and_image(keep_image: bool) -> Self {
        Self {
            container: true,
            image: !keep_image,
        }
    }
}

/// Runs every step of `plan` even when an earlier one fails, logging each
/// failure and returning the first
async fn teardown(
    docker: &Docker,
    id: Option<&str>,
    image_name: &str,
    plan: Teardown,
) -> Option<ContainerError> {
    let mut first_error = None;

    if let (true, Some(id)) = (plan.container, id) {
        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };
        match docker.remove_container(id, Some(options)).await {
            Ok(()) => debug!(container = id, "Container removed"),
            Err(e) => {
                warn!(container = id, error = %e, "Failed to remove container");
                first_error.get_or_insert(ContainerError::from(e));
            }
        }
    }

    if plan.image {
        match docker.remove_image(image_name, None, None).await {
            Ok(_) => debug!(image = image_name, "Image removed"),
            Err(e) => {
                warn!(image = image_name, error = %e, "Failed to remove image");
                first_error.get_or_insert(ContainerError::from(e));
            }
        }
    }

    first_error
}

impl Drop for JavaContainer {
    fn drop(&mut self) {
        // teardown already logged each failed step
        let _ = self.remove();
    }
}

/// Anchors `pattern` so it has to match a whole log line
fn readiness_regex(pattern: &str) -> Result<Regex, ContainerError> {
    Regex::new(&format!("(?s)^(?:{})$", pattern)).map_err(|source| {
        ContainerError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        }
    })
}

async fn build_image(docker: &Docker, image: &str, tarball: Vec<u8>) -> Result<(), ContainerError> {
    let options = BuildImageOptions {
        dockerfile: DOCKERFILE_NAME.to_string(),
        t: image.to_string(),
        rm: true,
        forcerm: true,
        ..Default::default()
    };

    let mut stream = docker.build_image(options, None, Some(Bytes::from(tarball)));
    while let Some(info) = stream.next().await {
        let info = info?;
        if let Some(message) = info.error {
            return Err(ContainerError::BuildFailed {
                image: image.to_string(),
                message,
            });
        }
        if let Some(line) = info.stream.as_deref().map(str::trim_end) {
            if !line.is_empty() {
                debug!(image, "{}", line);
            }
        }
    }
    Ok(())
}

async fn create_container(
    docker: &Docker,
    image: &str,
    exposed_port: u16,
) -> Result<String, ContainerError> {
    let port_key = format!("{}/tcp", exposed_port);
    let config = Config {
        image: Some(image.to_string()),
        exposed_ports: Some([(port_key.clone(), HashMap::new())].into_iter().collect()),
        host_config: Some(HostConfig {
            port_bindings: Some(
                [(
                    port_key,
                    Some(vec![PortBinding {
                        host_ip: Some(HOST_IP.to_string()),
                        // 0 lets the daemon pick a free port
                        host_port: Some("0".to_string()),
                    }]),
                )]
                .into_iter()
                .collect(),
            ),
            ..Default::default()
        }),
        ..Default::default()
    };

    let response = docker
        .create_container::<String, String>(None, config)
        .await?;
    for warning in &response.warnings {
        warn!(image, "{}", warning);
    }
    Ok(response.id)
}

/// Follows the container log until `times` lines match, returning what was read
async fn wait_for_log(
    docker: &Docker,
    id: &str,
    readiness: &Regex,
    times: usize,
    timeout: Duration,
) -> Result<String, ContainerError> {
    let options = LogsOptions::<String> {
        follow: true,
        stdout: true,
        stderr: true,
        ..Default::default()
    };
    let mut stream = docker.logs(id, Some(options));
    let mut captured = String::new();

    let follow = async {
        let mut pending = String::new();
        let mut matched = 0;
        while let Some(chunk) = stream.next().await {
            let text = chunk?.to_string();
            captured.push_str(&text);
            pending.push_str(&text);

            while let Some(end) = pending.find('\n') {
                let line: String = pending.drain(..=end).collect();
                if readiness.is_match(line.trim_end_matches(['\r', '\n'])) {
                    matched += 1;
                    if matched >= times {
                        return Ok(true);
                    }
                }
            }
        }
        if !pending.is_empty() && readiness.is_match(&pending) {
            matched += 1;
        }
        Ok::<bool, ContainerError>(matched >= times)
    };

    let outcome = tokio::time::timeout(timeout, follow).await;
    match outcome {
        Ok(Ok(true)) => Ok(captured),
        Ok(Ok(false)) => Err(ContainerError::ExitedBeforeReady {
            container: id.to_string(),
            pattern: readiness.as_str().to_string(),
        }),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(ContainerError::ReadinessTimeout {
            container: id.to_string(),
            pattern: readiness.as_str().to_string(),
            timeout,
        }),
    }
}

async fn host_port(docker: &Docker, id: &str, container_port: u16) -> Result<u16, ContainerError> {
    let inspect = docker.inspect_container(id, None).await?;
    let port_key = format!("{}/tcp", container_port);

    inspect
        .network_settings
        .and_then(|ns| ns.ports)
        .and_then(|ports| ports.get(&port_key).cloned())
        .and_then(|bindings| bindings)
        .and_then(|bindings| bindings.into_iter().find_map(|b| b.host_port))
        .and_then(|port| port.parse::<u16>().ok())
        .ok_or_else(|| ContainerError::PortNotMapped {
            container: id.to_string(),
            port: container_port,
        })
}
