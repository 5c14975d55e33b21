pub mod stub;

use jmx_smoke::{ContainerSpec, JavaContainer, MetricLines, Scraper, SmokeConfig};

/// Harness configuration for the Docker-backed tests
///
/// Paths default to the Maven module layout, see `SmokeConfig::from_env`.
#[allow(dead_code)]
pub fn config() -> SmokeConfig {
    let config = SmokeConfig::from_env().expect("Failed to load smoke configuration");
    config
        .validate()
        .unwrap_or_else(|e| panic!("Smoke test artifacts missing: {}", e));
    config
}

/// Builds and starts the agent container for `base_image`
#[allow(dead_code)]
pub fn start_container(config: &SmokeConfig, base_image: &str) -> JavaContainer {
    let spec = ContainerSpec::from_config(config, base_image)
        .unwrap_or_else(|e| panic!("Failed to prepare container for {}: {}", base_image, e));
    JavaContainer::start(spec)
        .unwrap_or_else(|e| panic!("Failed to start container for {}: {}", base_image, e))
}

/// Scrapes the container, failing the test on timeout
#[allow(dead_code)]
pub fn scrape_metrics(config: &SmokeConfig, container: &JavaContainer) -> MetricLines {
    let scraper = Scraper::new(config.request_timeout).expect("Failed to build HTTP client");
    scraper
        .scrape(container.endpoint(), config.scrape_timeout)
        .unwrap_or_else(|e| panic!("{}", e))
}
