//! Base image matrix and smoke cases
//!
//! Every base image gets its own [`SmokeCase`]: a fresh image, a fresh
//! container and a fresh scraper. Nothing is shared between cases, so they
//! can run in any order.

use crate::assertions::{AssertionError, Expectation, MetricLines};
use crate::config::SmokeConfig;
use crate::container::{ContainerSpec, JavaContainer};
use crate::error::SmokeError;
use crate::scrape::Scraper;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Java runtimes the agent is smoke-tested on
pub const BASE_IMAGES: &[&str] = &[
    // HotSpot
    "openjdk:8-jre",
    "openjdk:11-jre",
    "ticketfly/java:6",
    "adoptopenjdk/openjdk16:ubi-minimal-jre",
    // OpenJ9
    "ibmjava:8-jre",
    "adoptopenjdk/openjdk11-openj9",
];

pub const NON_HEAP_COMMITTED: &str = "java_lang_Memory_NonHeapMemoryUsage_committed";

/// Rows of the example application's tabular disk usage MBean
pub const TABULAR_DISK_USAGE: [&str; 4] = [
    "io_prometheus_jmx_tabularData_Server_1_Disk_Usage_Table_size{source=\"/dev/sda1\"} 7.516192768E9",
    "io_prometheus_jmx_tabularData_Server_1_Disk_Usage_Table_size{source=\"/dev/sda2\"} 1.5032385536E10",
    "io_prometheus_jmx_tabularData_Server_2_Disk_Usage_Table_size{source=\"/dev/sda1\"} 2.5769803776E10",
    "io_prometheus_jmx_tabularData_Server_2_Disk_Usage_Table_size{source=\"/dev/sda2\"} 1.073741824E11",
];

/// A named group of expectations verified against one scrape
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmokeCheck {
    pub name: String,
    pub expectations: Vec<Expectation>,
}

impl SmokeCheck {
    pub fn new(name: impl Into<String>, expectations: Vec<Expectation>) -> Self {
        Self {
            name: name.into(),
            expectations,
        }
    }

    /// Non-heap committed memory is exported and above zero
    pub fn jvm_metric() -> Self {
        Self::new("jvm", vec![Expectation::positive(NON_HEAP_COMMITTED)])
    }

    /// All four tabular disk usage rows are exported with their values
    pub fn tabular_metric() -> Self {
        Self::new(
            "tabular",
            TABULAR_DISK_USAGE
                .iter()
                .map(|line| Expectation::present(*line))
                .collect(),
        )
    }

    pub fn all() -> Vec<Self> {
        vec![Self::jvm_metric(), Self::tabular_metric()]
    }

    pub fn by_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|c| c.name == name)
    }

    /// Fails on the first unmet expectation
    pub fn verify(&self, lines: &MetricLines) -> Result<(), AssertionError> {
        self.expectations.iter().try_for_each(|e| e.check(lines))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    /// A scrape succeeded but an expectation was not met
    AssertionFailed,
    /// No scrape succeeded before the timeout
    ScrapeFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckOutcome {
    pub check: String,
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Result of running a set of checks against one base image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseReport {
    pub base_image: String,
    pub image_name: String,
    pub outcomes: Vec<CheckOutcome>,
    pub duration_ms: u128,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.status == CheckStatus::Passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status != CheckStatus::Passed)
    }
}

/// One base image under test
pub struct SmokeCase<'a> {
    config: &'a SmokeConfig,
    base_image: String,
}

impl<'a> SmokeCase<'a> {
    pub fn new(config: &'a SmokeConfig, base_image: impl Into<String>) -> Self {
        Self {
            config,
            base_image: base_image.into(),
        }
    }

    pub fn base_image(&self) -> &str {
        &self.base_image
    }

    /// Starts the container, runs every check against its own scrape and
    /// removes the container again
    ///
    /// Container and client setup failures abort the case. Check failures are
    /// recorded in the report.
    pub fn run(&self, checks: &[SmokeCheck]) -> Result<CaseReport, SmokeError> {
        let started = Instant::now();
        let spec = ContainerSpec::from_config(self.config, &self.base_image)?;
        let image_name = spec.image_name.clone();
        let container = JavaContainer::start(spec)?;
        let scraper = Scraper::new(self.config.request_timeout)?;

        let outcomes: Vec<CheckOutcome> = checks
            .iter()
            .map(|check| run_check(&scraper, &container, check, self.config))
            .collect();

        if outcomes.iter().any(|o| o.status != CheckStatus::Passed) {
            match container.logs() {
                Ok(logs) => debug!(base_image = %self.base_image, "Container output:\n{}", logs),
                Err(e) => debug!(error = %e, "Failed to fetch container logs"),
            }
        }

        if let Err(e) = container.stop() {
            warn!(base_image = %self.base_image, error = %e, "Failed to remove container");
        }

        let report = CaseReport {
            base_image: self.base_image.clone(),
            image_name,
            outcomes,
            duration_ms: started.elapsed().as_millis(),
        };
        if report.passed() {
            info!(base_image = %report.base_image, "Smoke case passed");
        } else {
            error!(base_image = %report.base_image, "Smoke case failed");
        }
        Ok(report)
    }
}

fn run_check(
    scraper: &Scraper,
    container: &JavaContainer,
    check: &SmokeCheck,
    config: &SmokeConfig,
) -> CheckOutcome {
    let result = scraper
        .scrape(container.endpoint(), config.scrape_timeout)
        .map_err(SmokeError::from)
        .and_then(|lines| check.verify(&lines).map_err(SmokeError::from));
    outcome(check, result)
}

fn outcome(check: &SmokeCheck, result: Result<(), SmokeError>) -> CheckOutcome {
    let (status, message) = match result {
        Ok(()) => (CheckStatus::Passed, None),
        Err(SmokeError::Assertion(e)) => (CheckStatus::AssertionFailed, Some(e.to_string())),
        Err(e) => (CheckStatus::ScrapeFailed, Some(e.to_string())),
    };
    if let Some(message) = &message {
        warn!(check = %check.name, "{}", message);
    }
    CheckOutcome {
        check: check.name.clone(),
        status,
        message,
    }
}

/// Runs `checks` once per base image, each in its own container
pub fn run_matrix<'i, I>(
    config: &SmokeConfig,
    base_images: I,
    checks: &[SmokeCheck],
) -> Vec<(String, Result<CaseReport, SmokeError>)>
where
    I: IntoIterator<Item = &'i str>,
{
    base_images
        .into_iter()
        .map(|image| {
            info!(base_image = image, "Running smoke case");
            let result = SmokeCase::new(config, image).run(checks);
            if let Err(e) = &result {
                error!(base_image = image, error = %e, "Smoke case aborted");
            }
            (image.to_string(), result)
        })
        .collect()
}
