//! Scraping the agent's metrics endpoint
//!
//! The endpoint may refuse connections while the JVM is still starting, so
//! [`Scraper::scrape`] polls it with a fixed interval until the first request
//! completes or the timeout elapses. Only transport failures are retried: a
//! response that arrives is returned as-is, whatever its status or content,
//! and content checks belong to [`crate::assertions`].

use crate::assertions::MetricLines;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// `Accept` header sent with every scrape
pub const OPENMETRICS_ACCEPT: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Path of the metrics endpoint on the agent's HTTP server
pub const METRICS_PATH: &str = "/metrics";

/// Sleep between failed attempts
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound for a single request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error(
        "Timeout while getting metrics from {url}{} after {timeout:?}{}",
        origin_suffix(.origin_port),
        last_error_suffix(.last_error)
    )]
    Timeout {
        url: String,
        origin_port: Option<u16>,
        timeout: Duration,
        last_error: Option<String>,
    },
}

fn origin_suffix(origin_port: &Option<u16>) -> String {
    origin_port
        .map(|port| format!(" (orig port: {})", port))
        .unwrap_or_default()
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    last_error
        .as_ref()
        .map(|e| format!(": last error: {}", e))
        .unwrap_or_default()
}

/// Host and port serving `/metrics`, resolved once per container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    /// Port inside the container that `port` is mapped from
    pub origin_port: Option<u16>,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            origin_port: None,
        }
    }

    pub fn with_origin_port(mut self, origin_port: u16) -> Self {
        self.origin_port = Some(origin_port);
        self
    }

    pub fn metrics_url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, METRICS_PATH)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Blocking metrics scraper with fixed-interval retry
#[derive(Debug, Clone)]
pub struct Scraper {
    client: Client,
    poll_interval: Duration,
}

impl Scraper {
    /// Creates a scraper whose individual requests give up after `request_timeout`
    pub fn new(request_timeout: Duration) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(ScrapeError::Client)?;

        Ok(Self {
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Scrapes the endpoint's `/metrics`, retrying until `timeout` elapses
    pub fn scrape(&self, endpoint: &Endpoint, timeout: Duration) -> Result<MetricLines, ScrapeError> {
        self.poll(&endpoint.metrics_url(), endpoint.origin_port, timeout)
    }

    /// Scrapes an arbitrary URL, retrying until `timeout` elapses
    pub fn scrape_url(&self, url: &str, timeout: Duration) -> Result<MetricLines, ScrapeError> {
        self.poll(url, None, timeout)
    }

    fn poll(
        &self,
        url: &str,
        origin_port: Option<u16>,
        timeout: Duration,
    ) -> Result<MetricLines, ScrapeError> {
        let start = Instant::now();
        let mut last_error: Option<reqwest::Error> = None;
        let mut attempts = 0u32;

        while start.elapsed() < timeout {
            attempts += 1;
            match self.fetch(url) {
                Ok(body) => {
                    let lines = split_lines(&body);
                    info!(
                        url = %url,
                        attempts,
                        lines = lines.len(),
                        "Scraped metrics"
                    );
                    return Ok(MetricLines::new(lines));
                }
                Err(e) => {
                    debug!(url = %url, attempt = attempts, error = %e, "Scrape attempt failed");
                    last_error = Some(e);
                    thread::sleep(self.poll_interval);
                }
            }
        }

        if let Some(e) = &last_error {
            warn!(url = %url, attempts, error = ?e, "Giving up scraping metrics");
        }

        Err(ScrapeError::Timeout {
            url: url.to_string(),
            origin_port,
            timeout,
            last_error: last_error.map(|e| e.to_string()),
        })
    }

    fn fetch(&self, url: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(url)
            .header(ACCEPT, OPENMETRICS_ACCEPT)
            .send()?
            .text()
    }
}

/// Splits a response body on `\n`, dropping trailing empty segments
///
/// An empty body yields no lines. Carriage returns are kept, the lines are
/// only ever prefix-matched.
pub fn split_lines(body: &str) -> Vec<String> {
    let mut lines: Vec<String> = body.split('\n').map(str::to_string).collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}
