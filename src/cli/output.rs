//! Rendering command results as text or JSON

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fmt::Write as _;

use crate::cli::commands::OutputFormatArg;
use crate::error::SmokeError;
use crate::matrix::{CaseReport, CheckStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Human,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Human => OutputFormat::Human,
        }
    }
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the outcome of a matrix run, one entry per base image
    pub fn format_cases(&self, cases: &[(String, Result<CaseReport, SmokeError>)]) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format_cases_json(cases),
            OutputFormat::Human => Ok(self.format_cases_human(cases)),
        }
    }

    fn format_cases_json(&self, cases: &[(String, Result<CaseReport, SmokeError>)]) -> Result<String> {
        let entries: Vec<Value> = cases
            .iter()
            .map(|(image, result)| match result {
                Ok(report) => serde_json::to_value(report)
                    .with_context(|| format!("Failed to serialize report for {}", image)),
                Err(e) => Ok(json!({
                    "base_image": image,
                    "error": e.to_string(),
                })),
            })
            .collect::<Result<_>>()?;

        serde_json::to_string_pretty(&entries).context("Failed to serialize reports to JSON")
    }

    fn format_cases_human(&self, cases: &[(String, Result<CaseReport, SmokeError>)]) -> String {
        let mut output = String::new();
        let mut passed = 0;

        for (image, result) in cases {
            match result {
                Ok(report) => {
                    let verdict = if report.passed() { "PASS" } else { "FAIL" };
                    if report.passed() {
                        passed += 1;
                    }
                    let _ = writeln!(
                        output,
                        "{} {} ({:.1}s)",
                        verdict,
                        image,
                        report.duration_ms as f64 / 1000.0
                    );
                    for outcome in &report.outcomes {
                        let mark = match outcome.status {
                            CheckStatus::Passed => "ok",
                            CheckStatus::AssertionFailed => "assertion failed",
                            CheckStatus::ScrapeFailed => "scrape failed",
                        };
                        let _ = write!(output, "    {:<10} {}", outcome.check, mark);
                        if let Some(message) = &outcome.message {
                            let _ = write!(output, ": {}", message);
                        }
                        output.push('\n');
                    }
                }
                Err(e) => {
                    let _ = writeln!(output, "ERROR {}\n    {}", image, e);
                }
            }
        }

        let _ = writeln!(output, "\n{}/{} base images passed", passed, cases.len());
        output
    }

    pub fn format_images(&self, images: &[&str]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(images).context("Failed to serialize image list")
            }
            OutputFormat::Human => Ok(images.join("\n")),
        }
    }
}
