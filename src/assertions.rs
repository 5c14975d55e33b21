//! Checks against scraped metric lines
//!
//! Lines are never parsed into a metric model. An expectation is a literal
//! prefix such as `java_lang_Memory_NonHeapMemoryUsage_committed` or a full
//! `name{labels} value` line, and a line satisfies it if it starts with that
//! prefix. Numeric checks read the second whitespace-delimited token.

use serde::Serialize;
use std::ops::Deref;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssertionError {
    #[error("Metric {prefix} not found.")]
    MissingMetric { prefix: String },

    #[error("Metric line has no numeric value: {line}")]
    UnparsableValue { line: String },

    #[error("{name} should be > 0 (was {value})")]
    NotPositive { name: String, value: f64 },
}

/// Lines of one successful scrape, in response order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricLines(Vec<String>);

impl MetricLines {
    pub fn new(lines: Vec<String>) -> Self {
        Self(lines)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }

    /// First line starting with `prefix`
    pub fn find(&self, prefix: &str) -> Result<&str, AssertionError> {
        self.0
            .iter()
            .find(|line| line.starts_with(prefix))
            .map(String::as_str)
            .ok_or_else(|| AssertionError::MissingMetric {
                prefix: prefix.to_string(),
            })
    }

    /// Sample value of the first line starting with `prefix`
    pub fn value_of(&self, prefix: &str) -> Result<f64, AssertionError> {
        let line = self.find(prefix)?;
        parse_value(line)
    }

    /// Fails unless `name` is present with a value greater than zero
    pub fn require_positive(&self, name: &str) -> Result<f64, AssertionError> {
        let value = self.value_of(name)?;
        // NaN fails too
        if value > 0.0 {
            Ok(value)
        } else {
            Err(AssertionError::NotPositive {
                name: name.to_string(),
                value,
            })
        }
    }

    /// Fails on the first prefix that no line starts with
    pub fn require_all<I, S>(&self, prefixes: I) -> Result<(), AssertionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for prefix in prefixes {
            self.find(prefix.as_ref())?;
        }
        Ok(())
    }
}

impl Deref for MetricLines {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for MetricLines {
    fn from(lines: Vec<String>) -> Self {
        Self(lines)
    }
}

/// Second whitespace-delimited token of a `name{labels} value` line
pub fn parse_value(line: &str) -> Result<f64, AssertionError> {
    line.split_whitespace()
        .nth(1)
        .and_then(|token| token.parse::<f64>().ok())
        .ok_or_else(|| AssertionError::UnparsableValue {
            line: line.to_string(),
        })
}

/// A single requirement on the scraped lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "metric", rename_all = "snake_case")]
pub enum Expectation {
    /// Some line starts with this literal prefix
    Present(String),
    /// Some line starts with this name and carries a value above zero
    Positive(String),
}

impl Expectation {
    pub fn present(prefix: impl Into<String>) -> Self {
        Self::Present(prefix.into())
    }

    pub fn positive(name: impl Into<String>) -> Self {
        Self::Positive(name.into())
    }

    pub fn metric(&self) -> &str {
        match self {
            Self::Present(m) | Self::Positive(m) => m,
        }
    }

    pub fn check(&self, lines: &MetricLines) -> Result<(), AssertionError> {
        match self {
            Self::Present(prefix) => lines.find(prefix).map(|_| ()),
            Self::Positive(name) => lines.require_positive(name).map(|_| ()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NON_HEAP: &str = "java_lang_Memory_NonHeapMemoryUsage_committed";
    const SDA1: &str =
        "io_prometheus_jmx_tabularData_Server_1_Disk_Usage_Table_size{source=\"/dev/sda1\"}";

    fn lines(raw: &[&str]) -> MetricLines {
        MetricLines::new(raw.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_find_first_matching_prefix() {
        let metrics = lines(&["a_total 1", "b_total 2", "b_total_created 3"]);
        assert_eq!(metrics.find("b_total").unwrap(), "b_total 2");
        assert_eq!(metrics.find("a").unwrap(), "a_total 1");
    }

    #[test]
    fn test_find_missing_names_prefix() {
        let metrics = lines(&[
            "io_prometheus_jmx_tabularData_Server_1_Disk_Usage_Table_size{source=\"/dev/sda2\"} 1.5E10",
        ]);
        let err = metrics.find(SDA1).unwrap_err();
        assert_eq!(
            err,
            AssertionError::MissingMetric {
                prefix: SDA1.to_string()
            }
        );
        assert_eq!(err.to_string(), format!("Metric {} not found.", SDA1));
    }

    #[test]
    fn test_require_positive_extracts_value() {
        let metrics = lines(&[
            "# TYPE java_lang_Memory_NonHeapMemoryUsage_committed untyped",
            "java_lang_Memory_NonHeapMemoryUsage_committed 123456.0",
            "java_lang_Memory_HeapMemoryUsage_committed 999.0",
        ]);
        assert_eq!(metrics.require_positive(NON_HEAP).unwrap(), 123456.0);
    }

    #[test]
    fn test_require_positive_rejects_zero() {
        let metrics = lines(&["java_lang_Memory_NonHeapMemoryUsage_committed 0"]);
        let err = metrics.require_positive(NON_HEAP).unwrap_err();
        assert!(matches!(err, AssertionError::NotPositive { value, .. } if value == 0.0));
        assert!(err.to_string().starts_with(&format!("{} should be > 0", NON_HEAP)));
    }

    #[test]
    fn test_require_positive_missing_line() {
        let metrics = lines(&["jvm_threads_current 12"]);
        assert!(matches!(
            metrics.require_positive(NON_HEAP),
            Err(AssertionError::MissingMetric { .. })
        ));
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("a{x=\"y\"} 7.516192768E9").unwrap(), 7.516192768E9);
        assert_eq!(parse_value("a 1 1700000000").unwrap(), 1.0);
        assert!(matches!(
            parse_value("a"),
            Err(AssertionError::UnparsableValue { .. })
        ));
        assert!(parse_value("a abc").is_err());
    }

    #[test]
    fn test_require_all_fails_on_first_missing() {
        let metrics = lines(&["a 1", "c 3"]);
        assert!(metrics.require_all(["a", "c"]).is_ok());
        let err = metrics.require_all(["a", "b", "d"]).unwrap_err();
        assert_eq!(err.to_string(), "Metric b not found.");
    }

    #[test]
    fn test_empty_lines_fail_every_expectation() {
        let metrics = MetricLines::default();
        assert!(Expectation::present("a").check(&metrics).is_err());
        assert!(Expectation::positive("a").check(&metrics).is_err());
    }

    #[test]
    fn test_expectation_check() {
        let metrics = lines(&["up 1", "down 0"]);
        assert!(Expectation::present("down 0").check(&metrics).is_ok());
        assert!(Expectation::positive("up").check(&metrics).is_ok());
        assert!(Expectation::positive("down").check(&metrics).is_err());
        assert_eq!(Expectation::positive("up").metric(), "up");
    }
}
