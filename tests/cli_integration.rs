//! CLI integration tests
//!
//! Exercise the `jmx-smoke` binary end to end: argument parsing, output and
//! exit codes. Scrapes go against an in-process stub server.

mod support;

use std::process::Command;
use support::stub;

fn jmx_smoke() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_jmx-smoke"));
    cmd.env_remove("RUST_LOG").env("JMX_SMOKE_LOG_LEVEL", "error");
    cmd
}

const METRICS: &str = "# TYPE java_lang_Memory_NonHeapMemoryUsage_committed untyped\n\
                       java_lang_Memory_NonHeapMemoryUsage_committed 2.4051712E7\n\
                       jvm_threads_current 12.0\n";

#[test]
fn test_cli_help() {
    let output = jmx_smoke().arg("--help").output().expect("Failed to run jmx-smoke");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("run"));
    assert!(stdout.contains("scrape"));
    assert!(stdout.contains("images"));
}

#[test]
fn test_images_lists_matrix() {
    let output = jmx_smoke().arg("images").output().expect("Failed to run jmx-smoke");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let images: Vec<&str> = stdout.lines().collect();
    assert_eq!(images, jmx_smoke::BASE_IMAGES);
}

#[test]
fn test_scrape_prints_lines() {
    let port = stub::serve(METRICS);
    let output = jmx_smoke()
        .args(["scrape", &format!("http://127.0.0.1:{}/metrics", port)])
        .output()
        .expect("Failed to run jmx-smoke");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 3);
    assert!(stdout.contains("jvm_threads_current 12.0"));
}

#[test]
fn test_scrape_prints_error_page_body() {
    let port = stub::serve_status("500 Internal Server Error", "oops\n");
    let output = jmx_smoke()
        .args(["scrape", &format!("http://127.0.0.1:{}/metrics", port)])
        .output()
        .expect("Failed to run jmx-smoke");

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "oops\n");
}

#[test]
fn test_scrape_expectations_pass() {
    let port = stub::serve(METRICS);
    let output = jmx_smoke()
        .args([
            "scrape",
            &format!("http://127.0.0.1:{}/metrics", port),
            "--positive",
            "java_lang_Memory_NonHeapMemoryUsage_committed",
            "--expect",
            "jvm_threads_current 12.0",
        ])
        .output()
        .expect("Failed to run jmx-smoke");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ok   java_lang_Memory_NonHeapMemoryUsage_committed"));
}

#[test]
fn test_scrape_missing_metric_fails() {
    let port = stub::serve(METRICS);
    let output = jmx_smoke()
        .args([
            "scrape",
            &format!("http://127.0.0.1:{}/metrics", port),
            "--expect",
            "io_prometheus_jmx_tabularData_Server_1_Disk_Usage_Table_size{source=\"/dev/sda1\"}",
        ])
        .output()
        .expect("Failed to run jmx-smoke");

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(
        "FAIL Metric io_prometheus_jmx_tabularData_Server_1_Disk_Usage_Table_size{source=\"/dev/sda1\"} not found."
    ));
}

#[test]
fn test_scrape_unreachable_times_out() {
    let port = stub::closed_port();
    let url = format!("http://127.0.0.1:{}/metrics", port);
    let output = jmx_smoke()
        .env("JMX_SMOKE_LOG_LEVEL", "info")
        .args(["scrape", &url, "--timeout", "1", "--request-timeout", "1"])
        .output()
        .expect("Failed to run jmx-smoke");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Timeout while getting metrics from"));
    assert!(stderr.contains(&url));
}

#[test]
fn test_run_with_missing_artifacts_fails_before_docker() {
    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let output = jmx_smoke()
        .env("JMX_SMOKE_PROJECT_VERSION", "0.0.0")
        .env("JMX_SMOKE_DOCKERFILE", dir.path().join("Dockerfile"))
        .env("JMX_SMOKE_APPLICATION_JAR", dir.path().join("app.jar"))
        .env("JMX_SMOKE_AGENT_DIR", dir.path())
        .env("JMX_SMOKE_AGENT_CONFIG", dir.path().join("config.yml"))
        .args(["run", "--image", "openjdk:8-jre"])
        .output()
        .expect("Failed to run jmx-smoke");

    assert_eq!(output.status.code(), Some(2));
}
