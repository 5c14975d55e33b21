//! Command handlers, each returning the process exit code

use anyhow::{bail, Context, Result};
use std::time::Duration;
use tracing::{debug, error};

use crate::assertions::Expectation;
use crate::cli::commands::{RunArgs, ScrapeArgs};
use crate::cli::output::{OutputFormat, OutputFormatter};
use crate::config::SmokeConfig;
use crate::matrix::{run_matrix, SmokeCheck, BASE_IMAGES};
use crate::scrape::Scraper;

pub fn handle_images() -> i32 {
    match OutputFormatter::new(OutputFormat::Human).format_images(BASE_IMAGES) {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            error!("{:#}", e);
            1
        }
    }
}

pub fn handle_run(args: &RunArgs) -> i32 {
    match run(args) {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            error!("{:#}", e);
            2
        }
    }
}

fn run(args: &RunArgs) -> Result<bool> {
    let mut config = SmokeConfig::from_env().context("Failed to load configuration")?;
    if let Some(secs) = args.scrape_timeout {
        config.scrape_timeout = Duration::from_secs(secs);
    }
    if args.keep_images {
        config.keep_images = true;
    }
    config.validate().context("Invalid configuration")?;
    debug!("Configuration: {:?}", config);

    let checks = selected_checks(args)?;
    let images: Vec<&str> = if args.images.is_empty() {
        BASE_IMAGES.to_vec()
    } else {
        args.images.iter().map(String::as_str).collect()
    };

    let cases = run_matrix(&config, images, &checks);
    let output = OutputFormatter::new(args.format.into()).format_cases(&cases)?;
    println!("{}", output);

    Ok(cases
        .iter()
        .all(|(_, result)| result.as_ref().is_ok_and(|report| report.passed())))
}

fn selected_checks(args: &RunArgs) -> Result<Vec<SmokeCheck>> {
    if args.checks.is_empty() {
        return Ok(SmokeCheck::all());
    }
    args.checks
        .iter()
        .map(|arg| {
            SmokeCheck::by_name(arg.name())
                .with_context(|| format!("Unknown check: {}", arg.name()))
        })
        .collect()
}

pub fn handle_scrape(args: &ScrapeArgs) -> i32 {
    match scrape(args) {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    }
}

fn scrape(args: &ScrapeArgs) -> Result<()> {
    let scraper = Scraper::new(Duration::from_secs(args.request_timeout))?;
    let lines = scraper.scrape_url(&args.url, Duration::from_secs(args.timeout))?;

    let expectations: Vec<Expectation> = args
        .expect
        .iter()
        .map(Expectation::present)
        .chain(args.positive.iter().map(Expectation::positive))
        .collect();

    if expectations.is_empty() {
        for line in lines.iter() {
            println!("{}", line);
        }
        return Ok(());
    }

    let mut failed = 0;
    for expectation in &expectations {
        match expectation.check(&lines) {
            Ok(()) => println!("ok   {}", expectation.metric()),
            Err(e) => {
                println!("FAIL {}", e);
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} expectations failed", failed, expectations.len());
    }
    Ok(())
}
