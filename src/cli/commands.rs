use clap::{Parser, Subcommand, ValueEnum};

/// Smoke tests for the JMX Prometheus agent across Java runtime images
#[derive(Parser, Debug)]
#[command(
    name = "jmx-smoke",
    about = "Smoke tests for the JMX Prometheus agent across Java runtime images",
    version,
    long_about = "jmx-smoke builds a Docker image per Java base image with the example \
                  application and the JMX Prometheus agent, starts it, scrapes the agent's \
                  /metrics endpoint and checks that the expected metrics are exposed."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "List the base images smoke cases run on")]
    Images,

    #[command(
        about = "Run smoke cases",
        long_about = "Builds and starts one container per base image and runs the selected \
                      checks against it. Exits non-zero if any case fails.\n\n\
                      Examples:\n  \
                      jmx-smoke run\n  \
                      jmx-smoke run --image openjdk:11-jre --check jvm\n  \
                      jmx-smoke run --format json"
    )]
    Run(RunArgs),

    #[command(
        about = "Scrape a metrics endpoint",
        long_about = "Scrapes a running endpoint with the same retry behaviour as the smoke \
                      cases. Without expectations the scraped lines are printed.\n\n\
                      Examples:\n  \
                      jmx-smoke scrape http://localhost:9000/metrics\n  \
                      jmx-smoke scrape http://localhost:9000/metrics --positive jvm_threads_current"
    )]
    Scrape(ScrapeArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[arg(
        short = 'i',
        long = "image",
        value_name = "IMAGE",
        help = "Base image to test (repeatable, defaults to the full matrix)"
    )]
    pub images: Vec<String>,

    #[arg(
        short = 'c',
        long = "check",
        value_enum,
        help = "Check to run (repeatable, defaults to all)"
    )]
    pub checks: Vec<CheckArg>,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,

    #[arg(long, value_name = "SECONDS", help = "Override the scrape timeout")]
    pub scrape_timeout: Option<u64>,

    #[arg(long, help = "Keep built images after each case")]
    pub keep_images: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ScrapeArgs {
    #[arg(value_name = "URL", help = "Metrics URL, e.g. http://localhost:9000/metrics")]
    pub url: String,

    #[arg(
        short = 't',
        long,
        value_name = "SECONDS",
        default_value = "10",
        help = "Keep retrying for this long"
    )]
    pub timeout: u64,

    #[arg(
        long,
        value_name = "SECONDS",
        default_value = "5",
        help = "Timeout of a single request"
    )]
    pub request_timeout: u64,

    #[arg(
        short = 'e',
        long = "expect",
        value_name = "PREFIX",
        help = "Require a line starting with PREFIX (repeatable)"
    )]
    pub expect: Vec<String>,

    #[arg(
        short = 'p',
        long = "positive",
        value_name = "NAME",
        help = "Require metric NAME with a value above zero (repeatable)"
    )]
    pub positive: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CheckArg {
    Jvm,
    Tabular,
}

impl CheckArg {
    pub fn name(self) -> &'static str {
        match self {
            CheckArg::Jvm => "jvm",
            CheckArg::Tabular => "tabular",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormatArg {
    Json,
    Human,
}
