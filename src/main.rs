use jmx_smoke::cli::commands::{CliArgs, Commands};
use jmx_smoke::cli::handlers::{handle_images, handle_run, handle_scrape};
use jmx_smoke::util::logging::{init_logging, parse_level, LoggingConfig};
use jmx_smoke::VERSION;

use clap::Parser;
use std::env;
use tracing::{debug, Level};

fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("jmx-smoke v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Images => handle_images(),
        Commands::Run(run_args) => handle_run(run_args),
        Commands::Scrape(scrape_args) => handle_scrape(scrape_args),
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        let level_str = env::var("JMX_SMOKE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        parse_level(&level_str)
    };

    let use_json = env::var("JMX_SMOKE_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    init_logging(LoggingConfig {
        level,
        use_json,
        ..Default::default()
    });
}
