//! Autoscribe CLI Binary
//!
//! Command-line interface for the content automation engine.

use autoscribe::cli::{Cli, Commands, RunContext};
use autoscribe::config::ConfigLoader;
use autoscribe::logging::{init_logging, resolve_log_file_path, LoggingConfig};
use clap::Parser;
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli);

    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Autoscribe CLI starting");

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            process::exit(1);
        }
    };

    let context = match RunContext::new(cli.workspace.clone(), cli.config.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error loading configuration: {}", e);
            eprintln!("{}", autoscribe::cli::map_error(&e));
            process::exit(1);
        }
    };

    match runtime.block_on(context.execute(&cli.command)) {
        Ok(output) => {
            info!("Command completed successfully");
            println!("{}", output);
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", autoscribe::cli::map_error(&e));
            process::exit(1);
        }
    }
}

/// Build logging configuration from CLI args, environment, and config file
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path).ok(),
        None => ConfigLoader::load(&cli.workspace).ok(),
    }
    .map(|c| c.logging)
    .unwrap_or_default();

    // One-shot commands stay quiet unless asked; the daemon always logs.
    if !cli.verbose && cli.command != Commands::Run {
        config.level = "off".to_string();
        return config;
    }

    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if config.output.contains("file") {
        if let Ok(path) =
            resolve_log_file_path(cli.log_file.clone(), config.file.clone(), Some(&cli.workspace))
        {
            config.file = Some(path);
        }
    }

    config
}
