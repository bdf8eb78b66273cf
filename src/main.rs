//! bmc-virtual-sensor entry point: CLI dispatch, logging setup, async runtime.

mod app;
mod config;
mod daemon;
mod discovery;
mod pipeline;
mod sensor;
mod system;

use anyhow::Result;
use clap::Parser;

use app::cli::{Args, HELP_TEXT};
use app::logging::{filter_for_level, init_tracing, VALID_LEVELS};
use config::persistence::{init_config, load_config, resolve_config_path};
use daemon::service::{run_once, run_service};
use daemon::status::{run_health_check, show_status};
use discovery::list_sensors;

#[tokio::main]
async fn main() -> Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            if err.kind() == clap::error::ErrorKind::DisplayHelp {
                print!("{}", HELP_TEXT);
                std::process::exit(0);
            }
            if err.kind() == clap::error::ErrorKind::DisplayVersion {
                println!("\x1b[32mbmc-virtual-sensor {} ({})\x1b[0m", env!("CARGO_PKG_VERSION"), std::env::consts::ARCH);
                std::process::exit(0);
            }

            eprintln!("{}", err);
            print!("{}", HELP_TEXT);
            std::process::exit(1);
        }
    };

    if !args.has_command() {
        eprintln!("ERROR: No command specified. You must specify a command.");
        print!("{}", HELP_TEXT);
        eprintln!();
        eprintln!("Common commands:");
        eprintln!("  ./bmc-virtual-sensor --init-config   Write a default configuration");
        eprintln!("  ./bmc-virtual-sensor --run           Run the virtual sensor");
        eprintln!("  ./bmc-virtual-sensor -L power        List power sensors");
        eprintln!("  ./bmc-virtual-sensor -i              Show published state");
        std::process::exit(1);
    }

    // Priority: 1. --log-level flag, 2. LOG_LEVEL env, 3. config file, 4. default (info)
    let config_path = resolve_config_path(args.config_file.as_deref())?;
    let requested_level = args
        .log_level
        .clone()
        .or_else(|| std::env::var("LOG_LEVEL").ok());

    let log_level = match requested_level {
        Some(level) => level,
        None => configured_log_level(&config_path),
    };

    let filter = filter_for_level(&log_level).unwrap_or_else(|| {
        eprintln!(
            "Invalid log level '{}'. Using INFO. Valid levels: {}",
            log_level,
            VALID_LEVELS.join(", ").to_uppercase()
        );
        "info"
    });
    init_tracing(filter);

    if args.init_config {
        init_config(&config_path).await?;
        println!("Default configuration written to {:?}", config_path);
        return Ok(());
    }

    if let Some(filter) = args.list.as_ref() {
        return list_sensors(filter.as_deref()).await;
    }

    if args.status {
        return show_status(&config_path).await;
    }

    if args.check {
        return run_health_check(&config_path).await;
    }

    let config = load_config(&config_path).await?;

    if args.config {
        println!("\n{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    if args.once {
        return run_once(&config).await;
    }

    tracing::info!(
        "bmc-virtual-sensor v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    );
    run_service(config, config_path).await
}

/// Level from the config file without logging anything (tracing is not up yet).
fn configured_log_level(config_path: &std::path::Path) -> String {
    std::fs::read_to_string(config_path)
        .ok()
        .and_then(|content| serde_json::from_str::<config::types::ServiceConfig>(&content).ok())
        .map(|config| config.logging.log_level)
        .unwrap_or_else(|| "info".to_string())
}
