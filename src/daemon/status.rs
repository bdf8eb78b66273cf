use std::path::Path;
use std::process;

use anyhow::Result;

use crate::config::persistence::load_config;
use crate::pipeline::observers::read_state_file;
use crate::sensor::types::SourceKind;

fn banner() {
    println!(
        "\x1b[32mbmc-virtual-sensor v{} ({})\x1b[0m",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::ARCH
    );
}

pub async fn show_status(config_path: &Path) -> Result<()> {
    banner();
    println!("================================");

    let config = load_config(config_path).await?;
    let state_path = Path::new(&config.publishing.state_file);

    match read_state_file(state_path).await {
        Ok(doc) => {
            println!("Sensor: {} ({})", doc.name, doc.object_path);
            match doc.value {
                Some(value) => {
                    let unit = config.sensor.unit.symbol();
                    let stale = if doc.published.stale { " [stale]" } else { "" };
                    println!("Value: {:.2} {}{}", value, unit, stale);
                    println!("Valid sources: {}/{}", doc.published.reading.valid_sources(), config.sources.len());
                }
                None => println!("Value: unavailable"),
            }
            println!("Reading time: {}", doc.published.reading.timestamp().to_rfc3339());
            println!("Changes published: {}", doc.published.sequence);
            println!("State written: {}", doc.written_at);
        }
        Err(e) => {
            println!("Status: No published state ({:#})", e);
            println!("Is the service running? Start it with --run");
        }
    }

    println!("\nConfiguration:");
    println!("   Policy: {:?}", config.aggregation.policy);
    println!("   Interval: {}s (source timeout {}s)", config.polling.interval, config.polling.source_timeout);
    println!("   On unavailable: {:?}", config.publishing.unavailable_policy);

    Ok(())
}

/// Run health check to verify the installation.
pub async fn run_health_check(config_path: &Path) -> Result<()> {
    banner();
    println!("Health Check");
    println!("============\n");

    let mut all_ok = true;

    let config = match load_config(config_path).await {
        Ok(config) => {
            println!("✓ Config file: {}", config_path.display());
            Some(config)
        }
        Err(e) => {
            println!("✗ Config file: {:#}", e);
            println!("  Run: ./bmc-virtual-sensor --init-config");
            all_ok = false;
            None
        }
    };

    if let Some(config) = &config {
        let state_path = Path::new(&config.publishing.state_file);
        if state_path.exists() {
            println!("✓ State file: {}", state_path.display());
        } else {
            println!("⚠ State file: Not written yet (created on --run)");
        }

        let needs_busctl = config.sources.iter().any(|s| s.kind == SourceKind::Dbus);
        if needs_busctl {
            let busctl_ok = process::Command::new("busctl")
                .arg("--version")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false);
            if busctl_ok {
                println!("✓ busctl: available");
            } else {
                println!("✗ busctl: NOT FOUND (required for D-Bus sources)");
                all_ok = false;
            }
        }

        for source in config.sources.iter().filter(|s| s.kind == SourceKind::File) {
            if Path::new(&source.id).exists() {
                println!("✓ Source file: {}", source.id);
            } else {
                println!("⚠ Source file: {} missing", source.id);
            }
        }
    }

    println!();
    if all_ok {
        println!("\x1b[32m✓ All checks passed!\x1b[0m");
    } else {
        println!("\x1b[33m⚠ Some issues found - see above\x1b[0m");
    }

    Ok(())
}
