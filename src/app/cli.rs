//! Command-line argument definitions (clap) and help text.

use std::path::PathBuf;

use clap::Parser;

pub const HELP_TEXT: &str = "
BMC Virtual Sensor - derived sensor aggregator
Usage: bmc-virtual-sensor [OPTIONS]

Options:
  -h, --help                    Print help
  -V, --version                 Print version
Service:
  -r, --run                     Run the aggregator in the foreground (systemd entry point)
      --once                    Run a single tick and print the reading
Sensors:
  -L, --list [<TYPE>]           List bus sensors (all, or one type: temperature, voltage, power, fan_tach, ...)
  -i, --status                  Show the published virtual sensor state
Config & Debug:
  -f, --config-file <PATH>      Configuration file (default: config.json next to the binary)
  -c, --config                  Show current configuration
      --init-config             Write a default configuration file
      --check                   Run health check (config, state file, bus tooling)
      --log-level <LOG_LEVEL>   Log level (TRACE, DEBUG, INFO, WARN, ERROR, CRITICAL)
";

#[derive(Parser, Debug)]
#[command(name = "bmc-virtual-sensor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "BMC virtual sensor - derived sensor aggregator", long_about = None)]
pub struct Args {
    // === Service ===
    /// Run the aggregator in the foreground
    #[arg(short = 'r', long, help_heading = "Service")]
    pub run: bool,

    /// Run a single tick and print the reading
    #[arg(long, help_heading = "Service")]
    pub once: bool,

    // === Sensors ===
    /// List bus sensors, optionally of one type
    #[arg(short = 'L', long = "list", help_heading = "Sensors")]
    pub list: Option<Option<String>>,

    /// Show the published virtual sensor state
    #[arg(short = 'i', long = "status", help_heading = "Sensors")]
    pub status: bool,

    // === Config & Debug ===
    /// Configuration file
    #[arg(short = 'f', long = "config-file", help_heading = "Config & Debug")]
    pub config_file: Option<PathBuf>,

    /// Show current configuration
    #[arg(short = 'c', long, help_heading = "Config & Debug")]
    pub config: bool,

    /// Write a default configuration file
    #[arg(long = "init-config", help_heading = "Config & Debug")]
    pub init_config: bool,

    /// Run health check
    #[arg(long, help_heading = "Config & Debug")]
    pub check: bool,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR, CRITICAL)
    #[arg(long = "log-level", help_heading = "Config & Debug")]
    pub log_level: Option<String>,
}

impl Args {
    pub fn has_command(&self) -> bool {
        self.run || self.once || self.list.is_some() || self.status || self.config || self.init_config || self.check
    }
}
