//! Clap derive structures for the `myuplink2mqtt` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// myuplink2mqtt -- publish myUplink device data to MQTT
#[derive(Debug, Parser)]
#[command(
    name = "myuplink2mqtt",
    version,
    about = "Bridge myUplink heat pump data to MQTT with Home Assistant discovery",
    long_about = "Polls the myUplink cloud API for device data points and republishes \
        them to an MQTT broker, announcing each parameter to Home Assistant \
        via MQTT discovery.",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct GlobalOpts {
    /// Suppress informational output (errors and warnings only)
    #[arg(long, short = 's', global = true, conflicts_with = "debug")]
    pub silent: bool,

    /// Verbose logging; MQTT publishing becomes a logged dry run
    #[arg(long, short = 'd', global = true)]
    pub debug: bool,

    /// Run a single poll cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    pub show_config: bool,

    /// Poll interval in seconds (overrides config file and environment)
    #[arg(long, short = 'p', value_name = "SECONDS")]
    pub poll: Option<u64>,

    /// Dump all API data to a JSON file and exit
    #[arg(
        long,
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = "/tmp/myuplink.json"
    )]
    pub save: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Remove retained discovery and state topics from the broker
    Clear(ClearArgs),
}

#[derive(Debug, Args)]
pub struct ClearArgs {
    /// Seconds to listen for retained messages before clearing
    #[arg(long, value_name = "SECONDS", default_value = "5")]
    pub scan_window: u64,

    /// List matching topics without clearing them
    #[arg(long)]
    pub dry_run: bool,
}
