//! CLI interface for poly-alert
//!
//! Provides subcommands for:
//! - `run`: Start the alert pipeline
//! - `parse`: Normalize captured feed frames
//! - `test-alert`: Send a sample alert
//! - `config`: Show the effective configuration

mod parse;
mod run;
mod test_alert;

pub use parse::{parse_frames, ParseArgs};
pub use run::{shutdown_signal, RunArgs};
pub use test_alert::{sample_payload, TestAlertArgs};

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "poly-alert")]
#[command(about = "Large-trade alerts for Polymarket, delivered to Telegram")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the alert pipeline
    Run(RunArgs),
    /// Normalize raw feed frames, one JSON message per line
    Parse(ParseArgs),
    /// Send a sample alert to verify Telegram credentials
    TestAlert(TestAlertArgs),
    /// Show the effective configuration
    Config,
}
