use std::path::PathBuf;

use clap::Parser;

use crate::Commands;

/// Main CLI application arguments and command structure
#[derive(Parser)]
#[clap(
    name = "notepad",
    version,
    about = "Notes and to-do tracker with reminders"
)]
pub struct Cli {
    /// Path to the configuration file
    #[clap(short = 'c', long, value_parser)]
    pub config: Option<PathBuf>,

    /// Directory holding notes, tasks and settings
    #[clap(long, value_parser)]
    pub data_dir: Option<PathBuf>,

    /// PIN for the app lock and locked notes (prompted for when omitted)
    #[clap(short, long, env = "NOTEPAD_PIN", hide_env_values = true)]
    pub pin: Option<String>,

    /// Verbose output mode
    #[clap(short, long)]
    pub verbose: bool,

    /// Subcommands for the notepad application
    #[clap(subcommand)]
    pub command: Commands,
}
