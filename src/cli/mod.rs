use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dlpgate")]
#[command(about = "DLP forward proxy - blocks form submissions carrying sensitive data")]
#[command(version)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "dlpgate.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the proxy server
    Start,
    /// Scan text with the configured rules
    Scan {
        /// Read text from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
        /// Print the scan result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the deny list and DLP rules
    Rules,
    /// Write the default configuration file
    Init,
}
