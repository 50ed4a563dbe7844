//! Command line arguments.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Build the songplays star schema from raw song and log data")]
pub struct CliArgs {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Override the sink path from the configuration file
    #[arg(short, long)]
    pub output: Option<String>,
}
