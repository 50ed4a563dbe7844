//! playlog CLI: one batch run from a YAML configuration file.

use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use playlog::{CliArgs, Config, Pipeline, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();

    let mut config = match Config::from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(output) = args.output {
        config.sink.path = output;
    }

    info!(
        catalog = %config.sources.catalog.path,
        events = %config.sources.events.path,
        output = %config.sink.path,
        "Starting playlog"
    );

    let pipeline = match Pipeline::from_config(&config).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to set up pipeline: {e}");
            return ExitCode::FAILURE;
        }
    };

    match pipeline.run().await {
        Ok(summary) => {
            for table in &summary.tables {
                info!(
                    table = %table.table,
                    rows = table.rows,
                    files = table.files,
                    "Table written"
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Pipeline failed: {e}");
            ExitCode::FAILURE
        }
    }
}
