//! MIR Datasets command-line tool.
//!
//! Validates, indexes and downloads dataset copies. Logging goes through
//! `tracing`; set `RUST_LOG` to change verbosity.

mod cli;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Log targets shown at info level by default.
const LOG_TARGETS: [&str; 7] = [
    "mir_datasets",
    "config",
    "dataset",
    "download",
    "index",
    "metadata",
    "validation",
];

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    let mut filter = EnvFilter::from_default_env();
    for target in LOG_TARGETS {
        filter = filter.add_directive(format!("{}=info", target).parse()?);
    }
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    cli::run_command(&args)
}
