//! Command-line interface for mir-datasets.
//!
//! Thin front end over the library: index validation and generation,
//! checksums, downloads and citations.

mod commands;

pub use commands::{Cli, Commands, run_command};
