//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `index`: validation, track listing, index generation and checksums
//! - `fetch`: downloads and citations
//! - `settings`: the user configuration file

mod fetch;
mod index;
mod settings;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use mir_datasets::validation::ChecksumAlgorithm;

pub use fetch::{cmd_cite, cmd_download, cmd_fetch};
pub use index::{cmd_checksum, cmd_make_index, cmd_tracks, cmd_validate};
pub use settings::{cmd_config_set_data_root, cmd_config_show};

/// MIR dataset loader
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Bundled datasets
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BundledDataset {
    Orchset,
    MedleydbMelody,
    RwcJazz,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Check a local dataset copy against its index
    Validate {
        /// Path to the JSON index
        index: PathBuf,
        /// Dataset root (default: current directory)
        #[arg(long, default_value = ".")]
        data_home: PathBuf,
        /// Only print the report, no progress logging
        #[arg(short, long)]
        quiet: bool,
    },
    /// List the track ids of an index
    Tracks {
        /// Path to the JSON index
        index: PathBuf,
    },
    /// Generate an index from a local dataset copy
    MakeIndex {
        /// Dataset root to walk
        data_home: PathBuf,
        /// Where to write the JSON index
        #[arg(short, long)]
        out: PathBuf,
        /// Extension to role mapping, e.g. `wav=audio` (repeatable)
        #[arg(long = "role", value_name = "EXT=ROLE")]
        roles: Vec<String>,
        /// Checksum algorithm
        #[arg(long, default_value = "md5")]
        algorithm: ChecksumAlgorithm,
    },
    /// Print the checksum of a file
    Checksum {
        /// File to hash
        file: PathBuf,
        /// Checksum algorithm
        #[arg(long, default_value = "md5")]
        algorithm: ChecksumAlgorithm,
    },
    /// Download and unpack a single remote file
    Download {
        /// Source URL
        url: String,
        /// Expected MD5 or SHA-256 digest
        checksum: String,
        /// Dataset root (default: data root from config)
        #[arg(long)]
        data_home: Option<PathBuf>,
        /// Sub-directory of data_home to extract into
        #[arg(long)]
        dest: Option<String>,
        /// Replace existing files
        #[arg(long)]
        force: bool,
    },
    /// Download a bundled dataset
    Fetch {
        dataset: BundledDataset,
        /// Dataset root (default: <data root>/<dataset>)
        #[arg(long)]
        data_home: Option<PathBuf>,
        /// Replace existing files
        #[arg(long)]
        force: bool,
    },
    /// Print the citation of a bundled dataset
    Cite { dataset: BundledDataset },
    /// Show or change the user configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the config file path and effective settings
    Show,
    /// Set the directory that holds every dataset by default
    SetDataRoot { dir: PathBuf },
}

/// Run the parsed command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let config = mir_datasets::config::load();

    match &cli.command {
        Commands::Validate {
            index,
            data_home,
            quiet,
        } => cmd_validate(index, data_home, *quiet),
        Commands::Tracks { index } => cmd_tracks(index),
        Commands::MakeIndex {
            data_home,
            out,
            roles,
            algorithm,
        } => cmd_make_index(data_home, out, roles, *algorithm),
        Commands::Checksum { file, algorithm } => cmd_checksum(file, *algorithm),
        Commands::Download {
            url,
            checksum,
            data_home,
            dest,
            force,
        } => cmd_download(
            &config,
            url,
            checksum,
            data_home.as_deref(),
            dest.as_deref(),
            *force,
        ),
        Commands::Fetch {
            dataset,
            data_home,
            force,
        } => cmd_fetch(&config, *dataset, data_home.as_deref(), *force),
        Commands::Cite { dataset } => cmd_cite(*dataset),
        Commands::Config { action } => match action {
            ConfigAction::Show => cmd_config_show(&config),
            ConfigAction::SetDataRoot { dir } => cmd_config_set_data_root(&config, dir),
        },
    }
}
