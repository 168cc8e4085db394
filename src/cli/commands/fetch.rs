//! Download and citation commands.

use std::path::Path;

use mir_datasets::config::Config;
use mir_datasets::dataset::{Dataset, MedleyDbMelody, Orchset, RwcJazz};
use mir_datasets::download::{RemoteFile, download_remotes};
use mir_datasets::index::Index;

use super::BundledDataset;

/// Download and unpack one remote file
pub fn cmd_download(
    config: &Config,
    url: &str,
    checksum: &str,
    data_home: Option<&Path>,
    dest: Option<&str>,
    force: bool,
) -> anyhow::Result<()> {
    let remote = RemoteFile::from_url(url, checksum, dest)?;
    let data_home = data_home
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.storage.data_root());

    download_remotes(&data_home, &[remote.clone()], force, &config.download)?;
    println!(
        "{} -> {}",
        remote.filename,
        remote.destination(&data_home).display()
    );
    Ok(())
}

/// Download a bundled dataset into its data_home
pub fn cmd_fetch(
    config: &Config,
    dataset: BundledDataset,
    data_home: Option<&Path>,
    force: bool,
) -> anyhow::Result<()> {
    // Downloading needs no index.
    match dataset {
        BundledDataset::Orchset => Dataset::new(Orchset::new(), Index::default())
            .with_config(config)
            .download(data_home, force)?,
        BundledDataset::MedleydbMelody => Dataset::new(MedleyDbMelody::new(), Index::default())
            .with_config(config)
            .download(data_home, force)?,
        BundledDataset::RwcJazz => Dataset::new(RwcJazz::new(), Index::default())
            .with_config(config)
            .download(data_home, force)?,
    }
    Ok(())
}

/// Print the citation of a bundled dataset
pub fn cmd_cite(dataset: BundledDataset) -> anyhow::Result<()> {
    match dataset {
        BundledDataset::Orchset => Dataset::new(Orchset::new(), Index::default()).cite(),
        BundledDataset::MedleydbMelody => {
            Dataset::new(MedleyDbMelody::new(), Index::default()).cite()
        }
        BundledDataset::RwcJazz => Dataset::new(RwcJazz::new(), Index::default()).cite(),
    }
    Ok(())
}
