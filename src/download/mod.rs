//! Best-effort bulk download of dataset resources.
//!
//! Each [`RemoteFile`] is fetched over HTTP, checked against its published
//! checksum, and extracted into the data_home. Remotes are processed one at
//! a time and the first failure aborts the rest. There is no resume: an
//! interrupted transfer is discarded and fetched again next time.
//!
//! # Flow
//!
//! ```text
//! 1. Skip the remote if it is already present (unless forced)
//! 2. Stream the file into <target>.part
//! 3. Verify its checksum (MD5 or SHA-256, inferred from the digest)
//! 4. Rename <target>.part to <target>
//! 5. Extract archives into data_home/<destination_dir> and leave a marker
//! 6. Remove the archive if cleanup is enabled
//! ```
//!
//! A failure in steps 2-3 removes the `.part` file, so a broken transfer
//! never looks like a finished one.

mod extract;

pub use extract::{ArchiveKind, extract};

use futures::StreamExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::DownloadConfig;
use crate::error::{Error, Result, ResultExt};
use crate::validation::{ChecksumAlgorithm, compute_checksum};

/// Description of one downloadable resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Name the file is saved under
    pub filename: String,
    /// Source URL
    pub url: String,
    /// Published hex digest of the file
    pub checksum: String,
    /// Sub-directory of data_home to extract into; `None` = data_home itself
    pub destination_dir: Option<String>,
}

impl RemoteFile {
    pub fn new(
        filename: impl Into<String>,
        url: impl Into<String>,
        checksum: impl Into<String>,
        destination_dir: Option<&str>,
    ) -> Self {
        Self {
            filename: filename.into(),
            url: url.into(),
            checksum: checksum.into(),
            destination_dir: destination_dir.map(str::to_string),
        }
    }

    /// Build a descriptor from a URL, naming the file after the last path
    /// segment (query string dropped).
    pub fn from_url(url: &str, checksum: impl Into<String>, destination_dir: Option<&str>) -> Result<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let filename = path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty() && !name.contains(':'))
            .ok_or_else(|| Error::download(format!("cannot derive a file name from {}", url)))?;
        Ok(Self::new(filename, url, checksum, destination_dir))
    }

    /// Container type of the downloaded file.
    pub fn kind(&self) -> ArchiveKind {
        ArchiveKind::from_filename(&self.filename)
    }

    /// Directory the remote's content ends up in.
    pub fn destination(&self, data_home: &Path) -> PathBuf {
        match &self.destination_dir {
            Some(dir) => data_home.join(dir),
            None => data_home.to_path_buf(),
        }
    }

    /// Marker written to data_home once the archive has been extracted.
    pub fn extraction_marker(&self, data_home: &Path) -> PathBuf {
        data_home.join(format!(".{}.extracted", self.filename))
    }

    /// Whether the remote's content is already on disk.
    ///
    /// Plain files count as present when the file exists. Archives count as
    /// present once they were extracted completely, which leaves an
    /// [`extraction_marker`](Self::extraction_marker) behind.
    pub fn is_present(&self, data_home: &Path) -> bool {
        if self.kind().is_archive() {
            self.extraction_marker(data_home).exists()
        } else {
            self.destination(data_home).join(&self.filename).exists()
        }
    }
}

/// Sequential HTTP downloader.
pub struct Downloader {
    client: reqwest::Client,
    config: DownloadConfig,
}

impl Downloader {
    /// Create a downloader with the given settings.
    pub fn new(config: &DownloadConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::download(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Download and unpack every remote into `data_home`, blocking until done.
    pub fn download_all(&self, data_home: &Path, remotes: &[RemoteFile], force_overwrite: bool) -> Result<()> {
        if remotes.is_empty() {
            return Ok(());
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(async {
            for remote in remotes {
                self.download_remote(data_home, remote, force_overwrite).await?;
            }
            Ok(())
        })
    }

    /// Download, verify and unpack one remote.
    pub async fn download_remote(&self, data_home: &Path, remote: &RemoteFile, force_overwrite: bool) -> Result<()> {
        if !force_overwrite && remote.is_present(data_home) {
            info!(
                target: "download",
                file = %remote.filename,
                destination = %remote.destination(data_home).display(),
                "Already present, skipping (use force_overwrite to replace)"
            );
            return Ok(());
        }

        std::fs::create_dir_all(data_home)
            .with_context(format!("creating {}", data_home.display()))?;

        let kind = remote.kind();
        let marker = remote.extraction_marker(data_home);
        if kind.is_archive() {
            discard(&marker);
        }
        let download_path = if kind.is_archive() {
            data_home.join(&remote.filename)
        } else {
            let destination = remote.destination(data_home);
            std::fs::create_dir_all(&destination)?;
            destination.join(&remote.filename)
        };

        let partial = partial_path(&download_path);
        let fetched = match self.fetch(&remote.url, &partial).await {
            Ok(_) => verify_download(&partial, &remote.checksum),
            Err(e) => Err(e),
        };
        if let Err(e) = fetched {
            discard(&partial);
            return Err(e);
        }
        std::fs::rename(&partial, &download_path)
            .with_context(format!("moving {} into place", partial.display()))?;

        if kind.is_archive() {
            extract(&download_path, &remote.destination(data_home), kind)?;
            std::fs::write(&marker, &remote.checksum)
                .with_context(format!("writing {}", marker.display()))?;
            if self.config.cleanup_archives {
                if let Err(e) = std::fs::remove_file(&download_path) {
                    warn!(target: "download", path = %download_path.display(), error = %e, "Could not remove archive");
                }
            }
        }
        info!(target: "download", file = %remote.filename, "Download complete");
        Ok(())
    }

    /// Stream `url` into `target`, retrying the connection with backoff.
    pub async fn fetch(&self, url: &str, target: &Path) -> Result<u64> {
        info!(target: "download", url, "Downloading");

        let mut response = None;
        let attempts = self.config.retry_attempts.max(1);
        for attempt in 1..=attempts {
            match self.client.get(url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    response = Some(resp);
                    break;
                }
                Ok(resp) => {
                    warn!(target: "download", attempt, status = %resp.status(), "Download attempt failed");
                    if attempt == attempts {
                        return Err(Error::download(format!("{} returned {}", url, resp.status())));
                    }
                }
                Err(e) => {
                    warn!(target: "download", attempt, error = %e, "Download attempt failed");
                    if attempt == attempts {
                        return Err(Error::download(format!(
                            "{} unreachable after {} attempts: {}",
                            url, attempt, e
                        )));
                    }
                }
            }
            tokio::time::sleep(std::time::Duration::from_secs(2u64.pow(attempt))).await;
        }
        let response = response.ok_or_else(|| Error::download(format!("no response from {}", url)))?;

        let total_size = response.content_length();
        let mut file = std::fs::File::create(target)
            .with_context(format!("creating {}", target.display()))?;
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::download(format!("error reading {}: {}", url, e)))?;
            file.write_all(&chunk)?;
            downloaded += chunk.len() as u64;
        }
        file.flush()?;

        debug!(target: "download", bytes = downloaded, expected = ?total_size, "Transfer finished");
        if let Some(expected) = total_size {
            if expected != downloaded {
                return Err(Error::download(format!(
                    "truncated transfer from {}: {} of {} bytes",
                    url, downloaded, expected
                )));
            }
        }
        Ok(downloaded)
    }
}

/// `<path>.part`, the name a transfer streams into.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

/// Remove a leftover file; a file that is already gone is fine.
fn discard(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(target: "download", path = %path.display(), "Removed leftover file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(target: "download", path = %path.display(), error = %e, "Could not remove leftover file"),
    }
}

/// Check a freshly downloaded file; remove it if it does not match.
pub fn verify_download(path: &Path, expected: &str) -> Result<()> {
    let algorithm = ChecksumAlgorithm::infer(expected).ok_or_else(|| {
        Error::download(format!("'{}' is not an MD5 or SHA-256 digest", expected))
    })?;
    let actual = compute_checksum(path, algorithm)?;
    if actual.eq_ignore_ascii_case(expected) {
        return Ok(());
    }

    if let Err(e) = std::fs::remove_file(path) {
        warn!(target: "download", path = %path.display(), error = %e, "Could not remove corrupt download");
    }
    Err(Error::ChecksumMismatch {
        path: path.to_path_buf(),
        expected: expected.to_string(),
        actual,
    })
}

/// Download `remotes` into `data_home` with the given settings.
pub fn download_remotes(
    data_home: &Path,
    remotes: &[RemoteFile],
    force_overwrite: bool,
    config: &DownloadConfig,
) -> Result<()> {
    Downloader::new(config)?.download_all(data_home, remotes, force_overwrite)
}
