//! Archive extraction for downloaded dataset files.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{Error, Result, ResultExt};

/// Archive container, derived from a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
    Tar,
    /// Not an archive; the file is used as-is
    Plain,
}

impl ArchiveKind {
    /// Classify by file name suffix (case-insensitive).
    pub fn from_filename(filename: &str) -> Self {
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Self::Zip
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Self::TarGz
        } else if lower.ends_with(".tar") {
            Self::Tar
        } else {
            Self::Plain
        }
    }

    pub fn is_archive(&self) -> bool {
        !matches!(self, Self::Plain)
    }
}

/// Extract `archive_path` into `extract_dir`, overwriting existing files.
pub fn extract(archive_path: &Path, extract_dir: &Path, kind: ArchiveKind) -> Result<()> {
    tracing::info!(
        target: "download::extract",
        archive = %archive_path.display(),
        destination = %extract_dir.display(),
        "Extracting archive"
    );
    std::fs::create_dir_all(extract_dir)
        .with_context(format!("creating {}", extract_dir.display()))?;

    match kind {
        ArchiveKind::Zip => extract_zip(archive_path, extract_dir),
        ArchiveKind::TarGz => {
            let file = File::open(archive_path)?;
            let decoder = flate2::read::GzDecoder::new(BufReader::new(file));
            unpack_tar(tar::Archive::new(decoder), extract_dir)
        }
        ArchiveKind::Tar => {
            let file = File::open(archive_path)?;
            unpack_tar(tar::Archive::new(BufReader::new(file)), extract_dir)
        }
        ArchiveKind::Plain => Ok(()),
    }
}

fn extract_zip(archive_path: &Path, extract_dir: &Path) -> Result<()> {
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::download(format!("invalid zip archive: {}", e)))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::download(format!("failed to read zip entry {}: {}", i, e)))?;

        // Entries escaping the destination are skipped.
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(target: "download::extract", name = entry.name(), "Skipping unsafe zip entry");
            continue;
        };
        let outpath = extract_dir.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath)?;
            continue;
        }
        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&outpath)
            .with_context(format!("creating {}", outpath.display()))?;
        std::io::copy(&mut entry, &mut outfile)
            .with_context(format!("extracting {}", outpath.display()))?;
    }
    Ok(())
}

fn unpack_tar<R: std::io::Read>(mut archive: tar::Archive<R>, extract_dir: &Path) -> Result<()> {
    archive
        .unpack(extract_dir)
        .map_err(|e| Error::download(format!("failed to extract tarball: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{write_tar_gz, write_zip};
    use tempfile::tempdir;

    #[test]
    fn test_archive_kind_from_filename() {
        assert_eq!(ArchiveKind::from_filename("Orchset_dataset_0.zip"), ArchiveKind::Zip);
        assert_eq!(ArchiveKind::from_filename("MAPS.TAR"), ArchiveKind::Tar);
        assert_eq!(ArchiveKind::from_filename("audio.tar.gz"), ArchiveKind::TarGz);
        assert_eq!(ArchiveKind::from_filename("audio.tgz"), ArchiveKind::TarGz);
        assert_eq!(ArchiveKind::from_filename("rwc-j.csv"), ArchiveKind::Plain);
        assert!(!ArchiveKind::Plain.is_archive());
    }

    #[test]
    fn test_extract_zip() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("annotation.zip");
        write_zip(
            &archive,
            &[("annotation/t1.lab", "0 1 a\n".as_bytes()), ("README", "hi".as_bytes())],
        );

        let out = dir.path().join("out");
        extract(&archive, &out, ArchiveKind::Zip).unwrap();

        assert_eq!(std::fs::read(out.join("annotation/t1.lab")).unwrap(), b"0 1 a\n");
        assert_eq!(std::fs::read(out.join("README")).unwrap(), b"hi");
    }

    #[test]
    fn test_extract_tar_gz() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("audio.tar.gz");
        write_tar_gz(&archive, &[("audio/t1.wav", "RIFF".as_bytes())]);

        let out = dir.path().join("out");
        extract(&archive, &out, ArchiveKind::TarGz).unwrap();
        assert_eq!(std::fs::read(out.join("audio/t1.wav")).unwrap(), b"RIFF");
    }

    #[test]
    fn test_corrupt_zip_is_download_error() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("broken.zip");
        std::fs::write(&archive, b"PK but not really").unwrap();

        let err = extract(&archive, &dir.path().join("out"), ArchiveKind::Zip).unwrap_err();
        assert!(matches!(err, Error::Download(_)));
    }
}
