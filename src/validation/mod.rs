//! Checksum validation of a local dataset copy against its index.
//!
//! Validation is read-only and never fails: missing and corrupt files are
//! returned as data in a [`ValidationReport`]. Partial local copies are
//! normal, so callers decide what a discrepancy means.
//!
//! # Example
//!
//! ```ignore
//! use mir_datasets::validation::validate;
//!
//! let report = validate(&index, Path::new("/data/Orchset"), false);
//! if !report.is_valid() {
//!     println!("{} missing, {} corrupt", report.missing_files.len(), report.invalid_checksums.len());
//! }
//! ```

mod checksum;

pub use checksum::{ChecksumAlgorithm, checksum_matches, compute_checksum};

use std::path::Path;
use tracing::{info, warn};

use crate::index::Index;

/// Discrepancies between an index and a data_home.
///
/// Both lists hold index-relative paths in index order (track id, then
/// role), which is the order of the index's JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Indexed paths absent on disk
    pub missing_files: Vec<String>,
    /// Indexed paths present on disk whose checksum does not match
    pub invalid_checksums: Vec<String>,
}

impl ValidationReport {
    /// No missing and no corrupt files.
    pub fn is_valid(&self) -> bool {
        self.missing_files.is_empty() && self.invalid_checksums.is_empty()
    }

    /// Split into `(missing_files, invalid_checksums)`.
    pub fn into_parts(self) -> (Vec<String>, Vec<String>) {
        (self.missing_files, self.invalid_checksums)
    }
}

/// Validate every indexed file under `data_home`.
///
/// Entries with a `null` path are skipped. A present file is hashed with the
/// algorithm implied by its recorded checksum; a file that cannot be read, or
/// whose recorded checksum is `null` or malformed, counts as invalid.
///
/// When `silence` is false a summary is logged. Logging never changes the
/// returned report.
pub fn validate(index: &Index, data_home: &Path, silence: bool) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut checked = 0usize;

    for (track_id, files) in index.iter() {
        for (role, entry) in files {
            let Some(relative) = entry.path.as_deref() else {
                continue;
            };
            checked += 1;

            let full_path = data_home.join(relative);
            if !full_path.exists() {
                report.missing_files.push(relative.to_string());
                continue;
            }

            let matches = match entry.checksum.as_deref() {
                Some(expected) => match checksum_matches(&full_path, expected) {
                    Ok(matches) => matches,
                    Err(e) => {
                        warn!(
                            target: "validation",
                            track_id,
                            role = %role,
                            path = %full_path.display(),
                            error = %e,
                            "Could not hash file"
                        );
                        false
                    }
                },
                None => false,
            };
            if !matches {
                report.invalid_checksums.push(relative.to_string());
            }
        }
    }

    if !silence {
        log_report(&report, data_home, checked);
    }
    report
}

fn log_report(report: &ValidationReport, data_home: &Path, checked: usize) {
    if report.is_valid() {
        info!(
            target: "validation",
            data_home = %data_home.display(),
            files = checked,
            "Success: the dataset is complete and valid"
        );
        return;
    }

    for path in &report.missing_files {
        warn!(target: "validation", path = %path, "Missing file");
    }
    for path in &report.invalid_checksums {
        warn!(target: "validation", path = %path, "Invalid checksum");
    }
    warn!(
        target: "validation",
        data_home = %data_home.display(),
        files = checked,
        missing = report.missing_files.len(),
        invalid = report.invalid_checksums.len(),
        "Dataset is incomplete or contains corrupt files"
    );
}
