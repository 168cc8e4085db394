//! Index generation from a local copy of a dataset.
//!
//! Walks a data_home, lets the caller decide which track and role each file
//! belongs to, and records a checksum per file.

use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{FileEntry, Index, TrackEntry};
use crate::error::{Error, Result};
use crate::validation::{ChecksumAlgorithm, compute_checksum};

/// Build an index by walking `data_home`.
///
/// `classify` receives each file's path relative to `data_home`, with `/`
/// separators, and returns the `(track_id, role)` it belongs to, or `None`
/// to leave the file out. Every track ends up with the same role keys:
/// roles seen for some tracks but not others are filled with
/// [`FileEntry::absent`]. Track ids and roles are written in sorted order.
///
/// # Errors
///
/// Fails if the directory cannot be walked, a file cannot be hashed, or two
/// files claim the same `(track_id, role)` slot.
pub fn build_index<F>(data_home: &Path, algorithm: ChecksumAlgorithm, mut classify: F) -> Result<Index>
where
    F: FnMut(&str) -> Option<(String, String)>,
{
    let mut tracks: IndexMap<String, TrackEntry> = IndexMap::new();
    let mut roles: BTreeSet<String> = BTreeSet::new();

    for entry in WalkDir::new(data_home).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            Error::Io(std::io::Error::other(format!(
                "failed to walk {}: {}",
                data_home.display(),
                e
            )))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(relative) = relative_path(data_home, entry.path()) else {
            continue;
        };
        let Some((track_id, role)) = classify(&relative) else {
            debug!(target: "index::build", path = %relative, "Skipping unclassified file");
            continue;
        };

        let checksum = compute_checksum(entry.path(), algorithm)?;
        let track = tracks.entry(track_id.clone()).or_default();
        if let Some(existing) = track.get(&role) {
            return Err(Error::parse(
                data_home,
                format!(
                    "track '{}' role '{}' claimed by both {} and {}",
                    track_id,
                    role,
                    existing.path.as_deref().unwrap_or("?"),
                    relative
                ),
            ));
        }
        track.insert(role.clone(), FileEntry::new(relative, checksum));
        roles.insert(role);
    }

    for track in tracks.values_mut() {
        for role in &roles {
            track.entry(role.clone()).or_insert_with(FileEntry::absent);
        }
        track.sort_keys();
    }
    tracks.sort_keys();

    info!(
        target: "index::build",
        root = %data_home.display(),
        tracks = tracks.len(),
        roles = roles.len(),
        "Built index"
    );
    Ok(Index::from_tracks(tracks))
}

/// Relative path with forward slashes, or `None` for non-UTF-8 names.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}
