//! Dataset index: the version-controlled manifest of expected files.
//!
//! An index maps each track id to its files, keyed by role name
//! (`"audio"`, `"annotation"`, ...). The on-disk format is a JSON object:
//!
//! ```text
//! {
//!   "t1": {
//!     "audio": ["audio/t1.wav", "5d41402abc4b2a76b9719d911017c592"],
//!     "annotation": [null, null]
//!   }
//! }
//! ```
//!
//! Paths are relative to a dataset's data_home and kept verbatim: no case
//! folding and no separator normalization. Track ids and roles keep the
//! order they have in the JSON document, so reports and re-written indexes
//! follow the publisher's ordering.

mod builder;

pub use builder::build_index;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// One file slot of a track: a relative path and its recorded checksum.
///
/// A `None` path means the file does not exist for this track. That is
/// different from a file that simply has not been downloaded yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(Option<String>, Option<String>)", into = "(Option<String>, Option<String>)")]
pub struct FileEntry {
    /// Path relative to data_home
    pub path: Option<String>,
    /// Recorded hex digest
    pub checksum: Option<String>,
}

impl FileEntry {
    /// An entry for a file that exists.
    pub fn new(path: impl Into<String>, checksum: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            checksum: Some(checksum.into()),
        }
    }

    /// An entry for a role this track has no file for.
    pub fn absent() -> Self {
        Self {
            path: None,
            checksum: None,
        }
    }

    /// Resolve the path against a data_home.
    pub fn resolve(&self, data_home: &Path) -> Option<PathBuf> {
        self.path.as_ref().map(|p| data_home.join(p))
    }
}

impl From<(Option<String>, Option<String>)> for FileEntry {
    fn from((path, checksum): (Option<String>, Option<String>)) -> Self {
        Self { path, checksum }
    }
}

impl From<FileEntry> for (Option<String>, Option<String>) {
    fn from(entry: FileEntry) -> Self {
        (entry.path, entry.checksum)
    }
}

/// All files of one track, keyed by role, in index order.
pub type TrackEntry = IndexMap<String, FileEntry>;

/// Immutable track id -> files manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Index {
    tracks: IndexMap<String, TrackEntry>,
}

impl Index {
    /// Build an index from already-parsed records.
    pub fn from_tracks(tracks: IndexMap<String, TrackEntry>) -> Self {
        Self { tracks }
    }

    /// Parse an index from a JSON string.
    ///
    /// `origin` only names the source in error messages.
    pub fn from_json_str(json: &str, origin: &Path) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::parse(origin, e.to_string()))
    }

    /// Serialize back to the on-disk JSON shape.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::parse("<index>", format!("failed to serialize index: {}", e)))
    }

    /// Write the index to a file.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = self.to_json_string()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Track ids in index order.
    pub fn track_ids(&self) -> impl Iterator<Item = &str> {
        self.tracks.keys().map(String::as_str)
    }

    /// Files of one track.
    pub fn get(&self, track_id: &str) -> Option<&TrackEntry> {
        self.tracks.get(track_id)
    }

    /// Whether the track id is in the index.
    pub fn contains(&self, track_id: &str) -> bool {
        self.tracks.contains_key(track_id)
    }

    /// Iterate over `(track_id, files)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TrackEntry)> {
        self.tracks.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    /// Number of tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether the index has no tracks.
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Load an index from a JSON file.
///
/// # Errors
///
/// - [`Error::NotFound`] if the file does not exist
/// - [`Error::Parse`] if it is not valid JSON or not shaped like an index
pub fn load_index(path: &Path) -> Result<Index> {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::not_found(path));
        }
        Err(e) => return Err(e.into()),
    };
    let index = Index::from_json_str(&json, path)?;
    tracing::debug!(path = %path.display(), tracks = index.len(), "Loaded index");
    Ok(index)
}
