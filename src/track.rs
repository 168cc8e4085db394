//! Per-track view over a dataset's files.
//!
//! A [`Track`] resolves its index entry against a data_home and exposes two
//! kinds of lazy field:
//!
//! - **annotation**: decoded on first access, then kept for the lifetime of
//!   the track. Later changes to the file are not observed. Every annotation
//!   role of the index has its own cache slot.
//! - **audio**: decoded from disk on every access and never kept, so a large
//!   corpus can be walked without holding every waveform in memory.
//!
//! Tracks are created through [`Dataset::track`](crate::dataset::Dataset::track)
//! or [`Dataset::load`](crate::dataset::Dataset::load).

use indexmap::IndexMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::audio::{AudioData, AudioOptions, load_audio};
use crate::dataset::DatasetSpec;
use crate::error::Result;
use crate::index::TrackEntry;
use crate::metadata::Metadata;

/// One recording of a dataset, bound to a data_home.
pub struct Track<D: DatasetSpec> {
    track_id: String,
    data_home: PathBuf,
    spec: Arc<D>,
    paths: IndexMap<String, Option<PathBuf>>,
    metadata: Option<D::Metadata>,
    annotations: IndexMap<String, OnceLock<Option<D::Annotation>>>,
}

impl<D: DatasetSpec> Track<D> {
    /// Bind an index entry to `data_home`.
    ///
    /// The caller has already checked that `track_id` is in the index.
    pub(crate) fn new(
        spec: Arc<D>,
        track_id: &str,
        data_home: &Path,
        entry: &TrackEntry,
        metadata: Option<&Metadata<D::Metadata>>,
    ) -> Self {
        let paths = entry
            .iter()
            .map(|(role, file)| (role.clone(), file.resolve(data_home)))
            .collect();
        let annotations = entry.keys().map(|role| (role.clone(), OnceLock::new())).collect();
        Self {
            track_id: track_id.to_string(),
            data_home: data_home.to_path_buf(),
            spec,
            paths,
            metadata: metadata.and_then(|m| m.get(track_id)).cloned(),
            annotations,
        }
    }

    pub fn track_id(&self) -> &str {
        &self.track_id
    }

    pub fn data_home(&self) -> &Path {
        &self.data_home
    }

    /// Role names declared for this track in the index.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(String::as_str)
    }

    /// Absolute path of a role's file; `None` for unknown roles and for
    /// roles whose index path is `null`.
    pub fn path(&self, role: &str) -> Option<&Path> {
        self.paths.get(role).and_then(|p| p.as_deref())
    }

    /// Path of the dataset's primary audio file.
    pub fn audio_path(&self) -> Option<&Path> {
        self.path(self.spec.audio_role())
    }

    /// Path of the dataset's primary annotation file.
    pub fn annotation_path(&self) -> Option<&Path> {
        self.path(self.spec.annotation_role())
    }

    /// This track's metadata record, if metadata was available when the
    /// track was created.
    pub fn metadata(&self) -> Option<&D::Metadata> {
        self.metadata.as_ref()
    }

    /// Primary annotation, decoded once and cached.
    ///
    /// `Ok(None)` when the index path is `null` or the file is absent. A
    /// decode error is returned and not cached, so the next call retries.
    pub fn annotation(&self) -> Result<Option<&D::Annotation>> {
        self.annotation_for(self.spec.annotation_role())
    }

    /// Annotation of any role, decoded once and cached like
    /// [`annotation`](Self::annotation). Roles missing from the index give
    /// `Ok(None)`.
    pub fn annotation_for(&self, role: &str) -> Result<Option<&D::Annotation>> {
        let Some(slot) = self.annotations.get(role) else {
            return Ok(None);
        };
        if let Some(cached) = slot.get() {
            return Ok(cached.as_ref());
        }
        let decoded = self.decode_annotation(role)?;
        Ok(slot.get_or_init(|| decoded).as_ref())
    }

    /// Whether the primary annotation has been decoded already.
    pub fn is_annotation_loaded(&self) -> bool {
        self.annotations
            .get(self.spec.annotation_role())
            .is_some_and(|slot| slot.get().is_some())
    }

    /// Decode the annotation file of any role, bypassing the cache.
    pub fn decode_annotation(&self, role: &str) -> Result<Option<D::Annotation>> {
        match self.path(role) {
            Some(path) => self.spec.load_annotation(role, path),
            None => Ok(None),
        }
    }

    /// Primary audio, read from disk on every call.
    ///
    /// `Ok(None)` when the index path is `null` or the file is absent.
    pub fn audio(&self) -> Result<Option<AudioData>> {
        self.audio_for_role(self.spec.audio_role(), self.spec.audio_options())
    }

    /// Audio of any role with explicit options, read from disk on every call.
    pub fn audio_for_role(&self, role: &str, options: AudioOptions) -> Result<Option<AudioData>> {
        match self.path(role) {
            Some(path) => load_audio(path, options),
            None => Ok(None),
        }
    }
}

impl<D: DatasetSpec> fmt::Display for Track<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let audio_path = self
            .audio_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "None".to_string());
        let fields = self.spec.metadata_fields(self.metadata.as_ref());
        write!(
            f,
            "{} Track(track_id={}, audio_path={}, metadata=[{}], {}={})",
            self.spec.name(),
            self.track_id,
            audio_path,
            fields.join(", "),
            self.spec.annotation_role(),
            self.spec.annotation_summary()
        )
    }
}

impl<D: DatasetSpec> fmt::Debug for Track<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Track")
            .field("dataset", &self.spec.name())
            .field("track_id", &self.track_id)
            .field("data_home", &self.data_home)
            .field("paths", &self.paths)
            .field("metadata", &self.metadata)
            .field("annotation_loaded", &self.is_annotation_loaded())
            .finish()
    }
}
