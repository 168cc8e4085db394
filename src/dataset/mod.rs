//! Dataset facade: index, validation, metadata and tracks tied together.
//!
//! Each bundled dataset is a [`DatasetSpec`] implementation supplying its
//! naming, decoders and download descriptors. [`Dataset`] wraps a spec
//! with its index and metadata cache and exposes the public operations:
//! `load`, `validate`, `track_ids`, `download` and `cite`.
//!
//! # Example
//!
//! ```ignore
//! use mir_datasets::dataset::{Dataset, Orchset};
//!
//! let orchset = Dataset::open(Orchset::new(), Path::new("indexes/orchset_index.json"))?;
//! orchset.download(None, false)?;
//! for (track_id, track) in orchset.load(None, false)? {
//!     if let Some(melody) = track.annotation()? {
//!         println!("{}: {} frames", track_id, melody.len());
//!     }
//! }
//! ```

mod event;
mod medleydb_melody;
mod orchset;
mod rwc_jazz;

pub use event::EventDataset;
pub use medleydb_melody::{Melody, MedleyDbMelody, MedleyDbMelodyMetadata};
pub use orchset::{Orchset, OrchsetMetadata};
pub use rwc_jazz::{RwcJazz, RwcJazzAnnotation, RwcJazzMetadata};

use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::audio::AudioOptions;
use crate::config::{Config, DownloadConfig};
use crate::download::{RemoteFile, download_remotes};
use crate::error::{Error, Result, ResultExt};
use crate::index::{Index, load_index};
use crate::metadata::{Metadata, MetadataCache};
use crate::track::Track;
use crate::validation::{ValidationReport, validate};

/// Capabilities a dataset supplies to the generic loader.
pub trait DatasetSpec: Send + Sync + 'static {
    /// Per-track metadata record
    type Metadata: Clone + fmt::Debug + Send + Sync + 'static;
    /// Decoded primary annotation
    type Annotation: fmt::Debug + Send + Sync + 'static;

    /// Display name, also used in error messages.
    fn name(&self) -> &str;

    /// Directory name under the data root.
    fn dir_name(&self) -> &str;

    /// Citation text printed by `cite`.
    fn citation(&self) -> &str;

    /// Files fetched by `download`.
    fn remotes(&self) -> &[RemoteFile] {
        &[]
    }

    /// Manual download instructions for data that cannot be fetched.
    fn download_info(&self, _data_home: &Path) -> Option<String> {
        None
    }

    /// Index role of the primary audio file.
    fn audio_role(&self) -> &str {
        "audio"
    }

    /// Index role of the primary annotation file.
    fn annotation_role(&self) -> &str {
        "annotation"
    }

    fn audio_options(&self) -> AudioOptions {
        AudioOptions::default()
    }

    /// Short description of the annotation type for `Display`.
    fn annotation_summary(&self) -> String;

    /// Metadata field names shown by a track's `Display`.
    fn metadata_fields(&self, record: Option<&Self::Metadata>) -> Vec<String>;

    /// Decode the annotation file of `role`; `Ok(None)` if it does not exist.
    fn load_annotation(&self, role: &str, path: &Path) -> Result<Option<Self::Annotation>>;

    /// Parse the dataset's metadata file(s) under `data_home`.
    ///
    /// Returns [`Error::NotFound`] when the metadata file is absent.
    fn load_metadata(&self, data_home: &Path) -> Result<HashMap<String, Self::Metadata>>;

    /// Post-process the data_home after remotes were fetched.
    fn after_download(&self, _data_home: &Path) -> Result<()> {
        Ok(())
    }
}

/// A dataset: spec, index and metadata cache.
pub struct Dataset<D: DatasetSpec> {
    spec: Arc<D>,
    index: Arc<Index>,
    metadata: Arc<MetadataCache<D::Metadata>>,
    data_root: PathBuf,
    download_config: DownloadConfig,
}

impl<D: DatasetSpec> Dataset<D> {
    /// Create a dataset with default configuration.
    pub fn new(spec: D, index: Index) -> Self {
        let config = Config::default();
        Self {
            spec: Arc::new(spec),
            index: Arc::new(index),
            metadata: Arc::new(MetadataCache::new()),
            data_root: config.storage.data_root(),
            download_config: config.download,
        }
    }

    /// Create a dataset from an index file on disk.
    pub fn open(spec: D, index_path: &Path) -> Result<Self> {
        let index = load_index(index_path).with_context(format!("opening {} index", spec.name()))?;
        Ok(Self::new(spec, index))
    }

    /// Apply storage and download settings.
    pub fn with_config(mut self, config: &Config) -> Self {
        self.data_root = config.storage.data_root();
        self.download_config = config.download.clone();
        self
    }

    /// Share a metadata cache with other handles on the same dataset.
    pub fn with_metadata_cache(mut self, cache: Arc<MetadataCache<D::Metadata>>) -> Self {
        self.metadata = cache;
        self
    }

    pub fn name(&self) -> &str {
        self.spec.name()
    }

    pub fn spec(&self) -> &D {
        &self.spec
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn metadata_cache(&self) -> &Arc<MetadataCache<D::Metadata>> {
        &self.metadata
    }

    /// `<data_root>/<dir_name>`
    pub fn default_data_home(&self) -> PathBuf {
        self.data_root.join(self.spec.dir_name())
    }

    fn resolve_data_home(&self, data_home: Option<&Path>) -> PathBuf {
        data_home
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.default_data_home())
    }

    /// Track ids in index order.
    pub fn track_ids(&self) -> Vec<String> {
        self.index.track_ids().map(str::to_string).collect()
    }

    /// Build one track.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTrackId`] if `track_id` is not in the index.
    pub fn track(&self, track_id: &str, data_home: Option<&Path>) -> Result<Track<D>> {
        let entry = self
            .index
            .get(track_id)
            .ok_or_else(|| Error::invalid_track_id(self.spec.name(), track_id))?;
        let data_home = self.resolve_data_home(data_home);
        let metadata = self.metadata_for_tracks(&data_home);
        Ok(Track::new(
            Arc::clone(&self.spec),
            track_id,
            &data_home,
            entry,
            metadata.as_deref(),
        ))
    }

    /// Validate the local copy, then build every track, in index order.
    ///
    /// The validation report is only logged; missing or corrupt files do
    /// not prevent tracks from being built.
    pub fn load(
        &self,
        data_home: Option<&Path>,
        silence_validator: bool,
    ) -> Result<IndexMap<String, Track<D>>> {
        let data_home = self.resolve_data_home(data_home);
        validate(&self.index, &data_home, silence_validator);

        let metadata = self.metadata_for_tracks(&data_home);
        let tracks: IndexMap<_, _> = self
            .index
            .iter()
            .map(|(track_id, entry)| {
                let track = Track::new(
                    Arc::clone(&self.spec),
                    track_id,
                    &data_home,
                    entry,
                    metadata.as_deref(),
                );
                (track_id.to_string(), track)
            })
            .collect();

        info!(target: "dataset", dataset = self.spec.name(), tracks = tracks.len(), "Loaded dataset");
        Ok(tracks)
    }

    /// Compare the local copy against the index.
    pub fn validate(&self, data_home: Option<&Path>, silence: bool) -> ValidationReport {
        validate(&self.index, &self.resolve_data_home(data_home), silence)
    }

    /// Dataset metadata for `data_home`, reloading if the cache holds
    /// another data_home.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the metadata file is absent.
    pub fn metadata(&self, data_home: Option<&Path>) -> Result<Arc<Metadata<D::Metadata>>> {
        let data_home = self.resolve_data_home(data_home);
        self.metadata
            .get_or_load(&data_home, |home| self.spec.load_metadata(home))
    }

    /// Metadata for track construction; unavailable metadata is not an error.
    fn metadata_for_tracks(&self, data_home: &Path) -> Option<Arc<Metadata<D::Metadata>>> {
        match self.metadata(Some(data_home)) {
            Ok(metadata) => Some(metadata),
            Err(e) if e.is_not_found() => {
                info!(target: "metadata", dataset = self.spec.name(), "{}", e);
                None
            }
            Err(e) => {
                warn!(target: "metadata", dataset = self.spec.name(), error = %e, "Metadata unavailable");
                None
            }
        }
    }

    /// Fetch and unpack the dataset's remotes into `data_home`.
    ///
    /// Datasets that cannot be fetched print their access instructions.
    pub fn download(&self, data_home: Option<&Path>, force_overwrite: bool) -> Result<()> {
        let data_home = self.resolve_data_home(data_home);

        if let Some(message) = self.spec.download_info(&data_home) {
            info!(target: "download", dataset = self.spec.name(), "Manual download required");
            println!("{}", message);
        }

        let remotes = self.spec.remotes();
        if remotes.is_empty() {
            debug!(target: "download", dataset = self.spec.name(), "No remote files");
            return Ok(());
        }

        download_remotes(&data_home, remotes, force_overwrite, &self.download_config)
            .with_context(format!("downloading {}", self.spec.name()))?;
        self.spec.after_download(&data_home)?;

        // Metadata files may have changed on disk.
        self.metadata.clear();
        Ok(())
    }

    pub fn citation(&self) -> &str {
        self.spec.citation()
    }

    /// Print the citation.
    pub fn cite(&self) {
        println!("{}", self.spec.citation());
    }
}

impl<D: DatasetSpec> fmt::Debug for Dataset<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("name", &self.spec.name())
            .field("tracks", &self.index.len())
            .field("data_root", &self.data_root)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::FileEntry;
    use crate::test_utils::{http_ok, index_of, md5_hex, serve_http, zip_bytes};
    use tempfile::tempdir;

    fn example_index() -> Index {
        index_of(&[(
            "t1",
            &[
                ("audio", FileEntry::new("audio/t1.wav", "abc123")),
                ("annotation", FileEntry::absent()),
            ],
        )])
    }

    fn example() -> Dataset<EventDataset> {
        Dataset::new(EventDataset::new("Example", "Example"), example_index())
    }

    #[test]
    fn test_example_scenario() {
        let dir = tempdir().unwrap();
        let dataset = example();

        let report = dataset.validate(Some(dir.path()), true);
        assert_eq!(report.missing_files, ["audio/t1.wav"]);
        assert!(report.invalid_checksums.is_empty());

        let track = dataset.track("t1", Some(dir.path())).unwrap();
        assert!(track.annotation().unwrap().is_none());
    }

    #[test]
    fn test_load_builds_every_track_despite_missing_files() {
        let dir = tempdir().unwrap();
        let index = index_of(&[
            ("a", &[("audio", FileEntry::new("a.wav", md5_hex(b"a")))]),
            ("b", &[("audio", FileEntry::new("b.wav", md5_hex(b"b")))]),
            ("c", &[("audio", FileEntry::absent())]),
        ]);
        let dataset = Dataset::new(EventDataset::new("Example", "Example"), index);

        let tracks = dataset.load(Some(dir.path()), true).unwrap();
        assert_eq!(tracks.keys().collect::<Vec<_>>(), ["a", "b", "c"]);
        assert_eq!(dataset.track_ids(), ["a", "b", "c"]);
        assert_eq!(tracks["b"].data_home(), dir.path());
    }

    #[test]
    fn test_validate_is_idempotent() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("audio")).unwrap();
        std::fs::write(dir.path().join("audio/t1.wav"), b"corrupt").unwrap();
        let dataset = example();

        let first = dataset.validate(Some(dir.path()), true);
        let second = dataset.validate(Some(dir.path()), false);
        assert_eq!(first, second);
        assert_eq!(first.invalid_checksums, ["audio/t1.wav"]);
        assert!(first.missing_files.is_empty());
    }

    #[test]
    fn test_metadata_follows_data_home() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        std::fs::write(a.path().join("metadata.json"), r#"{"t1": {"artist": "A"}}"#).unwrap();
        std::fs::write(b.path().join("metadata.json"), r#"{"t1": {"artist": "B"}}"#).unwrap();
        let dataset = example();

        let artist = |home: &Path| {
            let track = dataset.track("t1", Some(home)).unwrap();
            track.metadata().unwrap()["artist"].as_str().unwrap().to_string()
        };
        assert_eq!(artist(a.path()), "A");
        assert_eq!(artist(b.path()), "B");
        assert_eq!(artist(a.path()), "A");
        assert_eq!(dataset.metadata_cache().load_count(), 3);
    }

    #[test]
    fn test_missing_metadata_is_not_found_but_tracks_still_build() {
        let dir = tempdir().unwrap();
        let dataset = example();

        assert!(dataset.metadata(Some(dir.path())).unwrap_err().is_not_found());
        let track = dataset.track("t1", Some(dir.path())).unwrap();
        assert!(track.metadata().is_none());
    }

    #[test]
    fn test_shared_metadata_cache() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("metadata.json"), r#"{"t1": {}}"#).unwrap();
        let first = example();
        let second = example().with_metadata_cache(Arc::clone(first.metadata_cache()));

        first.metadata(Some(dir.path())).unwrap();
        second.metadata(Some(dir.path())).unwrap();
        assert_eq!(first.metadata_cache().load_count(), 1);
    }

    #[test]
    fn test_default_data_home_uses_config() {
        let mut config = Config::default();
        config.storage.data_root = Some(PathBuf::from("/corpora"));
        let dataset = example().with_config(&config);

        assert_eq!(dataset.default_data_home(), PathBuf::from("/corpora/Example"));
        let track = dataset.track("t1", None).unwrap();
        assert_eq!(track.audio_path(), Some(Path::new("/corpora/Example/audio/t1.wav")));
    }

    #[test]
    fn test_download_without_remotes_is_noop() {
        let dir = tempdir().unwrap();
        let dataset = Dataset::new(MedleyDbMelody::new(), Index::default());
        dataset.download(Some(dir.path()), false).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_open_missing_index() {
        let dir = tempdir().unwrap();
        let err = Dataset::open(Orchset::new(), &dir.path().join("nope.json")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_download_unpacks_flattens_and_refreshes_metadata() {
        const CSV_HEADER: &str = "excerpt,Predominant melodic instruments,Alternating melody,Contains winds,Contains strings,Contains brass,Only strings,Only winds,Only brass\n";
        let old_csv = format!("{}Beethoven-S3-I-ex1.wav,Strings,FALSE,FALSE,TRUE,FALSE,TRUE,FALSE,FALSE\n", CSV_HEADER);
        let new_csv = format!("{}Beethoven-S3-I-ex1.wav,Winds,TRUE,TRUE,FALSE,FALSE,FALSE,TRUE,FALSE\n", CSV_HEADER);

        let dir = tempdir().unwrap();
        let metadata_file = "Orchset - Predominant Melodic Instruments.csv";
        std::fs::write(dir.path().join(metadata_file), &old_csv).unwrap();

        let archive = zip_bytes(&[
            ("Orchset/Orchset - Predominant Melodic Instruments.csv", new_csv.as_bytes()),
            ("Orchset/GT/Beethoven-S3-I-ex1.mel", "0.0\t0\n0.01\t440.0\n".as_bytes()),
        ]);
        let base = serve_http(vec![http_ok(&archive)]);
        let remote = RemoteFile::new(
            "Orchset_dataset_0.zip",
            format!("{}/Orchset_dataset_0.zip", base),
            md5_hex(&archive),
            None,
        );
        let index = index_of(&[(
            "Beethoven-S3-I-ex1",
            &[("melody", FileEntry::new("GT/Beethoven-S3-I-ex1.mel", "0"))],
        )]);
        let mut config = Config::default();
        config.download = DownloadConfig {
            retry_attempts: 1,
            ..DownloadConfig::default()
        };
        let dataset = Dataset::new(Orchset::new().with_remotes(vec![remote.clone()]), index)
            .with_config(&config);

        let before = dataset.metadata(Some(dir.path())).unwrap();
        assert!(!before.get("Beethoven-S3-I-ex1").unwrap().alternating_melody);

        dataset.download(Some(dir.path()), false).unwrap();

        assert!(!dir.path().join("Orchset").exists(), "nested directory should be flattened");
        assert!(dir.path().join("GT/Beethoven-S3-I-ex1.mel").exists());
        assert!(!dir.path().join("Orchset_dataset_0.zip").exists());
        assert!(remote.is_present(dir.path()));

        let after = dataset.metadata(Some(dir.path())).unwrap();
        let record = after.get("Beethoven-S3-I-ex1").unwrap();
        assert!(record.alternating_melody);
        assert_eq!(record.predominant_melodic_instruments, ["winds"]);
        assert_eq!(dataset.metadata_cache().load_count(), 2);

        let track = dataset.track("Beethoven-S3-I-ex1", Some(dir.path())).unwrap();
        assert_eq!(track.annotation().unwrap().unwrap().frequencies(), [0.0, 440.0]);

        // Already present: no request is made, the server has closed.
        dataset.download(Some(dir.path()), false).unwrap();
    }
}
