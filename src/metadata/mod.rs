//! Dataset-level metadata and its data_home-keyed cache.
//!
//! Metadata is loaded once per data_home and shared by every track built
//! for that data_home. The cache holds exactly one entry: asking for a
//! different data_home replaces it, and asking for the old one again
//! reloads it.
//!
//! # Concurrency
//!
//! The check ("is the cached data_home the requested one?") and the reload
//! happen under one lock, so two callers racing with different data_homes
//! can never observe a half-replaced entry.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

use crate::error::Result;

/// Per-track metadata records loaded for one data_home.
#[derive(Debug, Clone)]
pub struct Metadata<R> {
    data_home: PathBuf,
    records: HashMap<String, R>,
}

impl<R> Metadata<R> {
    /// Tag a set of records with the data_home they were loaded from.
    pub fn new(data_home: impl Into<PathBuf>, records: HashMap<String, R>) -> Self {
        Self {
            data_home: data_home.into(),
            records,
        }
    }

    /// The data_home these records belong to.
    pub fn data_home(&self) -> &Path {
        &self.data_home
    }

    /// Record for one track.
    pub fn get(&self, track_id: &str) -> Option<&R> {
        self.records.get(track_id)
    }

    /// Track ids that have a record.
    pub fn track_ids(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Single-slot metadata cache keyed by data_home.
///
/// Failed loads are not cached; the next request retries.
#[derive(Debug)]
pub struct MetadataCache<R> {
    slot: Mutex<Option<Arc<Metadata<R>>>>,
    loads: AtomicUsize,
}

impl<R> Default for MetadataCache<R> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
            loads: AtomicUsize::new(0),
        }
    }
}

impl<R> MetadataCache<R> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return metadata for `data_home`, loading it with `load` if the cache
    /// is empty or holds another data_home.
    ///
    /// # Errors
    ///
    /// Propagates the loader's error (typically [`Error::NotFound`] when the
    /// metadata file is absent). The cache is left empty in that case.
    ///
    /// [`Error::NotFound`]: crate::error::Error::NotFound
    pub fn get_or_load<F>(&self, data_home: &Path, load: F) -> Result<Arc<Metadata<R>>>
    where
        F: FnOnce(&Path) -> Result<HashMap<String, R>>,
    {
        let mut slot = self.slot.lock();
        if let Some(cached) = slot.as_ref() {
            if cached.data_home() == data_home {
                return Ok(Arc::clone(cached));
            }
            debug!(
                target: "metadata",
                cached = %cached.data_home().display(),
                requested = %data_home.display(),
                "data_home changed, reloading metadata"
            );
        }

        *slot = None;
        let metadata = Arc::new(self.load_into(data_home, load)?);
        *slot = Some(Arc::clone(&metadata));
        Ok(metadata)
    }

    /// Unconditionally reload metadata for `data_home`.
    pub fn reload<F>(&self, data_home: &Path, load: F) -> Result<Arc<Metadata<R>>>
    where
        F: FnOnce(&Path) -> Result<HashMap<String, R>>,
    {
        let mut slot = self.slot.lock();
        *slot = None;
        let metadata = Arc::new(self.load_into(data_home, load)?);
        *slot = Some(Arc::clone(&metadata));
        Ok(metadata)
    }

    /// data_home of the cached entry, if any.
    pub fn cached_data_home(&self) -> Option<PathBuf> {
        self.slot.lock().as_ref().map(|m| m.data_home().to_path_buf())
    }

    /// Whether the cache currently holds metadata for `data_home`.
    pub fn is_loaded_for(&self, data_home: &Path) -> bool {
        self.slot
            .lock()
            .as_ref()
            .is_some_and(|m| m.data_home() == data_home)
    }

    /// Drop the cached entry.
    pub fn clear(&self) {
        *self.slot.lock() = None;
    }

    /// How many times a loader has been invoked.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    fn load_into<F>(&self, data_home: &Path, load: F) -> Result<Metadata<R>>
    where
        F: FnOnce(&Path) -> Result<HashMap<String, R>>,
    {
        self.loads.fetch_add(1, Ordering::Relaxed);
        let records = load(data_home)?;
        info!(
            target: "metadata",
            data_home = %data_home.display(),
            records = records.len(),
            "Loaded metadata"
        );
        Ok(Metadata::new(data_home, records))
    }
}
