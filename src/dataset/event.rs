//! Generic dataset with event-list annotations and JSON metadata.

use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use super::DatasetSpec;
use crate::annotation::{EventData, load_events, read_optional};
use crate::audio::AudioOptions;
use crate::download::RemoteFile;
use crate::error::{Error, Result};

/// Metadata file read from the data_home unless overridden.
pub const DEFAULT_METADATA_FILE: &str = "metadata.json";

/// A dataset whose annotation files hold `start end label` rows and whose
/// metadata is a JSON object keyed by track id.
#[derive(Debug, Clone)]
pub struct EventDataset {
    name: String,
    dir_name: String,
    citation: String,
    audio_role: String,
    annotation_role: String,
    metadata_file: String,
    audio_options: AudioOptions,
    remotes: Vec<RemoteFile>,
}

impl EventDataset {
    pub fn new(name: impl Into<String>, dir_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dir_name: dir_name.into(),
            citation: String::new(),
            audio_role: "audio".to_string(),
            annotation_role: "annotation".to_string(),
            metadata_file: DEFAULT_METADATA_FILE.to_string(),
            audio_options: AudioOptions::default(),
            remotes: Vec::new(),
        }
    }

    /// Use other index roles for the primary audio and annotation files.
    pub fn with_roles(mut self, audio: impl Into<String>, annotation: impl Into<String>) -> Self {
        self.audio_role = audio.into();
        self.annotation_role = annotation.into();
        self
    }

    /// Metadata file, relative to the data_home.
    pub fn with_metadata_file(mut self, file: impl Into<String>) -> Self {
        self.metadata_file = file.into();
        self
    }

    pub fn with_citation(mut self, citation: impl Into<String>) -> Self {
        self.citation = citation.into();
        self
    }

    pub fn with_audio_options(mut self, options: AudioOptions) -> Self {
        self.audio_options = options;
        self
    }

    pub fn with_remotes(mut self, remotes: Vec<RemoteFile>) -> Self {
        self.remotes = remotes;
        self
    }
}

impl DatasetSpec for EventDataset {
    type Metadata = Value;
    type Annotation = EventData;

    fn name(&self) -> &str {
        &self.name
    }

    fn dir_name(&self) -> &str {
        &self.dir_name
    }

    fn citation(&self) -> &str {
        &self.citation
    }

    fn remotes(&self) -> &[RemoteFile] {
        &self.remotes
    }

    fn audio_role(&self) -> &str {
        &self.audio_role
    }

    fn annotation_role(&self) -> &str {
        &self.annotation_role
    }

    fn audio_options(&self) -> AudioOptions {
        self.audio_options
    }

    fn annotation_summary(&self) -> String {
        EventData::default().to_string()
    }

    fn metadata_fields(&self, record: Option<&Value>) -> Vec<String> {
        match record {
            Some(Value::Object(fields)) => fields.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    fn load_annotation(&self, _role: &str, path: &Path) -> Result<Option<EventData>> {
        load_events(path)
    }

    fn load_metadata(&self, data_home: &Path) -> Result<HashMap<String, Value>> {
        let path = data_home.join(&self.metadata_file);
        let contents = read_optional(&path)?.ok_or_else(|| Error::not_found(&path))?;
        serde_json::from_str(&contents).map_err(|e| Error::parse(&path, e.to_string()))
    }
}
