//! MedleyDB-Melody: melody F0 annotations for the MedleyDB multitracks.
//!
//! The audio is access-controlled, so `download` only prints instructions.
//! Index roles: `audio`, `melody1`, `melody2`, `melody3`. `melody1` is the
//! primary annotation. `melody3` holds every melodic voice, so it decodes
//! to [`MultiF0Data`] instead of a single contour.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use super::DatasetSpec;
use crate::annotation::{Delimiter, F0Data, MultiF0Data, Voicing, load_f0, load_multi_f0, read_optional};
use crate::error::{Error, Result};
use crate::track::Track;

pub const METADATA_FILE: &str = "medleydb_melody_metadata.json";

const FIELDS: [&str; 6] = [
    "artist",
    "title",
    "genre",
    "is_excerpt",
    "is_instrumental",
    "n_sources",
];

const CITATION: &str = r#"===========  MLA ===========
Bittner, Rachel, et al.
"MedleyDB: A multitrack dataset for annotation-intensive MIR research."
In Proceedings of the 15th International Society for Music Information Retrieval Conference (ISMIR). 2014.

========== Bibtex ==========
@inproceedings{bittner2014medleydb,
    Author = {Bittner, Rachel M and Salamon, Justin and Tierney, Mike and Mauch, Matthias and Cannam, Chris and Bello, Juan P},
    Booktitle = {International Society of Music Information Retrieval (ISMIR)},
    Month = {October},
    Title = {Medley{DB}: A Multitrack Dataset for Annotation-Intensive {MIR} Research},
    Year = {2014}
}"#;

/// Per-track record of `medleydb_melody_metadata.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedleyDbMelodyMetadata {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub genre: Option<String>,
    pub is_excerpt: Option<bool>,
    pub is_instrumental: Option<bool>,
    pub n_sources: Option<u32>,
}

/// A decoded melody file.
#[derive(Debug, Clone, PartialEq)]
pub enum Melody {
    /// `melody1` and `melody2`: one predominant contour
    Contour(F0Data),
    /// `melody3`: one frequency column per voice
    Voices(MultiF0Data),
}

impl Melody {
    pub fn contour(&self) -> Option<&F0Data> {
        match self {
            Self::Contour(contour) => Some(contour),
            Self::Voices(_) => None,
        }
    }

    pub fn voices(&self) -> Option<&MultiF0Data> {
        match self {
            Self::Voices(voices) => Some(voices),
            Self::Contour(_) => None,
        }
    }
}

impl fmt::Display for Melody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contour(contour) => contour.fmt(f),
            Self::Voices(voices) => voices.fmt(f),
        }
    }
}

/// The MedleyDB-Melody dataset.
#[derive(Debug, Clone, Default)]
pub struct MedleyDbMelody;

impl MedleyDbMelody {
    pub fn new() -> Self {
        Self
    }
}

impl DatasetSpec for MedleyDbMelody {
    type Metadata = MedleyDbMelodyMetadata;
    type Annotation = Melody;

    fn name(&self) -> &str {
        "MedleyDB-Melody"
    }

    fn dir_name(&self) -> &str {
        "MedleyDB-Melody"
    }

    fn citation(&self) -> &str {
        CITATION
    }

    fn download_info(&self, data_home: &Path) -> Option<String> {
        Some(format!(
            "To download this dataset, visit:\n\
             https://zenodo.org/record/2628782#.XKZdABNKh24\n\
             and request access.\n\n\
             Once downloaded, unzip the file MedleyDB-Melody.zip\n\
             and copy the result to:\n\
             {}",
            data_home.display()
        ))
    }

    fn annotation_role(&self) -> &str {
        "melody1"
    }

    fn annotation_summary(&self) -> String {
        F0Data::default().to_string()
    }

    fn metadata_fields(&self, _record: Option<&MedleyDbMelodyMetadata>) -> Vec<String> {
        FIELDS.iter().map(|f| f.to_string()).collect()
    }

    fn load_annotation(&self, role: &str, path: &Path) -> Result<Option<Melody>> {
        if role == "melody3" {
            return Ok(load_multi_f0(path, Delimiter::Comma)?.map(Melody::Voices));
        }
        Ok(load_f0(path, Delimiter::Comma, Voicing::PositiveFrequency)?.map(Melody::Contour))
    }

    fn load_metadata(&self, data_home: &Path) -> Result<HashMap<String, MedleyDbMelodyMetadata>> {
        let path = data_home.join(METADATA_FILE);
        let contents = read_optional(&path)?.ok_or_else(|| Error::not_found(&path))?;
        serde_json::from_str(&contents).map_err(|e| Error::parse(&path, e.to_string()))
    }
}

impl Track<MedleyDbMelody> {
    /// Melody of the single predominant source.
    pub fn melody1(&self) -> Result<Option<&F0Data>> {
        Ok(self.annotation_for("melody1")?.and_then(Melody::contour))
    }

    /// Melody across every predominant source.
    pub fn melody2(&self) -> Result<Option<&F0Data>> {
        Ok(self.annotation_for("melody2")?.and_then(Melody::contour))
    }

    /// Every melodic voice, one frequency column each.
    pub fn melody3(&self) -> Result<Option<&MultiF0Data>> {
        Ok(self.annotation_for("melody3")?.and_then(Melody::voices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::index::FileEntry;
    use crate::test_utils::index_of;
    use tempfile::tempdir;

    const TRACK: &str = "MusicDelta_Beethoven";

    fn dataset() -> Dataset<MedleyDbMelody> {
        let index = index_of(&[(
            TRACK,
            &[
                ("audio", FileEntry::new("audio/MusicDelta_Beethoven_MIX.wav", "0")),
                ("melody1", FileEntry::new("melody1/MusicDelta_Beethoven_MELODY1.csv", "0")),
                ("melody2", FileEntry::new("melody2/MusicDelta_Beethoven_MELODY2.csv", "0")),
                ("melody3", FileEntry::absent()),
            ],
        )]);
        Dataset::new(MedleyDbMelody::new(), index)
    }

    #[test]
    fn test_track_fields() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(METADATA_FILE),
            r#"{"MusicDelta_Beethoven": {"artist": "MusicDelta", "title": "Beethoven",
                "genre": "Classical", "is_excerpt": true, "is_instrumental": true,
                "n_sources": 18, "audio_path": "ignored"}}"#,
        )
        .unwrap();
        std::fs::create_dir_all(dir.path().join("melody1")).unwrap();
        std::fs::write(
            dir.path().join("melody1/MusicDelta_Beethoven_MELODY1.csv"),
            "0.0,0.0\n0.0058,0.0\n0.0116,220.5\n",
        )
        .unwrap();

        let track = dataset().track(TRACK, Some(dir.path())).unwrap();
        let metadata = track.metadata().unwrap();
        assert_eq!(metadata.genre.as_deref(), Some("Classical"));
        assert_eq!(metadata.n_sources, Some(18));

        let melody = track.melody1().unwrap().unwrap();
        assert_eq!(melody.times(), [0.0, 0.0058, 0.0116]);
        assert_eq!(melody.confidence(), [0.0, 0.0, 1.0]);
        assert!(track.is_annotation_loaded());

        assert!(track.melody2().unwrap().is_none());
        assert!(track.melody3().unwrap().is_none());
    }

    #[test]
    fn test_melody3_keeps_every_voice() {
        let dir = tempdir().unwrap();
        let index = index_of(&[(
            TRACK,
            &[("melody3", FileEntry::new("melody3/MusicDelta_Beethoven_MELODY3.csv", "0"))],
        )]);
        std::fs::create_dir_all(dir.path().join("melody3")).unwrap();
        std::fs::write(
            dir.path().join("melody3/MusicDelta_Beethoven_MELODY3.csv"),
            "0.0,0.0,0.0\n0.0058,220.5,0.0\n0.0116,221.0,330.25\n",
        )
        .unwrap();

        let track = Dataset::new(MedleyDbMelody::new(), index)
            .track(TRACK, Some(dir.path()))
            .unwrap();
        let voices = track.melody3().unwrap().unwrap();
        assert_eq!(voices.times(), [0.0, 0.0058, 0.0116]);
        assert_eq!(voices.max_voices(), 2);
        assert_eq!(voices.frequencies()[2], [221.0, 330.25]);
        assert_eq!(voices.confidence()[1], [1.0, 0.0]);

        // Cached after the first decode.
        std::fs::remove_file(dir.path().join("melody3/MusicDelta_Beethoven_MELODY3.csv")).unwrap();
        assert!(track.melody3().unwrap().is_some());
    }

    #[test]
    fn test_display() {
        let track = dataset().track(TRACK, Some(Path::new("/data/MedleyDB-Melody"))).unwrap();
        assert_eq!(
            track.to_string(),
            "MedleyDB-Melody Track(track_id=MusicDelta_Beethoven, \
             audio_path=/data/MedleyDB-Melody/audio/MusicDelta_Beethoven_MIX.wav, \
             metadata=[artist, title, genre, is_excerpt, is_instrumental, n_sources], \
             melody1=F0Data('times', 'frequencies', 'confidence'))"
        );
    }

    #[test]
    fn test_download_info_names_data_home() {
        let info = MedleyDbMelody::new()
            .download_info(Path::new("/data/MedleyDB-Melody"))
            .unwrap();
        assert!(info.contains("zenodo.org/record/2628782"));
        assert!(info.ends_with("/data/MedleyDB-Melody"));
    }
}
