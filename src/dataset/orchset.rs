//! Orchset: 64 symphonic excerpts with predominant melody annotations.
//!
//! Index roles: `audio_mono`, `audio_stereo`, `melody`. Metadata comes from
//! `Orchset - Predominant Melodic Instruments.csv`, with composer, work and
//! excerpt number parsed out of the excerpt id.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use super::DatasetSpec;
use crate::annotation::{Delimiter, F0Data, Voicing, load_f0, read_optional, row_error};
use crate::audio::{AudioData, AudioOptions};
use crate::download::RemoteFile;
use crate::error::{Error, Result, ResultExt};
use crate::track::Track;

pub const METADATA_FILE: &str = "Orchset - Predominant Melodic Instruments.csv";

/// The archive unpacks into this sub-directory; its content is moved up.
const ARCHIVE_DIR: &str = "Orchset";

/// Composers whose names contain a dash.
const HYPHENATED_COMPOSERS: [&str; 2] = ["Musorgski", "Rimski"];

const FIELDS: [&str; 12] = [
    "composer",
    "work",
    "excerpt",
    "predominant_melodic_instruments",
    "alternating_melody",
    "contains_winds",
    "contains_strings",
    "contains_brass",
    "only_strings",
    "only_winds",
    "only_brass",
    "predominant_melodic_instruments_raw",
];

const CITATION: &str = r#"===========  MLA ===========
Bosch, J., Marxer, R., Gomez, E., "Evaluation and Combination of
Pitch Estimation Methods for Melody Extraction in Symphonic
Classical Music", Journal of New Music Research (2016)

========== Bibtex ==========
@article{bosch2016evaluation,
    title={Evaluation and combination of pitch estimation methods for melody extraction in symphonic classical music},
    author={Bosch, Juan J and Marxer, Ricard and G{\'o}mez, Emilia},
    journal={Journal of New Music Research},
    volume={45},
    number={2},
    pages={101--117},
    year={2016},
    publisher={Taylor \& Francis}
}"#;

/// One row of the instruments CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchsetMetadata {
    pub composer: String,
    pub work: String,
    pub excerpt: String,
    /// Lowercased, deduplicated and sorted instrument families
    pub predominant_melodic_instruments: Vec<String>,
    /// Instrument column as written in the CSV
    pub predominant_melodic_instruments_raw: String,
    pub alternating_melody: bool,
    pub contains_winds: bool,
    pub contains_strings: bool,
    pub contains_brass: bool,
    pub only_strings: bool,
    pub only_winds: bool,
    pub only_brass: bool,
}

/// The Orchset dataset.
#[derive(Debug, Clone)]
pub struct Orchset {
    remotes: Vec<RemoteFile>,
}

impl Default for Orchset {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchset {
    pub fn new() -> Self {
        Self {
            remotes: vec![RemoteFile::new(
                "Orchset_dataset_0.zip",
                "https://zenodo.org/record/1289786/files/Orchset_dataset_0.zip?download=1",
                "cf6fe52d64624f61ee116c752fb318ca",
                None,
            )],
        }
    }

    /// Replace the remote files, e.g. to fetch from a mirror.
    pub fn with_remotes(mut self, remotes: Vec<RemoteFile>) -> Self {
        self.remotes = remotes;
        self
    }
}

impl DatasetSpec for Orchset {
    type Metadata = OrchsetMetadata;
    type Annotation = F0Data;

    fn name(&self) -> &str {
        "Orchset"
    }

    fn dir_name(&self) -> &str {
        "Orchset"
    }

    fn citation(&self) -> &str {
        CITATION
    }

    fn remotes(&self) -> &[RemoteFile] {
        &self.remotes
    }

    fn audio_role(&self) -> &str {
        "audio_mono"
    }

    fn annotation_role(&self) -> &str {
        "melody"
    }

    fn annotation_summary(&self) -> String {
        F0Data::default().to_string()
    }

    fn metadata_fields(&self, _record: Option<&OrchsetMetadata>) -> Vec<String> {
        FIELDS.iter().map(|f| f.to_string()).collect()
    }

    /// Only a literal `0` frequency marks an unvoiced frame in Orchset.
    fn load_annotation(&self, _role: &str, path: &Path) -> Result<Option<F0Data>> {
        load_f0(path, Delimiter::Tab, Voicing::ExplicitZero)
    }

    fn load_metadata(&self, data_home: &Path) -> Result<HashMap<String, OrchsetMetadata>> {
        let path = data_home.join(METADATA_FILE);
        let contents = read_optional(&path)?.ok_or_else(|| Error::not_found(&path))?;
        parse_metadata(&contents, &path)
    }

    fn after_download(&self, data_home: &Path) -> Result<()> {
        flatten_archive_dir(&data_home.join(ARCHIVE_DIR), data_home)
    }
}

impl Track<Orchset> {
    /// Stereo mix, read from disk on every call.
    pub fn audio_stereo(&self) -> Result<Option<AudioData>> {
        self.audio_for_role("audio_stereo", AudioOptions::multichannel())
    }
}

/// Parse the instruments CSV into records keyed by track id.
///
/// The first row is the column header.
pub fn parse_metadata(contents: &str, origin: &Path) -> Result<HashMap<String, OrchsetMetadata>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(contents.as_bytes());

    let mut records = HashMap::new();
    for row in reader.records() {
        let row = row.map_err(|e| Error::parse(origin, e.to_string()))?;
        let line = row.position().map_or(0, |p| p.line() as usize);
        if row.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        if row.len() < 9 {
            return Err(row_error(
                origin,
                line,
                &format!("expected 9 columns, found {}", row.len()),
            ));
        }
        let flag = |i: usize| {
            parse_flag(&row[i])
                .ok_or_else(|| row_error(origin, line, &format!("'{}' is not TRUE or FALSE", &row[i])))
        };

        let excerpt_file = &row[0];
        let instruments = &row[1];
        let track_id = excerpt_file.split('.').next().unwrap_or(excerpt_file).to_string();
        let (composer, work, excerpt) = split_excerpt_id(&track_id);

        records.insert(
            track_id,
            OrchsetMetadata {
                composer,
                work,
                excerpt,
                predominant_melodic_instruments: normalize_instruments(instruments),
                predominant_melodic_instruments_raw: instruments.to_string(),
                alternating_melody: flag(2)?,
                contains_winds: flag(3)?,
                contains_strings: flag(4)?,
                contains_brass: flag(5)?,
                only_strings: flag(6)?,
                only_winds: flag(7)?,
                only_brass: flag(8)?,
            },
        );
    }
    debug!(target: "metadata", records = records.len(), "Parsed Orchset instruments table");
    Ok(records)
}

/// `Composer-Work-Parts-exN` into `(composer, work, N)`.
fn split_excerpt_id(track_id: &str) -> (String, String, String) {
    let mut parts: Vec<String> = track_id.split('-').map(str::to_string).collect();
    if parts.len() > 1 && HYPHENATED_COMPOSERS.contains(&parts[0].as_str()) {
        let second = parts.remove(1);
        parts[0] = format!("{}-{}", parts[0], second);
    }
    let composer = parts.first().cloned().unwrap_or_default();
    let excerpt = match parts.last() {
        Some(last) if parts.len() > 1 => last.get(2..).unwrap_or_default().to_string(),
        _ => String::new(),
    };
    let work = if parts.len() > 2 {
        parts[1..parts.len() - 1].join("-")
    } else {
        String::new()
    };
    (composer, work, excerpt)
}

/// `Strings+Winds (solo),Brass` into `["brass", "strings", "winds"]`.
fn normalize_instruments(raw: &str) -> Vec<String> {
    let mut instruments: Vec<String> = raw
        .split('+')
        .flat_map(|group| group.split(','))
        .map(|name| match name.trim().to_lowercase().as_str() {
            "string" => "strings".to_string(),
            "winds (solo)" => "winds".to_string(),
            other => other.to_string(),
        })
        .collect();
    instruments.sort();
    instruments.dedup();
    instruments
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "TRUE" => Some(true),
        "FALSE" => Some(false),
        _ => None,
    }
}

/// Move everything in `nested` into `parent`, then remove `nested`.
fn flatten_archive_dir(nested: &Path, parent: &Path) -> Result<()> {
    if !nested.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(nested)? {
        let entry = entry?;
        let target = parent.join(entry.file_name());
        if target.is_dir() {
            std::fs::remove_dir_all(&target)?;
        } else if target.exists() {
            std::fs::remove_file(&target)?;
        }
        std::fs::rename(entry.path(), &target)
            .with_context(format!("moving {} into {}", entry.path().display(), parent.display()))?;
    }
    std::fs::remove_dir(nested)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::index::FileEntry;
    use crate::test_utils::{index_of, write_wav};
    use tempfile::tempdir;

    const CSV: &str = "excerpt,Predominant melodic instruments,Alternating melody,Contains winds,Contains strings,Contains brass,Only strings,Only winds,Only brass\n\
Beethoven-S3-I-ex1.wav,Strings+Winds,TRUE,TRUE,TRUE,FALSE,FALSE,FALSE,FALSE\n\
Musorgski-Ravel-PicturesExhibition-ex7.wav,\"Winds (solo),String\",FALSE,TRUE,TRUE,TRUE,FALSE,FALSE,FALSE\n";

    #[test]
    fn test_parse_metadata() {
        let records = parse_metadata(CSV, Path::new(METADATA_FILE)).unwrap();
        assert_eq!(records.len(), 2);

        let beethoven = &records["Beethoven-S3-I-ex1"];
        assert_eq!(beethoven.composer, "Beethoven");
        assert_eq!(beethoven.work, "S3-I");
        assert_eq!(beethoven.excerpt, "1");
        assert_eq!(beethoven.predominant_melodic_instruments, ["strings", "winds"]);
        assert!(beethoven.alternating_melody);
        assert!(!beethoven.contains_brass);

        let musorgski = &records["Musorgski-Ravel-PicturesExhibition-ex7"];
        assert_eq!(musorgski.composer, "Musorgski-Ravel");
        assert_eq!(musorgski.work, "PicturesExhibition");
        assert_eq!(musorgski.excerpt, "7");
        assert_eq!(musorgski.predominant_melodic_instruments_raw, "Winds (solo),String");
        assert_eq!(musorgski.predominant_melodic_instruments, ["strings", "winds"]);
        assert!(musorgski.contains_brass);
    }

    #[test]
    fn test_parse_metadata_rejects_bad_rows() {
        let header = CSV.lines().next().unwrap();

        let short = format!("{}\nBeethoven-S3-I-ex1.wav,Strings,TRUE\n", header);
        let err = parse_metadata(&short, Path::new(METADATA_FILE)).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{}", err);

        let bad_flag = format!(
            "{}\nBeethoven-S3-I-ex1.wav,Strings,yes,TRUE,TRUE,FALSE,FALSE,FALSE,FALSE\n",
            header
        );
        assert!(matches!(
            parse_metadata(&bad_flag, Path::new(METADATA_FILE)),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn test_quoted_instrument_cells() {
        let csv = format!(
            "{}\nTchaikovsky-Nutcracker-ex2.wav,\"Winds, \"\"solo\"\"\",FALSE,TRUE,FALSE,FALSE,FALSE,TRUE,FALSE\n",
            CSV.lines().next().unwrap()
        );
        let records = parse_metadata(&csv, Path::new(METADATA_FILE)).unwrap();
        let record = &records["Tchaikovsky-Nutcracker-ex2"];
        assert_eq!(record.predominant_melodic_instruments_raw, "Winds, \"solo\"");
        assert!(record.only_winds);
    }

    #[test]
    fn test_only_literal_zero_is_unvoiced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("GT/ex.mel");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "0.0\t0\n0.01\t0.0\n0.02\t-1\n0.03\t220.5\n").unwrap();

        let melody = Orchset::new().load_annotation("melody", &path).unwrap().unwrap();
        assert_eq!(melody.confidence(), [0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_track_with_melody_and_stereo_audio() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(METADATA_FILE), CSV).unwrap();
        std::fs::create_dir_all(dir.path().join("GT")).unwrap();
        std::fs::write(dir.path().join("GT/Beethoven-S3-I-ex1.mel"), "0.0\t0\n0.01\t440.0\n").unwrap();
        std::fs::create_dir_all(dir.path().join("audio/stereo")).unwrap();
        write_wav(&dir.path().join("audio/stereo/Beethoven-S3-I-ex1.wav"), 22050, 2, &[0, 0, 8192, -8192]);

        let index = index_of(&[(
            "Beethoven-S3-I-ex1",
            &[
                ("audio_mono", FileEntry::new("audio/mono/Beethoven-S3-I-ex1.wav", "0")),
                ("audio_stereo", FileEntry::new("audio/stereo/Beethoven-S3-I-ex1.wav", "0")),
                ("melody", FileEntry::new("GT/Beethoven-S3-I-ex1.mel", "0")),
            ],
        )]);
        let dataset = Dataset::new(Orchset::new(), index);
        let track = dataset.track("Beethoven-S3-I-ex1", Some(dir.path())).unwrap();

        assert_eq!(track.metadata().unwrap().work, "S3-I");
        let melody = track.annotation().unwrap().unwrap();
        assert_eq!(melody.frequencies(), [0.0, 440.0]);
        assert_eq!(melody.confidence(), [0.0, 1.0]);

        assert!(track.audio().unwrap().is_none());
        let stereo = track.audio_stereo().unwrap().unwrap();
        assert_eq!(stereo.channel_count(), 2);
        assert_eq!(stereo.frames(), 2);
    }

    #[test]
    fn test_after_download_flattens_archive_dir() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join(ARCHIVE_DIR);
        std::fs::create_dir_all(nested.join("audio/mono")).unwrap();
        std::fs::write(nested.join("audio/mono/x.wav"), b"x").unwrap();
        std::fs::write(nested.join(METADATA_FILE), CSV).unwrap();

        Orchset::new().after_download(dir.path()).unwrap();

        assert!(!nested.exists());
        assert!(dir.path().join("audio/mono/x.wav").exists());
        assert!(dir.path().join(METADATA_FILE).exists());

        // Nothing to do the second time.
        Orchset::new().after_download(dir.path()).unwrap();
    }

    #[test]
    fn test_remote_descriptor() {
        let orchset = Orchset::new();
        let remote = &orchset.remotes()[0];
        assert_eq!(remote.filename, "Orchset_dataset_0.zip");
        assert!(remote.kind().is_archive());
        assert_eq!(remote.destination(Path::new("/data")), Path::new("/data"));
    }
}
