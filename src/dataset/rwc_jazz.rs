//! RWC-Jazz: the jazz part of the RWC Music Database.
//!
//! Index roles: `audio`, `sections`, `beats`. The audio is distributed on
//! CD, so `download` fetches the metadata table and the AIST annotations
//! and prints instructions for the rest. Annotation times are stored in
//! hundredths of a second.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::debug;

use super::DatasetSpec;
use crate::annotation::{BeatData, Delimiter, SectionData, parse_float, read_optional, read_rows, row_error};
use crate::download::RemoteFile;
use crate::error::{Error, Result};
use crate::track::Track;

/// Metadata table, relative to data_home.
pub const METADATA_FILE: &str = "metadata-master/rwc-j.csv";

const HEADER_CELL: &str = "Piece No.";

const FIELDS: [&str; 8] = [
    "piece_number",
    "suffix",
    "track_number",
    "title",
    "artist",
    "duration_sec",
    "variation",
    "instruments",
];

const CITATION: &str = r#"===========  MLA ===========
Goto, Masataka, et al.,
"RWC Music Database: Popular, Classical and Jazz Music Databases.",
3rd International Society for Music Information Retrieval Conference (2002)

========== Bibtex ==========
@inproceedings{goto2002rwc,
  title={RWC Music Database: Popular, Classical and Jazz Music Databases.},
  author={Goto, Masataka and Hashiguchi, Hiroki and Nishimura, Takuichi and Oka, Ryuichi},
  booktitle={3rd International Society for Music Information Retrieval Conference},
  year={2002},
  series={ISMIR},
}"#;

/// One row of `rwc-j.csv`, kept as written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RwcJazzMetadata {
    pub piece_number: String,
    pub suffix: String,
    pub track_number: String,
    pub title: String,
    pub artist: String,
    pub duration_sec: String,
    pub variation: String,
    pub instruments: String,
}

/// A decoded RWC-Jazz annotation file.
#[derive(Debug, Clone, PartialEq)]
pub enum RwcJazzAnnotation {
    Sections(SectionData),
    Beats(BeatData),
}

impl RwcJazzAnnotation {
    pub fn sections(&self) -> Option<&SectionData> {
        match self {
            Self::Sections(sections) => Some(sections),
            Self::Beats(_) => None,
        }
    }

    pub fn beats(&self) -> Option<&BeatData> {
        match self {
            Self::Beats(beats) => Some(beats),
            Self::Sections(_) => None,
        }
    }
}

impl fmt::Display for RwcJazzAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sections(sections) => sections.fmt(f),
            Self::Beats(beats) => beats.fmt(f),
        }
    }
}

/// The RWC-Jazz dataset.
#[derive(Debug, Clone)]
pub struct RwcJazz {
    remotes: Vec<RemoteFile>,
}

impl Default for RwcJazz {
    fn default() -> Self {
        Self::new()
    }
}

impl RwcJazz {
    pub fn new() -> Self {
        Self {
            remotes: vec![
                RemoteFile::new(
                    "metadata-master.zip",
                    "https://github.com/magdalenafuentes/metadata/archive/master.zip",
                    "7dbe87fedbaaa1f348625a2af1d78030",
                    None,
                ),
                RemoteFile::new(
                    "AIST.RWC-MDB-J-2001.BEAT.zip",
                    "https://staff.aist.go.jp/m.goto/RWC-MDB/AIST-Annotation/AIST.RWC-MDB-J-2001.BEAT.zip",
                    "b483853da05d0fff3992879f7729bcb4",
                    Some("annotations"),
                ),
                RemoteFile::new(
                    "AIST.RWC-MDB-J-2001.CHORUS.zip",
                    "https://staff.aist.go.jp/m.goto/RWC-MDB/AIST-Annotation/AIST.RWC-MDB-J-2001.CHORUS.zip",
                    "44afcf7f193d7e48a7d99e7a6f3ed39d",
                    Some("annotations"),
                ),
            ],
        }
    }

    /// Replace the remote files, e.g. to fetch from a mirror.
    pub fn with_remotes(mut self, remotes: Vec<RemoteFile>) -> Self {
        self.remotes = remotes;
        self
    }
}

impl DatasetSpec for RwcJazz {
    type Metadata = RwcJazzMetadata;
    type Annotation = RwcJazzAnnotation;

    fn name(&self) -> &str {
        "RWC-Jazz"
    }

    fn dir_name(&self) -> &str {
        "RWC-Jazz"
    }

    fn citation(&self) -> &str {
        CITATION
    }

    fn remotes(&self) -> &[RemoteFile] {
        &self.remotes
    }

    fn download_info(&self, data_home: &Path) -> Option<String> {
        Some(format!(
            "Unfortunately the audio files of the RWC-Jazz dataset are not available\n\
             for download. If you have the RWC-Jazz dataset, place the contents into a\n\
             folder called RWC-Jazz with the following structure:\n\
             \x20   > RWC-Jazz/\n\
             \x20       > annotations/\n\
             \x20       > audio/rwc-j-m0i with i in [1 .. 4]\n\
             \x20       > metadata-master/\n\
             and copy the RWC-Jazz folder to {}",
            data_home.display()
        ))
    }

    fn annotation_role(&self) -> &str {
        "sections"
    }

    fn annotation_summary(&self) -> String {
        format!("{}, beats={}", SectionData::default(), BeatData::default())
    }

    fn metadata_fields(&self, _record: Option<&RwcJazzMetadata>) -> Vec<String> {
        FIELDS.iter().map(|f| f.to_string()).collect()
    }

    fn load_annotation(&self, role: &str, path: &Path) -> Result<Option<RwcJazzAnnotation>> {
        let Some(contents) = read_optional(path)? else {
            return Ok(None);
        };
        let annotation = match role {
            "beats" => RwcJazzAnnotation::Beats(parse_beats(&contents, path)?),
            _ => RwcJazzAnnotation::Sections(parse_sections(&contents, path)?),
        };
        Ok(Some(annotation))
    }

    fn load_metadata(&self, data_home: &Path) -> Result<HashMap<String, RwcJazzMetadata>> {
        let path = data_home.join(METADATA_FILE);
        let contents = read_optional(&path)?.ok_or_else(|| Error::not_found(&path))?;
        parse_metadata(&contents, &path)
    }
}

impl Track<RwcJazz> {
    /// Song structure, decoded once and cached.
    pub fn sections(&self) -> Result<Option<&SectionData>> {
        Ok(self.annotation_for("sections")?.and_then(RwcJazzAnnotation::sections))
    }

    /// Beats with their bar positions, decoded once and cached.
    pub fn beats(&self) -> Result<Option<&BeatData>> {
        Ok(self.annotation_for("beats")?.and_then(RwcJazzAnnotation::beats))
    }
}

/// Parse `rwc-j.csv` into records keyed by track id (`RM-J001`, ...).
///
/// Header rows, recognised by their first cell, may appear anywhere.
pub fn parse_metadata(contents: &str, origin: &Path) -> Result<HashMap<String, RwcJazzMetadata>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(contents.as_bytes());

    let mut records = HashMap::new();
    for row in reader.records() {
        let row = row.map_err(|e| Error::parse(origin, e.to_string()))?;
        let line = row.position().map_or(0, |p| p.line() as usize);
        if row.iter().all(|field| field.trim().is_empty()) || &row[0] == HEADER_CELL {
            continue;
        }
        if row.len() < FIELDS.len() {
            return Err(row_error(
                origin,
                line,
                &format!("expected {} columns, found {}", FIELDS.len(), row.len()),
            ));
        }
        let track_id = track_id_for(&row[0])
            .ok_or_else(|| row_error(origin, line, &format!("cannot derive a track id from '{}'", &row[0])))?;

        records.insert(
            track_id,
            RwcJazzMetadata {
                piece_number: row[0].to_string(),
                suffix: row[1].to_string(),
                track_number: row[2].to_string(),
                title: row[3].to_string(),
                artist: row[4].to_string(),
                duration_sec: row[5].to_string(),
                variation: row[6].to_string(),
                instruments: row[7].to_string(),
            },
        );
    }
    debug!(target: "metadata", records = records.len(), "Parsed RWC-Jazz metadata table");
    Ok(records)
}

/// `No. 1` into `RM-J001`: the characters after the dot, minus the first,
/// zero-padded to three.
fn track_id_for(piece_number: &str) -> Option<String> {
    let (_, number) = piece_number.split_once('.')?;
    let padded: Vec<char> = "00".chars().chain(number.chars().skip(1)).collect();
    let last_three: String = padded[padded.len().saturating_sub(3)..].iter().collect();
    Some(format!("RM-J{}", last_three))
}

/// Parse a CHORUS file: `start end - label` rows, tab separated.
pub fn parse_sections(contents: &str, origin: &Path) -> Result<SectionData> {
    let mut start_times = Vec::new();
    let mut end_times = Vec::new();
    let mut sections = Vec::new();
    for (number, row) in read_rows(contents, Delimiter::Tab, origin)? {
        if row.len() < 4 {
            return Err(row_error(origin, number, "expected 'start end - label'"));
        }
        start_times.push(parse_float(&row[0], origin, number)? / 100.0);
        end_times.push(parse_float(&row[1], origin, number)? / 100.0);
        sections.push(row[3].to_string());
    }
    Ok(SectionData::new(start_times, end_times, sections).unwrap_or_default())
}

/// Parse a BEAT file: `time - marker` rows, tab separated.
///
/// Rows with marker `-1` are dropped. See [`bar_positions`] for how the
/// markers become positions in the bar.
pub fn parse_beats(contents: &str, origin: &Path) -> Result<BeatData> {
    let mut beat_times = Vec::new();
    let mut markers = Vec::new();
    for (number, row) in read_rows(contents, Delimiter::Tab, origin)? {
        if row.len() < 3 {
            return Err(row_error(origin, number, "expected 'time - marker'"));
        }
        let marker: i64 = row[2]
            .parse()
            .map_err(|_| row_error(origin, number, &format!("'{}' is not an integer", &row[2])))?;
        if marker == -1 {
            continue;
        }
        beat_times.push(parse_float(&row[0], origin, number)? / 100.0);
        markers.push(marker);
    }
    let positions = bar_positions(&markers);
    Ok(BeatData::new(beat_times, positions).unwrap_or_default())
}

/// Turn raw beat markers into 1-based positions in the bar.
///
/// The largest marker tags downbeats (position 1). A beat whose marker is
/// greater than the previous one (downbeats counting as 1) continues the
/// bar; any other beat gets 0. Beats before the first downbeat count
/// backwards from the length of the first full bar.
pub fn bar_positions(markers: &[i64]) -> Vec<u32> {
    let Some(&downbeat) = markers.iter().max() else {
        return Vec::new();
    };
    let adjusted: Vec<i64> = markers
        .iter()
        .map(|&m| if m == downbeat { 1 } else { m })
        .collect();

    let mut positions = vec![0u32; markers.len()];
    for i in 0..markers.len() {
        if markers[i] == downbeat {
            positions[i] = 1;
        } else if i > 0 && adjusted[i] > adjusted[i - 1] {
            positions[i] = positions[i - 1] + 1;
        }
    }

    let downbeats: Vec<usize> = (0..markers.len()).filter(|&i| markers[i] == downbeat).collect();
    if let Some(&first) = downbeats.first().filter(|&&first| first > 0) {
        let bar_length = match downbeats.get(1) {
            Some(&second) => positions[second - 1],
            None => positions[markers.len() - 1],
        };
        for back in 1..=first {
            positions[first - back] = (bar_length + 1).saturating_sub(back as u32);
        }
    }
    positions
}
