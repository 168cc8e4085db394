//! Annotation containers and text decoders.
//!
//! Decoders share one contract: a path that does not exist yields
//! `Ok(None)`, because files listed in an index are not guaranteed to be
//! present before download. Malformed rows are [`Error::Parse`] errors that
//! name the offending line.

use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

/// Time-interval events with one label each.
///
/// The three sequences are index-aligned and always the same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventData {
    start_times: Vec<f64>,
    end_times: Vec<f64>,
    labels: Vec<String>,
}

impl EventData {
    /// Build from parallel sequences.
    ///
    /// Returns `None` if the lengths differ.
    pub fn new(start_times: Vec<f64>, end_times: Vec<f64>, labels: Vec<String>) -> Option<Self> {
        if start_times.len() != end_times.len() || start_times.len() != labels.len() {
            return None;
        }
        Some(Self {
            start_times,
            end_times,
            labels,
        })
    }

    pub fn start_times(&self) -> &[f64] {
        &self.start_times
    }

    pub fn end_times(&self) -> &[f64] {
        &self.end_times
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterate over `(start, end, label)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, &str)> {
        self.start_times
            .iter()
            .zip(&self.end_times)
            .zip(&self.labels)
            .map(|((start, end), label)| (*start, *end, label.as_str()))
    }

    fn push(&mut self, start: f64, end: f64, label: String) {
        self.start_times.push(start);
        self.end_times.push(end);
        self.labels.push(label);
    }
}

impl fmt::Display for EventData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventData('start_times', 'end_times', 'labels')")
    }
}

/// Fundamental frequency contour.
///
/// `confidence` is 1.0 for voiced frames and 0.0 otherwise; which frames
/// count as voiced depends on the [`Voicing`] rule of the source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct F0Data {
    times: Vec<f64>,
    frequencies: Vec<f64>,
    confidence: Vec<f64>,
}

impl F0Data {
    /// Build from parallel sequences.
    ///
    /// Returns `None` if the lengths differ.
    pub fn new(times: Vec<f64>, frequencies: Vec<f64>, confidence: Vec<f64>) -> Option<Self> {
        if times.len() != frequencies.len() || times.len() != confidence.len() {
            return None;
        }
        Some(Self {
            times,
            frequencies,
            confidence,
        })
    }

    /// Build from times and frequencies; frames with a positive frequency
    /// are voiced.
    ///
    /// Returns `None` if the lengths differ.
    pub fn from_contour(times: Vec<f64>, frequencies: Vec<f64>) -> Option<Self> {
        let confidence = frequencies
            .iter()
            .map(|&f| Voicing::PositiveFrequency.confidence("", f))
            .collect();
        Self::new(times, frequencies, confidence)
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn confidence(&self) -> &[f64] {
        &self.confidence
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

impl fmt::Display for F0Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("F0Data('times', 'frequencies', 'confidence')")
    }
}

/// Several simultaneous F0 contours sharing one time axis.
///
/// Each frame holds one frequency and one confidence per voice. A voice is
/// voiced in a frame when its frequency is positive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiF0Data {
    times: Vec<f64>,
    frequencies: Vec<Vec<f64>>,
    confidence: Vec<Vec<f64>>,
}

impl MultiF0Data {
    /// Build from times and per-frame voice frequencies.
    ///
    /// Returns `None` if the lengths differ.
    pub fn from_voices(times: Vec<f64>, frequencies: Vec<Vec<f64>>) -> Option<Self> {
        if times.len() != frequencies.len() {
            return None;
        }
        let confidence = frequencies
            .iter()
            .map(|frame| {
                frame
                    .iter()
                    .map(|&f| Voicing::PositiveFrequency.confidence("", f))
                    .collect()
            })
            .collect();
        Some(Self {
            times,
            frequencies,
            confidence,
        })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Frequencies per frame, one entry per voice.
    pub fn frequencies(&self) -> &[Vec<f64>] {
        &self.frequencies
    }

    pub fn confidence(&self) -> &[Vec<f64>] {
        &self.confidence
    }

    /// Largest number of voices in any frame.
    pub fn max_voices(&self) -> usize {
        self.frequencies.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

impl fmt::Display for MultiF0Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MultiF0Data('times', 'frequencies', 'confidence')")
    }
}

/// Labelled song sections (intro, verse, chorus, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionData {
    start_times: Vec<f64>,
    end_times: Vec<f64>,
    sections: Vec<String>,
}

impl SectionData {
    /// Build from parallel sequences.
    ///
    /// Returns `None` if the lengths differ.
    pub fn new(start_times: Vec<f64>, end_times: Vec<f64>, sections: Vec<String>) -> Option<Self> {
        if start_times.len() != end_times.len() || start_times.len() != sections.len() {
            return None;
        }
        Some(Self {
            start_times,
            end_times,
            sections,
        })
    }

    pub fn start_times(&self) -> &[f64] {
        &self.start_times
    }

    pub fn end_times(&self) -> &[f64] {
        &self.end_times
    }

    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl fmt::Display for SectionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SectionData('start_times', 'end_times', 'sections')")
    }
}

/// Beat onsets with their position in the bar (1 = downbeat).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeatData {
    beat_times: Vec<f64>,
    beat_positions: Vec<u32>,
}

impl BeatData {
    /// Build from parallel sequences.
    ///
    /// Returns `None` if the lengths differ.
    pub fn new(beat_times: Vec<f64>, beat_positions: Vec<u32>) -> Option<Self> {
        if beat_times.len() != beat_positions.len() {
            return None;
        }
        Some(Self {
            beat_times,
            beat_positions,
        })
    }

    pub fn beat_times(&self) -> &[f64] {
        &self.beat_times
    }

    pub fn beat_positions(&self) -> &[u32] {
        &self.beat_positions
    }

    pub fn len(&self) -> usize {
        self.beat_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beat_times.is_empty()
    }
}

impl fmt::Display for BeatData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BeatData('beat_times', 'beat_positions')")
    }
}

/// Column separator of a delimited annotation file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Tab,
    Comma,
}

impl Delimiter {
    fn byte(self) -> u8 {
        match self {
            Self::Tab => b'\t',
            Self::Comma => b',',
        }
    }
}

/// How an F0 file marks unvoiced frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Voicing {
    /// Voiced when the frequency is greater than zero
    #[default]
    PositiveFrequency,
    /// Unvoiced only when the frequency column is the literal token `0`
    ExplicitZero,
}

impl Voicing {
    /// Confidence of one frame given its raw token and parsed value.
    pub fn confidence(self, token: &str, frequency: f64) -> f64 {
        let voiced = match self {
            Self::PositiveFrequency => frequency > 0.0,
            Self::ExplicitZero => token != "0",
        };
        if voiced { 1.0 } else { 0.0 }
    }
}

/// Load an event file: one `start end label` row per line.
///
/// Columns are separated by runs of spaces or tabs. Tokens after the
/// second column are joined with single spaces into the label. Blank lines
/// are skipped.
pub fn load_events(path: &Path) -> Result<Option<EventData>> {
    let Some(contents) = read_optional(path)? else {
        return Ok(None);
    };
    parse_events(&contents, path).map(Some)
}

/// Load an F0 contour: `time<delim>frequency` per line.
///
/// Extra columns are ignored. Blank lines are skipped.
pub fn load_f0(path: &Path, delimiter: Delimiter, voicing: Voicing) -> Result<Option<F0Data>> {
    let Some(contents) = read_optional(path)? else {
        return Ok(None);
    };
    parse_f0(&contents, delimiter, voicing, path).map(Some)
}

/// Load a multi-voice F0 file: `time<delim>f1<delim>f2...` per line.
pub fn load_multi_f0(path: &Path, delimiter: Delimiter) -> Result<Option<MultiF0Data>> {
    let Some(contents) = read_optional(path)? else {
        return Ok(None);
    };
    parse_multi_f0(&contents, delimiter, path).map(Some)
}

/// Parse event rows from text. `origin` names the source in errors.
pub fn parse_events(contents: &str, origin: &Path) -> Result<EventData> {
    let mut events = EventData::default();
    for (number, line) in numbered_lines(contents) {
        let columns: Vec<&str> = line.split_whitespace().collect();
        let [start, end, label @ ..] = columns.as_slice() else {
            return Err(row_error(origin, number, "expected 'start end label'"));
        };
        if label.is_empty() {
            return Err(row_error(origin, number, "missing label"));
        }
        events.push(
            parse_float(start, origin, number)?,
            parse_float(end, origin, number)?,
            label.join(" "),
        );
    }
    Ok(events)
}

/// Parse F0 rows from text. `origin` names the source in errors.
pub fn parse_f0(contents: &str, delimiter: Delimiter, voicing: Voicing, origin: &Path) -> Result<F0Data> {
    let mut times = Vec::new();
    let mut frequencies = Vec::new();
    let mut confidence = Vec::new();
    for (number, row) in read_rows(contents, delimiter, origin)? {
        let (Some(time), Some(frequency)) = (row.get(0), row.get(1)) else {
            return Err(row_error(origin, number, "expected 'time frequency'"));
        };
        let value = parse_float(frequency, origin, number)?;
        times.push(parse_float(time, origin, number)?);
        frequencies.push(value);
        confidence.push(voicing.confidence(frequency, value));
    }
    // All three vectors grow together, so the lengths always agree.
    Ok(F0Data::new(times, frequencies, confidence).unwrap_or_default())
}

/// Parse multi-voice F0 rows from text. Every row needs a time and at least
/// one frequency.
pub fn parse_multi_f0(contents: &str, delimiter: Delimiter, origin: &Path) -> Result<MultiF0Data> {
    let mut times = Vec::new();
    let mut frequencies = Vec::new();
    for (number, row) in read_rows(contents, delimiter, origin)? {
        if row.len() < 2 {
            return Err(row_error(origin, number, "expected 'time frequency...'"));
        }
        times.push(parse_float(&row[0], origin, number)?);
        let voices = row
            .iter()
            .skip(1)
            .map(|token| parse_float(token, origin, number))
            .collect::<Result<Vec<_>>>()?;
        frequencies.push(voices);
    }
    Ok(MultiF0Data::from_voices(times, frequencies).unwrap_or_default())
}

/// Non-blank rows of a delimited file with their 1-based line numbers.
///
/// Fields are trimmed and rows may have differing column counts; callers
/// check the columns they need.
pub(crate) fn read_rows(
    contents: &str,
    delimiter: Delimiter,
    origin: &Path,
) -> Result<Vec<(usize, csv::StringRecord)>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter.byte())
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| Error::parse(origin, e.to_string()))?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map_or(0, |p| p.line() as usize);
        rows.push((line, record));
    }
    Ok(rows)
}

/// File contents, or `None` if the file does not exist.
pub(crate) fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Non-blank lines with 1-based line numbers.
fn numbered_lines(contents: &str) -> impl Iterator<Item = (usize, &str)> {
    contents
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

pub(crate) fn parse_float(token: &str, origin: &Path, line: usize) -> Result<f64> {
    token
        .parse()
        .map_err(|_| row_error(origin, line, &format!("'{}' is not a number", token)))
}

pub(crate) fn row_error(origin: &Path, line: usize, message: &str) -> Error {
    Error::parse(origin, format!("line {}: {}", line, message))
}


/// Property-based tests using proptest
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn event_row() -> impl Strategy<Value = (f64, f64, String)> {
        (0.0f64..1000.0, 0.0f64..1000.0, "[A-Za-z]{1,8}( [A-Za-z]{1,8}){0,2}")
    }

    proptest! {
        /// Every parsed row lands in all three sequences
        #[test]
        fn parsed_events_stay_aligned(rows in proptest::collection::vec(event_row(), 0..40)) {
            let text: String = rows
                .iter()
                .map(|(s, e, l)| format!("{} {} {}\n", s, e, l))
                .collect();
            let events = parse_events(&text, Path::new("prop.lab")).unwrap();

            prop_assert_eq!(events.start_times().len(), rows.len());
            prop_assert_eq!(events.end_times().len(), rows.len());
            prop_assert_eq!(events.labels().len(), rows.len());
            for ((start, end, label), parsed) in rows.iter().zip(events.iter()) {
                prop_assert_eq!(*start, parsed.0);
                prop_assert_eq!(*end, parsed.1);
                prop_assert_eq!(label.as_str(), parsed.2);
            }
        }
    }
}
