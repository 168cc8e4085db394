//! Crate-wide error types.
//!
//! Library modules return [`Error`] through the [`Result`] alias. The CLI
//! wraps everything in `anyhow` for convenient propagation.
//!
//! # Design
//!
//! - Validation never produces an [`Error`]: missing or corrupt files are
//!   reported as data in a [`ValidationReport`](crate::validation::ValidationReport).
//! - Construction-time problems (malformed index, unknown track id) are errors.
//! - Absent annotation or audio files degrade to `None` instead of
//!   [`Error::NotFound`]; only metadata reads surface `NotFound`.
//!
//! # Example
//!
//! ```ignore
//! use mir_datasets::error::{Error, Result, ResultExt};
//!
//! fn read_index(path: &Path) -> Result<Index> {
//!     let index = load_index(path).with_context("while opening dataset")?;
//!     Ok(index)
//! }
//! ```

use std::path::PathBuf;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for dataset loading.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed index, metadata or annotation document
    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Track id not present in the dataset index
    #[error("{track_id} is not a valid track ID in {dataset}")]
    InvalidTrackId { dataset: String, track_id: String },

    /// Expected file absent
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Freshly downloaded file does not match its published checksum
    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// Network or extraction failure while downloading
    #[error("Download error: {0}")]
    Download(String),

    /// Audio decoding or resampling failure
    #[error("Audio error for {path}: {message}")]
    Audio { path: PathBuf, message: String },

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a parse error.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid track id error.
    pub fn invalid_track_id(dataset: impl Into<String>, track_id: impl Into<String>) -> Self {
        Self::InvalidTrackId {
            dataset: dataset.into(),
            track_id: track_id.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a download error.
    pub fn download(message: impl Into<String>) -> Self {
        Self::Download(message.into())
    }

    /// Create an audio error.
    pub fn audio(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Audio {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error (or the error it wraps) is a [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::WithContext { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_found("/data/Orchset/audio/mono/t1.wav");
        assert!(err.to_string().contains("t1.wav"));
    }

    #[test]
    fn test_invalid_track_id_message() {
        let err = Error::invalid_track_id("Orchset", "asdfasdf");
        assert_eq!(
            err.to_string(),
            "asdfasdf is not a valid track ID in Orchset"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::download("connection refused").context("while fetching Orchset");
        let msg = err.to_string();
        assert!(msg.contains("while fetching Orchset"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_is_not_found_sees_through_context() {
        let err = Error::not_found("/missing.json").context("loading metadata");
        assert!(err.is_not_found());
        assert!(!Error::download("refused").context("fetching").is_not_found());
    }

    #[test]
    fn test_result_ext() {
        let result: Result<()> = Err(Error::parse("index.json", "expected object"));
        let with_ctx = result.with_context("additional context");
        assert!(
            with_ctx
                .unwrap_err()
                .to_string()
                .contains("additional context")
        );
    }
}
