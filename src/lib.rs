//! MIR Datasets - loaders for music information retrieval corpora.
//!
//! A dataset is described by a JSON index mapping each track id to its
//! files and checksums. This crate validates a local copy against that
//! index, downloads missing data, and exposes every track with lazily
//! loaded annotations and audio.
//!
//! The entry point is [`dataset::Dataset`], parameterized by a
//! [`dataset::DatasetSpec`] such as [`dataset::Orchset`].

pub mod annotation;
pub mod audio;
pub mod config;
pub mod dataset;
pub mod download;
pub mod error;
pub mod index;
pub mod metadata;
pub mod track;
pub mod validation;
#[cfg(test)]
pub mod test_utils;

pub use dataset::{Dataset, DatasetSpec};
pub use error::{Error, Result};
pub use track::Track;
