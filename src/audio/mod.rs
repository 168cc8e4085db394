//! Audio loading for track fields.
//!
//! Audio is decoded fresh on every call and never cached: corpora are far
//! larger than memory, so callers hold on to [`AudioData`] only as long as
//! they need it.

mod decoder;
mod resampler;

pub use decoder::{DecodedAudio, decode_file};
pub use resampler::resample;

use std::path::Path;

use crate::error::{Error, Result};

/// How a dataset wants its audio delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioOptions {
    /// Average all channels into one
    pub mono: bool,
    /// Resample to this rate; `None` keeps the file's native rate
    pub sample_rate: Option<u32>,
}

impl Default for AudioOptions {
    fn default() -> Self {
        Self {
            mono: true,
            sample_rate: None,
        }
    }
}

impl AudioOptions {
    /// Keep every channel at the native rate.
    pub fn multichannel() -> Self {
        Self {
            mono: false,
            sample_rate: None,
        }
    }
}

/// Decoded samples with their sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioData {
    /// One vector per channel (a single vector for mono)
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl AudioData {
    /// Samples of the first channel, which is the whole signal for mono audio.
    pub fn samples(&self) -> &[f32] {
        self.channels.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Frames per channel.
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// Load audio from disk.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_audio(path: &Path, options: AudioOptions) -> Result<Option<AudioData>> {
    if !path.exists() {
        return Ok(None);
    }

    let decoded = decode_file(path)?;
    let mut channels = decoded.channels;
    let mut sample_rate = decoded.sample_rate;

    if options.mono && channels.len() > 1 {
        channels = vec![downmix(&channels)];
    }

    if let Some(target) = options.sample_rate {
        if target != sample_rate {
            channels = resample(&channels, sample_rate, target)
                .map_err(|message| Error::audio(path, message))?;
            sample_rate = target;
        }
    }

    Ok(Some(AudioData {
        channels,
        sample_rate,
    }))
}

/// Average channels frame by frame.
fn downmix(channels: &[Vec<f32>]) -> Vec<f32> {
    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    let scale = 1.0 / channels.len() as f32;
    (0..frames)
        .map(|i| channels.iter().map(|c| c[i]).sum::<f32>() * scale)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::write_wav;
    use tempfile::tempdir;

    #[test]
    fn test_missing_audio_is_none() {
        let audio = load_audio(Path::new("/nonexistent/t1.wav"), AudioOptions::default()).unwrap();
        assert!(audio.is_none());
    }

    #[test]
    fn test_mono_downmix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 8000, 2, &[16384, 0, 16384, 16384]);

        let audio = load_audio(&path, AudioOptions::default()).unwrap().unwrap();
        assert_eq!(audio.channel_count(), 1);
        assert_eq!(audio.samples(), &[0.25, 0.5]);
        assert_eq!(audio.sample_rate, 8000);
    }

    #[test]
    fn test_multichannel_keeps_channels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 8000, 2, &[16384, 0, 16384, 16384]);

        let audio = load_audio(&path, AudioOptions::multichannel())
            .unwrap()
            .unwrap();
        assert_eq!(audio.channel_count(), 2);
        assert_eq!(audio.frames(), 2);
    }

    #[test]
    fn test_resample_override() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_wav(&path, 8000, 1, &vec![0i16; 8000]);

        let options = AudioOptions {
            mono: true,
            sample_rate: Some(4000),
        };
        let audio = load_audio(&path, options).unwrap().unwrap();
        assert_eq!(audio.sample_rate, 4000);
        assert_eq!(audio.frames(), 4000);
        assert!((audio.duration_secs() - 1.0).abs() < 1e-9);
    }
}
