//! Whole-file audio decoding using symphonia.
//!
//! Supported formats:
//! - WAV/PCM
//! - FLAC
//! - MP3
//! - OGG Vorbis
//! - AAC (in MP4 container)

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

use crate::error::{Error, Result};

/// Fully decoded audio, one sample vector per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

/// Decode every packet of the first audio track in `path`.
///
/// Samples are converted to f32 in [-1.0, 1.0].
pub fn decode_file(path: &Path) -> Result<DecodedAudio> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension() {
        hint.with_extension(&ext.to_string_lossy());
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::audio(path, format!("unsupported format: {}", e)))?;
    let mut reader = probed.format;

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::audio(path, "no audio track found"))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| Error::audio(path, "unknown sample rate"))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| Error::audio(path, e.to_string()))?;

    let mut channels: Vec<Vec<f32>> = match codec_params.channels {
        Some(layout) => vec![Vec::new(); layout.count()],
        None => Vec::new(),
    };

    loop {
        let packet = match reader.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(Error::audio(path, e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::debug!(path = %path.display(), error = %e, "Skipping bad frame");
                continue;
            }
            Err(e) => return Err(Error::audio(path, e.to_string())),
        };

        if channels.is_empty() {
            channels = vec![Vec::new(); decoded.spec().channels.count()];
        }
        append_planar(&decoded, &mut channels);
    }

    Ok(DecodedAudio {
        channels,
        sample_rate,
    })
}

/// Append a decoded buffer to per-channel f32 vectors.
fn append_planar(buffer: &AudioBufferRef, out: &mut [Vec<f32>]) {
    match buffer {
        AudioBufferRef::F32(buf) => push_planes(&**buf, out, |s| s),
        AudioBufferRef::F64(buf) => push_planes(&**buf, out, |s| s as f32),
        AudioBufferRef::S8(buf) => push_planes(&**buf, out, |s| s as f32 / 128.0),
        AudioBufferRef::S16(buf) => push_planes(&**buf, out, |s| s as f32 / 32768.0),
        AudioBufferRef::S24(buf) => push_planes(&**buf, out, |s| s.0 as f32 / 8388608.0),
        AudioBufferRef::S32(buf) => push_planes(&**buf, out, |s| s as f32 / 2147483648.0),
        AudioBufferRef::U8(buf) => push_planes(&**buf, out, |s| (s as f32 - 128.0) / 128.0),
        AudioBufferRef::U16(buf) => push_planes(&**buf, out, |s| (s as f32 - 32768.0) / 32768.0),
        AudioBufferRef::U24(buf) => {
            push_planes(&**buf, out, |s| (s.0 as f32 - 8388608.0) / 8388608.0)
        }
        AudioBufferRef::U32(buf) => {
            push_planes(&**buf, out, |s| (s as f64 - 2147483648.0) as f32 / 2147483648.0)
        }
    }
}

fn push_planes<S: Sample>(buf: &AudioBuffer<S>, out: &mut [Vec<f32>], convert: impl Fn(S) -> f32) {
    for (channel, dst) in out.iter_mut().enumerate() {
        if channel < buf.spec().channels.count() {
            dst.extend(buf.chan(channel).iter().map(|&s| convert(s)));
        }
    }
}
