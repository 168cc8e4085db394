//! Offline sample rate conversion using rubato.
//!
//! Used when a dataset asks for a fixed sample rate instead of the file's
//! native one. Works on whole signals, not streams.

use rubato::{FftFixedIn, Resampler as RubatoResampler};

/// Input frames fed to rubato per call.
const CHUNK_SIZE: usize = 1024;

/// Resample per-channel signals from `input_rate` to `output_rate`.
///
/// Output length is `ceil(frames * output_rate / input_rate)`. The
/// resampler's startup delay is trimmed so output stays time-aligned.
pub fn resample(
    channels: &[Vec<f32>],
    input_rate: u32,
    output_rate: u32,
) -> Result<Vec<Vec<f32>>, String> {
    if input_rate == output_rate || channels.is_empty() {
        return Ok(channels.to_vec());
    }
    if input_rate == 0 || output_rate == 0 {
        return Err(format!(
            "invalid sample rates {} -> {}",
            input_rate, output_rate
        ));
    }

    let frames = channels.iter().map(Vec::len).max().unwrap_or(0);
    let ratio = output_rate as f64 / input_rate as f64;
    let expected = (frames as f64 * ratio).ceil() as usize;

    let mut resampler = FftFixedIn::<f32>::new(
        input_rate as usize,
        output_rate as usize,
        CHUNK_SIZE,
        2,
        channels.len(),
    )
    .map_err(|e| format!("failed to create resampler: {}", e))?;

    let delay = resampler.output_delay();
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + delay); channels.len()];
    let mut position = 0usize;

    tracing::debug!(
        "Resampling {} frames: {}Hz -> {}Hz ({} channels)",
        frames,
        input_rate,
        output_rate,
        channels.len()
    );

    // Feed zero-padded chunks until the delayed tail has come out.
    while output.first().map_or(0, Vec::len) < expected + delay {
        let chunk: Vec<Vec<f32>> = channels
            .iter()
            .map(|channel| {
                let start = position.min(channel.len());
                let end = (position + CHUNK_SIZE).min(channel.len());
                let mut samples = channel[start..end].to_vec();
                samples.resize(CHUNK_SIZE, 0.0);
                samples
            })
            .collect();
        position += CHUNK_SIZE;

        let resampled = resampler
            .process(&chunk, None)
            .map_err(|e| format!("resampling error: {}", e))?;
        for (dst, src) in output.iter_mut().zip(resampled) {
            dst.extend(src);
        }
    }

    for channel in &mut output {
        channel.drain(..delay.min(channel.len()));
        channel.truncate(expected);
    }
    Ok(output)
}
