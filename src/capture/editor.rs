//! Destructive editing of stopped recordings.
//!
//! Edits operate on decoded PCM data: mark a time region, trim it out, or
//! splice newly recorded audio into it. The result is re-encoded as a WAV
//! container so it can flow through the same transcode/upload path as an
//! untouched recording.

use std::io::Cursor;

use crate::error::{Error, Result};
use crate::media::MediaBlob;

use super::recorder::encode_wav_blob;

/// Decodes a WAV blob into mono i16 samples plus the sample rate.
///
/// # Errors
/// - `Error::InvalidInput` if the blob is not 16-bit integer PCM
/// - If the WAV container is malformed
pub fn decode_wav(blob: &MediaBlob) -> Result<(Vec<i16>, u32)> {
    let mut reader = hound::WavReader::new(Cursor::new(&blob.bytes))?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(Error::InvalidInput(
            "Only 16-bit PCM recordings can be edited.".to_string(),
        ));
    }

    let channels = spec.channels as usize;
    let samples: Vec<i16> = reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()?;

    // Downmix to mono if the source was multi-channel
    let mono = if channels <= 1 {
        samples
    } else {
        samples
            .chunks_exact(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect()
    };

    Ok((mono, spec.sample_rate))
}

/// Re-encodes mono samples into a WAV blob.
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<MediaBlob> {
    encode_wav_blob(samples, sample_rate)
}

/// Removes the region `[start_sec, end_sec)` from the samples.
///
/// # Errors
/// - `Error::InvalidInput` if the region is inverted, negative, or starts
///   beyond the end of the recording
pub fn trim_region(samples: &[i16], sample_rate: u32, start_sec: f32, end_sec: f32) -> Result<Vec<i16>> {
    let (start, end) = region_bounds(samples.len(), sample_rate, start_sec, end_sec)?;

    let mut edited = Vec::with_capacity(samples.len() - (end - start));
    edited.extend_from_slice(&samples[..start]);
    edited.extend_from_slice(&samples[end..]);

    tracing::debug!(
        "Trimmed {:.2}s-{:.2}s: {} samples -> {}",
        start_sec,
        end_sec,
        samples.len(),
        edited.len()
    );

    Ok(edited)
}

/// Replaces the region `[start_sec, end_sec)` with `replacement` samples.
///
/// The replacement may be shorter or longer than the removed region.
///
/// # Errors
/// - `Error::InvalidInput` if the region is inverted, negative, or starts
///   beyond the end of the recording
pub fn splice_region(
    samples: &[i16],
    sample_rate: u32,
    start_sec: f32,
    end_sec: f32,
    replacement: &[i16],
) -> Result<Vec<i16>> {
    let (start, end) = region_bounds(samples.len(), sample_rate, start_sec, end_sec)?;

    let mut edited = Vec::with_capacity(samples.len() - (end - start) + replacement.len());
    edited.extend_from_slice(&samples[..start]);
    edited.extend_from_slice(replacement);
    edited.extend_from_slice(&samples[end..]);

    tracing::debug!(
        "Spliced {} replacement samples into {:.2}s-{:.2}s",
        replacement.len(),
        start_sec,
        end_sec
    );

    Ok(edited)
}

/// Converts a second-based region into clamped sample indices.
fn region_bounds(
    sample_count: usize,
    sample_rate: u32,
    start_sec: f32,
    end_sec: f32,
) -> Result<(usize, usize)> {
    if start_sec < 0.0 || end_sec < 0.0 || end_sec <= start_sec {
        return Err(Error::InvalidInput(format!(
            "Invalid region: {start_sec}s to {end_sec}s"
        )));
    }

    let start = (start_sec * sample_rate as f32) as usize;
    let end = ((end_sec * sample_rate as f32) as usize).min(sample_count);

    if start >= sample_count {
        return Err(Error::InvalidInput(format!(
            "Region starts at {start_sec}s, beyond the end of the recording"
        )));
    }

    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_removes_middle_region() {
        // 2 seconds of audio at 4 Hz for easy arithmetic
        let samples: Vec<i16> = (0..8).collect();
        let edited = trim_region(&samples, 4, 0.5, 1.0).unwrap();
        assert_eq!(edited, vec![0, 1, 4, 5, 6, 7]);
    }

    #[test]
    fn test_trim_rejects_inverted_region() {
        let samples: Vec<i16> = (0..8).collect();
        assert!(matches!(
            trim_region(&samples, 4, 1.0, 0.5),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_trim_rejects_region_past_end() {
        let samples: Vec<i16> = (0..8).collect();
        assert!(trim_region(&samples, 4, 5.0, 6.0).is_err());
    }

    #[test]
    fn test_splice_replaces_region() {
        let samples: Vec<i16> = (0..8).collect();
        let edited = splice_region(&samples, 4, 0.25, 0.75, &[100, 100, 100, 100]).unwrap();
        assert_eq!(edited, vec![0, 100, 100, 100, 100, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_splice_with_empty_replacement_equals_trim() {
        let samples: Vec<i16> = (0..8).collect();
        let spliced = splice_region(&samples, 4, 0.5, 1.0, &[]).unwrap();
        let trimmed = trim_region(&samples, 4, 0.5, 1.0).unwrap();
        assert_eq!(spliced, trimmed);
    }

    #[test]
    fn test_wav_round_trip() {
        let samples: Vec<i16> = vec![0, 500, -500, 32767, -32768];
        let blob = encode_wav(&samples, 22050).unwrap();
        let (decoded, rate) = decode_wav(&blob).unwrap();
        assert_eq!(decoded, samples);
        assert_eq!(rate, 22050);
    }
}
