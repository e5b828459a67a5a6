//! Microphone recording source.
//!
//! State machine over `AudioRecorder`: idle → recording → stopped. The
//! stopped blob can be destructively edited (trim a region, or splice a
//! re-recorded take into one) before being handed to the pipeline.

use crate::capture::{editor, AudioRecorder};
use crate::error::{Error, Result};
use crate::media::MediaBlob;

/// Lifecycle of the record source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Idle,
    Recording,
    Stopped,
}

/// Acquires audio from the microphone and holds the sealed recording.
pub struct RecordSource {
    recorder: AudioRecorder,
    state: RecordState,
    blob: Option<MediaBlob>,
    duration: Option<f64>,
}

impl RecordSource {
    pub fn new(sample_rate: u32, device_name: String) -> Self {
        Self {
            recorder: AudioRecorder::new(sample_rate, device_name),
            state: RecordState::Idle,
            blob: None,
            duration: None,
        }
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    /// Starts capturing. A previously stopped take is discarded.
    ///
    /// # Errors
    /// - `Error::InvalidInput` if already recording
    /// - `Error::PermissionDenied` if the device cannot be opened
    pub fn start(&mut self, byte_limit: Option<u64>) -> Result<()> {
        if self.state == RecordState::Recording {
            return Err(Error::InvalidInput(
                "A recording is already in progress.".to_string(),
            ));
        }

        self.blob = None;
        self.duration = None;
        self.recorder.start(byte_limit)?;
        self.state = RecordState::Recording;
        Ok(())
    }

    /// Stops capturing and seals the take.
    ///
    /// A stop with no captured samples returns the source to idle.
    pub fn stop(&mut self) -> Result<()> {
        if self.state != RecordState::Recording {
            return Ok(());
        }

        let elapsed = self.recorder.elapsed_seconds() as f64;
        match self.recorder.stop()? {
            Some(blob) => {
                self.blob = Some(blob);
                self.duration = Some(elapsed);
                self.state = RecordState::Stopped;
            }
            None => {
                self.state = RecordState::Idle;
            }
        }
        Ok(())
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.recorder.elapsed_seconds()
    }

    pub fn captured_bytes(&self) -> u64 {
        self.recorder.captured_bytes()
    }

    pub fn limit_reached(&self) -> bool {
        self.recorder.limit_reached()
    }

    pub fn toggle_pause(&self) {
        self.recorder.toggle_pause();
    }

    pub fn is_paused(&self) -> bool {
        self.recorder.is_paused()
    }

    /// The sealed take, when stopped.
    pub fn blob(&self) -> Option<&MediaBlob> {
        self.blob.as_ref()
    }

    /// Recorded duration in seconds, when stopped.
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Hands the sealed take onward, returning the source to idle.
    pub fn take(&mut self) -> Option<(MediaBlob, Option<f64>)> {
        let blob = self.blob.take()?;
        let duration = self.duration.take();
        self.state = RecordState::Idle;
        Some((blob, duration))
    }

    /// Removes the region `[start_sec, end_sec)` from the stopped take.
    ///
    /// # Errors
    /// - `Error::InvalidInput` if there is no stopped take or the region is invalid
    pub fn trim(&mut self, start_sec: f32, end_sec: f32) -> Result<()> {
        let blob = self.stopped_blob()?;
        let (samples, rate) = editor::decode_wav(blob)?;
        let edited = editor::trim_region(&samples, rate, start_sec, end_sec)?;
        self.replace_take(edited, rate)
    }

    /// Replaces the region `[start_sec, end_sec)` with another recording.
    ///
    /// # Errors
    /// - `Error::InvalidInput` if there is no stopped take, the region is
    ///   invalid, or the replacement's sample rate differs
    pub fn splice(&mut self, start_sec: f32, end_sec: f32, replacement: &MediaBlob) -> Result<()> {
        let blob = self.stopped_blob()?;
        let (samples, rate) = editor::decode_wav(blob)?;
        let (replacement_samples, replacement_rate) = editor::decode_wav(replacement)?;

        if replacement_rate != rate {
            return Err(Error::InvalidInput(format!(
                "Replacement sample rate {replacement_rate}Hz does not match the take ({rate}Hz)."
            )));
        }

        let edited =
            editor::splice_region(&samples, rate, start_sec, end_sec, &replacement_samples)?;
        self.replace_take(edited, rate)
    }

    /// Drops the pending take without confirmation.
    pub fn discard(&mut self) {
        if self.blob.take().is_some() {
            tracing::debug!("Pending recording discarded");
        }
        self.duration = None;
        self.state = RecordState::Idle;
    }

    fn stopped_blob(&self) -> Result<&MediaBlob> {
        self.blob.as_ref().ok_or_else(|| {
            Error::InvalidInput("No stopped recording to edit.".to_string())
        })
    }

    fn replace_take(&mut self, samples: Vec<i16>, rate: u32) -> Result<()> {
        self.duration = Some(samples.len() as f64 / rate as f64);
        self.blob = Some(editor::encode_wav(&samples, rate)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::editor::encode_wav;

    fn stopped_source(samples: &[i16], rate: u32) -> RecordSource {
        let mut source = RecordSource::new(rate, "default".to_string());
        source.blob = Some(encode_wav(samples, rate).unwrap());
        source.duration = Some(samples.len() as f64 / rate as f64);
        source.state = RecordState::Stopped;
        source
    }

    #[test]
    fn test_trim_updates_take_and_duration() {
        let samples: Vec<i16> = (0..8).collect();
        let mut source = stopped_source(&samples, 4);

        source.trim(0.0, 1.0).unwrap();

        let (decoded, _) = editor::decode_wav(source.blob().unwrap()).unwrap();
        assert_eq!(decoded, vec![4, 5, 6, 7]);
        assert_eq!(source.duration(), Some(1.0));
    }

    #[test]
    fn test_splice_rejects_rate_mismatch() {
        let samples: Vec<i16> = (0..8).collect();
        let mut source = stopped_source(&samples, 4);
        let replacement = encode_wav(&[1, 2], 8).unwrap();

        assert!(matches!(
            source.splice(0.0, 1.0, &replacement),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_edit_requires_stopped_take() {
        let mut source = RecordSource::new(44100, "default".to_string());
        assert!(matches!(
            source.trim(0.0, 1.0),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_take_returns_to_idle() {
        let samples: Vec<i16> = (0..4).collect();
        let mut source = stopped_source(&samples, 4);

        let (blob, duration) = source.take().unwrap();
        assert!(!blob.is_empty());
        assert_eq!(duration, Some(1.0));
        assert_eq!(source.state(), RecordState::Idle);
        assert!(source.take().is_none());
    }

    #[test]
    fn test_discard_drops_pending_take() {
        let samples: Vec<i16> = (0..4).collect();
        let mut source = stopped_source(&samples, 4);
        source.discard();
        assert!(source.blob().is_none());
        assert_eq!(source.state(), RecordState::Idle);
    }
}
