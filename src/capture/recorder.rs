//! Audio capture module.
//!
//! This module handles audio input device management and PCM sample capture.
//! Audio is captured from the configured input device, converted to mono, and
//! sealed into an in-memory WAV blob on stop. A capture session tracks its
//! accumulated byte count and can enforce a size ceiling: when the ceiling is
//! crossed a flag is raised so the driving loop force-stops the recording.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use hound::WavWriter;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::media::MediaBlob;

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Records audio from a specified or default input device.
///
/// Features:
/// - Captures from a specified input device or system default at its native sample rate
/// - Converts multi-channel audio to mono by averaging channels
/// - Tracks accumulated bytes and elapsed duration while recording
/// - Optional byte ceiling with a force-stop flag (crossing is detected on or
///   after the threshold, never before)
/// - Pause and resume support
pub struct AudioRecorder {
    /// Actual recording sample rate from device
    sample_rate: u32,
    /// Recorded audio samples (i16 PCM mono)
    samples: Arc<Mutex<Vec<i16>>>,
    /// Active audio input stream (kept alive during recording)
    stream: Option<cpal::Stream>,
    /// Whether recording is currently paused
    is_paused: Arc<Mutex<bool>>,
    /// Accumulated PCM bytes delivered by the device callback
    captured_bytes: Arc<AtomicU64>,
    /// Raised by the callback once the byte ceiling is crossed
    limit_reached: Arc<AtomicBool>,
    /// Device name or "default" to use the system default device
    device_name: String,
}

impl AudioRecorder {
    /// Creates a new audio recorder with requested sample rate and device.
    ///
    /// # Arguments
    /// * `requested_sample_rate` - The desired sample rate in Hz (actual may differ based on device)
    /// * `device_name` - Device name/ID to use. Use "default" for system default device
    ///
    /// Note: The actual recording sample rate may differ based on device capabilities.
    /// Call `sample_rate()` after `start()` to get the actual rate.
    pub fn new(requested_sample_rate: u32, device_name: String) -> Self {
        Self {
            sample_rate: requested_sample_rate,
            samples: Arc::new(Mutex::new(Vec::new())),
            stream: None,
            is_paused: Arc::new(Mutex::new(false)),
            captured_bytes: Arc::new(AtomicU64::new(0)),
            limit_reached: Arc::new(AtomicBool::new(false)),
            device_name,
        }
    }

    /// Starts recording from the configured input device.
    ///
    /// When `byte_limit` is set, the capture callback raises the
    /// `limit_reached` flag once the accumulated bytes cross it; the driving
    /// loop is expected to observe the flag and call `stop()`.
    ///
    /// # Errors
    /// - `Error::InvalidInput` if a recording is already in progress (no side effects)
    /// - `Error::PermissionDenied` if the device is unavailable or cannot be opened
    pub fn start(&mut self, byte_limit: Option<u64>) -> Result<()> {
        if self.stream.is_some() {
            return Err(Error::InvalidInput(
                "A recording is already in progress.".to_string(),
            ));
        }

        // Get device while suppressing ALSA library warnings
        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();

            if self.device_name == "default" {
                host.default_input_device().ok_or_else(|| {
                    Error::PermissionDenied("No audio input device available".to_string())
                })
            } else {
                // Try to find device by name or index
                find_device_by_name(&host, &self.device_name)
            }
        })?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Recording device: {}", device_name);

        let device_config = device
            .default_input_config()
            .map_err(|e| Error::PermissionDenied(format!("Device configuration failed: {e}")))?;
        let device_sample_rate = device_config.sample_rate().0;
        let num_channels = device_config.channels() as usize;

        if device_sample_rate != self.sample_rate {
            tracing::warn!(
                "Requested sample rate {}Hz but device uses {}Hz. Recording at device rate.",
                self.sample_rate,
                device_sample_rate
            );
        }

        tracing::debug!(
            "Device configuration: {}Hz, {} channels, byte limit: {:?}",
            device_sample_rate,
            num_channels,
            byte_limit
        );

        // Update to actual device parameters and reset session counters
        self.sample_rate = device_sample_rate;
        self.samples.lock().unwrap().clear();
        self.captured_bytes.store(0, Ordering::Relaxed);
        self.limit_reached.store(false, Ordering::Relaxed);
        *self.is_paused.lock().unwrap() = false;

        // Set up audio callback with cloned Arc references
        let samples_arc = Arc::clone(&self.samples);
        let pause_arc = Arc::clone(&self.is_paused);
        let bytes_arc = Arc::clone(&self.captured_bytes);
        let limit_arc = Arc::clone(&self.limit_reached);
        let callback_channels = num_channels;

        let stream = device
            .build_input_stream(
                &device_config.into(),
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let is_paused = *pause_arc.lock().unwrap();
                    if !is_paused {
                        Self::handle_audio_callback(
                            data,
                            &samples_arc,
                            &bytes_arc,
                            &limit_arc,
                            callback_channels,
                            byte_limit,
                        );
                    }
                },
                |err| {
                    tracing::error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| Error::PermissionDenied(format!("Audio stream creation failed: {e}")))?;

        stream
            .play()
            .map_err(|e| Error::PermissionDenied(format!("Audio stream start failed: {e}")))?;
        self.stream = Some(stream);

        tracing::debug!("Audio stream started");
        Ok(())
    }

    /// Stops recording and seals the captured samples into a WAV blob.
    ///
    /// Stopping releases the input device. Calling `stop()` when not
    /// recording is a no-op returning `None`, as is stopping a session that
    /// captured no samples.
    ///
    /// # Errors
    /// - If WAV encoding fails
    pub fn stop(&mut self) -> Result<Option<MediaBlob>> {
        if self.stream.is_none() {
            return Ok(None);
        }

        // Drop the stream to stop capture and release the device
        self.stream = None;

        let samples = self.samples.lock().unwrap().clone();
        let sample_count = samples.len();

        if sample_count == 0 {
            tracing::warn!("Recording stopped with no samples captured");
            return Ok(None);
        }

        let duration_secs = sample_count as f32 / self.sample_rate as f32;
        tracing::info!(
            "Recording stopped: {:.2}s ({} samples at {}Hz)",
            duration_secs,
            sample_count,
            self.sample_rate
        );

        let blob = encode_wav_blob(&samples, self.sample_rate)?;
        tracing::debug!("Recording sealed: {} bytes ({})", blob.len(), blob.content_type);

        Ok(Some(blob))
    }

    /// Handles incoming audio data from the audio callback.
    ///
    /// Converts multi-channel audio to mono by averaging all channels,
    /// updates the byte counter, and raises the limit flag once the ceiling
    /// is crossed.
    fn handle_audio_callback(
        data: &[i16],
        samples_arc: &Arc<Mutex<Vec<i16>>>,
        bytes_arc: &Arc<AtomicU64>,
        limit_arc: &Arc<AtomicBool>,
        num_channels: usize,
        byte_limit: Option<u64>,
    ) {
        let mut samples = samples_arc.lock().unwrap();
        let before = samples.len();

        match num_channels {
            1 => {
                // Mono: use samples directly
                samples.extend_from_slice(data);
            }
            2 => {
                // Stereo: average pairs of samples
                for chunk in data.chunks_exact(2) {
                    let left = chunk[0] as i32;
                    let right = chunk[1] as i32;
                    let mono = ((left + right) / 2) as i16;
                    samples.push(mono);
                }
            }
            _ => {
                // Multi-channel: average all channels per sample
                for chunk in data.chunks_exact(num_channels) {
                    let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
                    let mono = (sum / num_channels as i32) as i16;
                    samples.push(mono);
                }
            }
        }

        let appended = (samples.len() - before) as u64 * 2;
        let total = bytes_arc.fetch_add(appended, Ordering::Relaxed) + appended;

        if let Some(limit) = byte_limit {
            if total >= limit {
                limit_arc.store(true, Ordering::Relaxed);
            }
        }
    }

    /// Returns whether a capture stream is currently active.
    pub fn is_recording(&self) -> bool {
        self.stream.is_some()
    }

    /// Returns the accumulated PCM byte count of the current session.
    pub fn captured_bytes(&self) -> u64 {
        self.captured_bytes.load(Ordering::Relaxed)
    }

    /// Returns whether the byte ceiling was crossed.
    pub fn limit_reached(&self) -> bool {
        self.limit_reached.load(Ordering::Relaxed)
    }

    /// Returns the recorded duration in seconds, derived from the sample count.
    pub fn elapsed_seconds(&self) -> f32 {
        let sample_count = self.samples.lock().unwrap().len();
        sample_count as f32 / self.sample_rate as f32
    }

    /// Returns the actual sample rate of the recording.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Pauses recording without stopping the audio stream or losing samples.
    pub fn pause(&self) {
        *self.is_paused.lock().unwrap() = true;
        tracing::debug!("Recording paused");
    }

    /// Resumes recording from a paused state.
    pub fn resume(&self) {
        *self.is_paused.lock().unwrap() = false;
        tracing::debug!("Recording resumed");
    }

    /// Returns whether recording is currently paused.
    pub fn is_paused(&self) -> bool {
        *self.is_paused.lock().unwrap()
    }

    /// Toggles between paused and recording states.
    pub fn toggle_pause(&self) {
        let mut paused = self.is_paused.lock().unwrap();
        *paused = !*paused;
        if *paused {
            tracing::debug!("Recording paused");
        } else {
            tracing::debug!("Recording resumed");
        }
    }
}

/// Seals mono i16 samples into an in-memory WAV container.
pub(crate) fn encode_wav_blob(samples: &[i16], sample_rate: u32) -> Result<MediaBlob> {
    let wav_spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buffer = Vec::new();
    {
        let cursor = Cursor::new(&mut buffer);
        let mut writer = WavWriter::new(cursor, wav_spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }

    Ok(MediaBlob::new(buffer, "audio/wav"))
}

/// Finds an audio input device by name or numeric index.
///
/// # Arguments
/// * `host` - The cpal audio host
/// * `device_spec` - Either "default" for system default, a device name, or a numeric index (0, 1, 2, etc.)
///
/// # Errors
/// - If no device with the specified name/index is found
fn find_device_by_name(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device> {
    // Try to parse as a numeric index first
    if let Ok(index) = device_spec.parse::<usize>() {
        let devices: Vec<_> = host
            .input_devices()
            .map_err(|e| Error::PermissionDenied(format!("Failed to enumerate devices: {e}")))?
            .collect();

        if index < devices.len() {
            return Ok(devices.into_iter().nth(index).unwrap());
        } else {
            return Err(Error::PermissionDenied(format!(
                "Device index {} is out of range (0-{})",
                index,
                devices.len().saturating_sub(1)
            )));
        }
    }

    // Try to find by name
    let devices = host
        .input_devices()
        .map_err(|e| Error::PermissionDenied(format!("Failed to enumerate devices: {e}")))?;

    for device in devices {
        if let Ok(name) = device.name() {
            if name == device_spec {
                return Ok(device);
            }
        }
    }

    Err(Error::PermissionDenied(format!(
        "Audio input device '{device_spec}' not found. Use 'castup list-devices' to see available devices."
    )))
}

/// Temporarily redirects stderr to /dev/null to suppress ALSA library warnings on Linux.
/// On non-Linux platforms, this is a no-op since ALSA doesn't exist.
#[cfg(target_os = "linux")]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    // Open /dev/null for writing
    let dev_null = OpenOptions::new()
        .write(true)
        .open("/dev/null")
        .map_err(|e| Error::PermissionDenied(format!("Failed to open /dev/null: {e}")))?;

    let dev_null_fd = dev_null.as_raw_fd();

    // Save the current stderr file descriptor
    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return Err(Error::PermissionDenied(
            "Failed to duplicate stderr".to_string(),
        ));
    }

    // Redirect stderr to /dev/null
    let redirect_result = unsafe { libc::dup2(dev_null_fd, libc::STDERR_FILENO) };
    if redirect_result == -1 {
        unsafe { libc::close(old_stderr) };
        return Err(Error::PermissionDenied(
            "Failed to redirect stderr".to_string(),
        ));
    }

    // Execute the closure
    let result = f();

    // Restore the original stderr
    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

/// On non-Linux platforms, no stderr suppression is needed since ALSA doesn't exist.
#[cfg(not(target_os = "linux"))]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_callback(
        data: &[i16],
        channels: usize,
        limit: Option<u64>,
    ) -> (Vec<i16>, u64, bool) {
        let samples = Arc::new(Mutex::new(Vec::new()));
        let bytes = Arc::new(AtomicU64::new(0));
        let flag = Arc::new(AtomicBool::new(false));
        AudioRecorder::handle_audio_callback(data, &samples, &bytes, &flag, channels, limit);
        let captured = samples.lock().unwrap().clone();
        (
            captured,
            bytes.load(Ordering::Relaxed),
            flag.load(Ordering::Relaxed),
        )
    }

    #[test]
    fn test_mono_passthrough_counts_bytes() {
        let (samples, bytes, hit) = run_callback(&[1, 2, 3, 4], 1, None);
        assert_eq!(samples, vec![1, 2, 3, 4]);
        assert_eq!(bytes, 8);
        assert!(!hit);
    }

    #[test]
    fn test_stereo_downmix_averages_pairs() {
        let (samples, bytes, _) = run_callback(&[100, 200, -100, 100], 2, None);
        assert_eq!(samples, vec![150, 0]);
        assert_eq!(bytes, 4);
    }

    #[test]
    fn test_limit_flag_raised_on_or_after_crossing() {
        // 6 samples = 12 bytes against a 10 byte ceiling
        let (_, bytes, hit) = run_callback(&[1, 2, 3, 4, 5, 6], 1, Some(10));
        assert!(hit);
        assert!(bytes >= 10);
    }

    #[test]
    fn test_limit_flag_not_raised_below_ceiling() {
        let (_, bytes, hit) = run_callback(&[1, 2], 1, Some(10));
        assert!(!hit);
        assert_eq!(bytes, 4);
    }

    #[test]
    fn test_sealed_wav_has_riff_header() {
        let blob = encode_wav_blob(&[0, 1, -1, 32767], 44100).unwrap();
        assert_eq!(blob.content_type, "audio/wav");
        assert_eq!(&blob.bytes[0..4], b"RIFF");
        assert_eq!(&blob.bytes[8..12], b"WAVE");
        // 44-byte canonical header plus 2 bytes per sample
        assert_eq!(blob.len(), 44 + 8);
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let mut recorder = AudioRecorder::new(44100, "default".to_string());
        assert!(recorder.stop().unwrap().is_none());
    }
}
