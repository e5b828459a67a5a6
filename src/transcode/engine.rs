//! Transcode engine built around the system ffmpeg binary.
//!
//! The engine is an explicitly owned resource: `load()` locates and probes
//! ffmpeg and prepares a scratch working directory, `convert()` runs one
//! transcode against that directory, and `cleanup()` best-effort removes the
//! intermediate files. Conversions against one engine are serialized by the
//! `&mut self` receiver.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use crate::config::TranscodeConfig;
use crate::error::{Error, Result};
use crate::media::{AudioFormat, MediaBlob, SEGMENT_CONTENT_TYPE};
use crate::util::retry;
use crate::util::retry_fixed;

use super::ffmpeg::find_ffmpeg;
use super::playlist::{self, PlaylistStatus};

/// Base name of the transcode products inside the scratch directory.
const OUTPUT_STEM: &str = "episode";

/// A named output file from an HLS conversion.
#[derive(Debug, Clone)]
pub struct SegmentFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Engine load state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    /// `load()` has not run yet
    Idle,
    /// ffmpeg located and scratch directory ready
    Ready,
    /// The last `load()` failed; calling `load()` again retries
    Failed,
}

/// Owns the ffmpeg binary path and the scratch directory used for conversions.
pub struct TranscodeEngine {
    state: EngineState,
    ffmpeg: Option<PathBuf>,
    workdir: PathBuf,
    audio_bitrate: String,
    hls_segment_seconds: u32,
}

impl TranscodeEngine {
    /// Creates an engine in the idle state. Call `load()` before converting.
    pub fn new(config: &TranscodeConfig) -> Self {
        let workdir = std::env::temp_dir().join(format!("castup-transcode-{}", std::process::id()));
        Self {
            state: EngineState::Idle,
            ffmpeg: None,
            workdir,
            audio_bitrate: config.audio_bitrate.clone(),
            hls_segment_seconds: config.hls_segment_seconds,
        }
    }

    /// Initializes the engine: locates ffmpeg, probes it, prepares the scratch
    /// directory. Idempotent once loaded; a failed load can be retried by
    /// calling `load()` again.
    ///
    /// # Errors
    /// - `Error::LoadFailed` if ffmpeg cannot be found or does not respond
    pub fn load(&mut self) -> Result<()> {
        if self.state == EngineState::Ready {
            return Ok(());
        }

        let result = self.try_load();
        self.state = if result.is_ok() {
            EngineState::Ready
        } else {
            EngineState::Failed
        };
        result
    }

    fn try_load(&mut self) -> Result<()> {
        let ffmpeg_path = find_ffmpeg()?;

        // Probe the binary so a broken install fails here, not mid-conversion
        let probe = Command::new(&ffmpeg_path)
            .arg("-version")
            .output()
            .map_err(|e| Error::LoadFailed(format!("ffmpeg probe failed: {e}")))?;
        if !probe.status.success() {
            return Err(Error::LoadFailed(format!(
                "ffmpeg probe exited with status {}",
                probe.status
            )));
        }

        fs::create_dir_all(&self.workdir)
            .map_err(|e| Error::LoadFailed(format!("Failed to create scratch directory: {e}")))?;

        tracing::info!(
            "Transcoder ready: {} (scratch: {})",
            ffmpeg_path.display(),
            self.workdir.display()
        );
        self.ffmpeg = Some(ffmpeg_path);
        Ok(())
    }

    /// Returns whether the engine is loaded and ready to convert.
    pub fn is_loaded(&self) -> bool {
        self.state == EngineState::Ready
    }

    /// Converts the input blob into the requested format.
    ///
    /// The input is written into the scratch directory (up to 3 attempts with
    /// a short fixed delay), ffmpeg is invoked with the format's argument
    /// set, and the output is read back (same retry policy). For `m3u8` the
    /// playlist is patched to guarantee the end-of-list marker before being
    /// wrapped into the returned blob.
    ///
    /// # Errors
    /// - `Error::LoadFailed` if the engine is not loaded
    /// - `Error::TranscodeFailed` if any step exhausts its retries or ffmpeg
    ///   exits nonzero; no partial output is returned
    pub fn convert(&mut self, input: &MediaBlob, format: AudioFormat) -> Result<MediaBlob> {
        let ffmpeg = match (&self.state, &self.ffmpeg) {
            (EngineState::Ready, Some(path)) => path.clone(),
            _ => {
                return Err(Error::LoadFailed(
                    "Transcoder is not loaded; call load() first".to_string(),
                ))
            }
        };

        let input_path = self.workdir.join(input_file_name(&input.content_type));
        retry_fixed(retry::DEFAULT_ATTEMPTS, retry::DEFAULT_DELAY, || {
            fs::write(&input_path, &input.bytes)
        })
        .map_err(|e| Error::TranscodeFailed(format!("Failed to stage input: {e}")))?;

        let output_path = self
            .workdir
            .join(format!("{OUTPUT_STEM}.{}", format.extension()));

        let mut cmd = Command::new(&ffmpeg);
        cmd.arg("-loglevel")
            .arg("error")
            .arg("-y") // Overwrite output
            .arg("-i")
            .arg(&input_path)
            .arg("-vn");

        match format {
            AudioFormat::Mp3 => {
                cmd.arg("-acodec")
                    .arg("libmp3lame")
                    .arg("-b:a")
                    .arg(&self.audio_bitrate);
            }
            AudioFormat::M4a => {
                cmd.arg("-acodec")
                    .arg("aac")
                    .arg("-b:a")
                    .arg(&self.audio_bitrate)
                    .arg("-movflags")
                    .arg("+faststart");
            }
            AudioFormat::M3u8 => {
                let segment_template = self.workdir.join(format!("{OUTPUT_STEM}_%03d.ts"));
                cmd.arg("-acodec")
                    .arg("aac")
                    .arg("-b:a")
                    .arg(&self.audio_bitrate)
                    .arg("-hls_time")
                    .arg(self.hls_segment_seconds.to_string())
                    .arg("-hls_playlist_type")
                    .arg("vod")
                    .arg("-hls_flags")
                    .arg("independent_segments")
                    .arg("-hls_segment_type")
                    .arg("mpegts")
                    .arg("-hls_segment_filename")
                    .arg(&segment_template);
            }
        }
        cmd.arg(&output_path);

        tracing::debug!("Running ffmpeg for {} conversion", format);
        let output = cmd
            .output()
            .map_err(|e| Error::TranscodeFailed(format!("ffmpeg invocation failed: {e}")))?;

        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            tracing::error!("ffmpeg conversion failed: {}", error_msg);
            return Err(Error::TranscodeFailed(format!(
                "ffmpeg exited with status {}: {error_msg}",
                output.status
            )));
        }

        let bytes = retry_fixed(retry::DEFAULT_ATTEMPTS, retry::DEFAULT_DELAY, || {
            fs::read(&output_path)
        })
        .map_err(|e| Error::TranscodeFailed(format!("Failed to read output: {e}")))?;

        let bytes = if format == AudioFormat::M3u8 {
            // Guarantee the end-of-list marker, on disk and in the returned blob
            let text = String::from_utf8_lossy(&bytes);
            let patched = playlist::ensure_endlist(&text);
            if patched.as_bytes() != bytes.as_slice() {
                fs::write(&output_path, &patched)
                    .map_err(|e| Error::TranscodeFailed(format!("Failed to patch playlist: {e}")))?;
            }
            patched.into_bytes()
        } else {
            bytes
        };

        tracing::info!(
            "Converted {} bytes ({}) to {} bytes ({})",
            input.len(),
            input.content_type,
            bytes.len(),
            format.content_type()
        );

        Ok(MediaBlob::new(bytes, format.content_type()))
    }

    /// Returns the current playlist text with its completeness marker.
    ///
    /// # Errors
    /// - If no playlist has been produced yet
    pub fn playlist_status(&self) -> Result<PlaylistStatus> {
        let path = self.workdir.join(format!("{OUTPUT_STEM}.m3u8"));
        let text = fs::read_to_string(&path)?;
        let complete = playlist::is_complete(&text);
        Ok(PlaylistStatus { text, complete })
    }

    /// Returns whether the scratch directory is listable.
    ///
    /// Never errors: an unlistable directory reports as unhealthy.
    pub fn filesystem_health(&self) -> bool {
        match fs::read_dir(&self.workdir) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Scratch directory unlistable: {}", e);
                false
            }
        }
    }

    /// Collects the playlist plus every segment file produced by the last
    /// HLS conversion, playlist first.
    ///
    /// # Errors
    /// - `Error::NoFilesFound` if there is no playlist or the segment set is empty
    pub fn collect_segments(&self) -> Result<Vec<SegmentFile>> {
        let playlist_path = self.workdir.join(format!("{OUTPUT_STEM}.m3u8"));
        let playlist_bytes = fs::read(&playlist_path).map_err(|e| {
            tracing::warn!("Playlist missing during collection: {}", e);
            Error::NoFilesFound
        })?;
        let referenced = playlist::segment_names(&String::from_utf8_lossy(&playlist_bytes));

        let mut segment_paths: Vec<PathBuf> = fs::read_dir(&self.workdir)?
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                let name = path.file_name()?.to_str()?;
                if name.starts_with(OUTPUT_STEM) && name.ends_with(".ts") {
                    Some(path)
                } else {
                    None
                }
            })
            .collect();
        segment_paths.sort();

        if segment_paths.is_empty() {
            return Err(Error::NoFilesFound);
        }

        if referenced.len() != segment_paths.len() {
            tracing::warn!(
                "Playlist references {} segments but {} were found on disk",
                referenced.len(),
                segment_paths.len()
            );
        }

        let mut files = Vec::with_capacity(segment_paths.len() + 1);
        files.push(SegmentFile {
            name: format!("{OUTPUT_STEM}.m3u8"),
            bytes: playlist_bytes,
            content_type: AudioFormat::M3u8.content_type().to_string(),
        });

        for path in segment_paths {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let bytes = retry_fixed(retry::DEFAULT_ATTEMPTS, retry::DEFAULT_DELAY, || {
                fs::read(&path)
            })
            .map_err(|e| Error::TranscodeFailed(format!("Failed to read segment {name}: {e}")))?;
            files.push(SegmentFile {
                name,
                bytes,
                content_type: SEGMENT_CONTENT_TYPE.to_string(),
            });
        }

        tracing::debug!("Collected {} HLS files", files.len());
        Ok(files)
    }

    /// Best-effort removal of all scratch files.
    ///
    /// Individual deletion failures are logged and swallowed; cleanup never
    /// blocks subsequent operations.
    pub fn cleanup(&mut self) {
        let entries = match fs::read_dir(&self.workdir) {
            Ok(entries) => entries,
            Err(_) => return,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("Failed to delete scratch file {}: {}", path.display(), e);
            }
        }

        if let Err(e) = fs::remove_dir(&self.workdir) {
            tracing::debug!("Scratch directory not removed: {}", e);
        }
    }
}

impl Drop for TranscodeEngine {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Names the staged input file so ffmpeg sees a familiar extension.
fn input_file_name(content_type: &str) -> String {
    let extension = match content_type {
        "audio/wav" => "wav",
        "audio/mpeg" => "mp3",
        "audio/mp4" | "audio/x-m4a" | "audio/m4a" => "m4a",
        "audio/ogg" => "ogg",
        _ => "bin",
    };
    format!("input.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_engine(workdir: PathBuf) -> TranscodeEngine {
        fs::create_dir_all(&workdir).unwrap();
        TranscodeEngine {
            state: EngineState::Ready,
            ffmpeg: Some(PathBuf::from("/usr/bin/ffmpeg")),
            workdir,
            audio_bitrate: "128k".to_string(),
            hls_segment_seconds: 2,
        }
    }

    fn test_workdir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("castup-engine-test-{tag}-{}", std::process::id()))
    }

    #[test]
    fn test_convert_requires_load() {
        let mut engine = TranscodeEngine::new(&TranscodeConfig::default());
        let blob = MediaBlob::new(vec![0u8; 16], "audio/wav");
        assert!(matches!(
            engine.convert(&blob, AudioFormat::Mp3),
            Err(Error::LoadFailed(_))
        ));
    }

    #[test]
    fn test_filesystem_health_false_for_missing_dir() {
        let engine = TranscodeEngine::new(&TranscodeConfig::default());
        // Scratch dir is only created by load()
        assert!(!engine.filesystem_health());
    }

    #[test]
    fn test_collect_segments_empty_dir_is_no_files() {
        let mut engine = ready_engine(test_workdir("empty"));
        assert!(matches!(engine.collect_segments(), Err(Error::NoFilesFound)));
        engine.cleanup();
    }

    #[test]
    fn test_collect_segments_orders_playlist_first() {
        let workdir = test_workdir("collect");
        let mut engine = ready_engine(workdir.clone());

        fs::write(
            workdir.join("episode.m3u8"),
            "#EXTM3U\n#EXTINF:2.0,\nepisode_000.ts\n#EXT-X-ENDLIST\n",
        )
        .unwrap();
        fs::write(workdir.join("episode_001.ts"), b"bbbb").unwrap();
        fs::write(workdir.join("episode_000.ts"), b"aaaa").unwrap();

        let files = engine.collect_segments().unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(files[0].name, "episode.m3u8");
        assert_eq!(files[0].content_type, "application/x-mpegURL");
        assert_eq!(files[1].name, "episode_000.ts");
        assert_eq!(files[2].name, "episode_001.ts");
        assert_eq!(files[1].content_type, SEGMENT_CONTENT_TYPE);

        engine.cleanup();
    }

    #[test]
    fn test_playlist_missing_segments_is_no_files() {
        let workdir = test_workdir("nosegs");
        let mut engine = ready_engine(workdir.clone());
        fs::write(workdir.join("episode.m3u8"), "#EXTM3U\n#EXT-X-ENDLIST\n").unwrap();

        assert!(matches!(engine.collect_segments(), Err(Error::NoFilesFound)));
        engine.cleanup();
    }

    #[test]
    fn test_playlist_status_reports_completeness() {
        let workdir = test_workdir("status");
        let mut engine = ready_engine(workdir.clone());
        fs::write(workdir.join("episode.m3u8"), "#EXTM3U\nepisode_000.ts\n").unwrap();

        let status = engine.playlist_status().unwrap();
        assert!(!status.complete);

        fs::write(
            workdir.join("episode.m3u8"),
            "#EXTM3U\nepisode_000.ts\n#EXT-X-ENDLIST\n",
        )
        .unwrap();
        let status = engine.playlist_status().unwrap();
        assert!(status.complete);

        engine.cleanup();
    }

    #[test]
    fn test_cleanup_removes_scratch_files() {
        let workdir = test_workdir("cleanup");
        let mut engine = ready_engine(workdir.clone());
        fs::write(workdir.join("episode.m3u8"), "#EXTM3U\n").unwrap();

        engine.cleanup();
        assert!(!workdir.exists());
    }

    #[test]
    fn test_input_file_name_follows_mime() {
        assert_eq!(input_file_name("audio/wav"), "input.wav");
        assert_eq!(input_file_name("audio/x-m4a"), "input.m4a");
        assert_eq!(input_file_name("application/octet-stream"), "input.bin");
    }
}
