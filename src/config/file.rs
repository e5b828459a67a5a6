//! Configuration file management for castup.
//!
//! This module handles loading and saving application configuration from TOML files.
//! Configuration is stored in the user's config directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Audio recording configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `castup list-devices`
    /// - device name from `castup list-devices`
    #[serde(default = "default_device")]
    pub device: String,
    /// Recording sample rate in Hz (actual rate follows the device)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    44100
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
        }
    }
}

/// Upload and backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Base URL of the episode backend, e.g. "http://localhost:3000"
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Size ceiling for locally selected files, in bytes
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    /// Size ceiling for microphone recordings, in bytes
    #[serde(default = "default_max_record_bytes")]
    pub max_record_bytes: u64,
    /// Whether the recording ceiling is enforced (force-stop on crossing)
    #[serde(default = "default_true")]
    pub limit_recordings: bool,
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_max_file_bytes() -> u64 {
    30 * 1000 * 1000
}

fn default_max_record_bytes() -> u64 {
    4 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_file_bytes: default_max_file_bytes(),
            max_record_bytes: default_max_record_bytes(),
            limit_recordings: default_true(),
        }
    }
}

/// Transcoding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeConfig {
    /// HLS segment duration in seconds
    #[serde(default = "default_segment_seconds")]
    pub hls_segment_seconds: u32,
    /// Audio bitrate passed to ffmpeg, e.g. "128k"
    #[serde(default = "default_bitrate")]
    pub audio_bitrate: String,
}

fn default_segment_seconds() -> u32 {
    2
}

fn default_bitrate() -> String {
    "128k".to_string()
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            hls_segment_seconds: default_segment_seconds(),
            audio_bitrate: default_bitrate(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CastupConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub transcode: TranscodeConfig,
}

impl CastupConfig {
    /// Loads configuration, writing a default file on first run.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the config file cannot be read or written
    /// - If the TOML is malformed
    pub fn load_or_init() -> anyhow::Result<Self> {
        let config_path = get_config_path()?;

        if !config_path.exists() {
            let config = CastupConfig::default();
            config.save()?;
            tracing::info!("Default configuration written: {}", config_path.display());
            return Ok(config);
        }

        let config_content = fs::read_to_string(&config_path)?;
        let config: CastupConfig = toml::from_str(&config_content)?;
        Ok(config)
    }

    /// Saves configuration to the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the file cannot be written
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = get_config_path()?;
        let config_content = toml::to_string_pretty(self)?;
        fs::write(&config_path, config_content)?;
        tracing::info!("Configuration saved");
        Ok(())
    }
}

/// Retrieves the path to the config file, creating the directory if needed.
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the config directory cannot be created
pub fn get_config_path() -> Result<PathBuf, std::io::Error> {
    let config_dir = dirs::home_dir().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not find home directory",
        )
    })?;
    let config_path = config_dir.join(".config").join("castup").join("castup.toml");

    std::fs::create_dir_all(config_path.parent().unwrap())?;

    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config: CastupConfig = toml::from_str("").unwrap();
        assert_eq!(config.audio.device, "default");
        assert_eq!(config.upload.max_file_bytes, 30 * 1000 * 1000);
        assert_eq!(config.upload.max_record_bytes, 4 * 1024 * 1024);
        assert!(config.upload.limit_recordings);
        assert_eq!(config.transcode.hls_segment_seconds, 2);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: CastupConfig = toml::from_str(
            r#"
            [upload]
            base_url = "https://episodes.example.com"
            "#,
        )
        .unwrap();
        assert_eq!(config.upload.base_url, "https://episodes.example.com");
        assert_eq!(config.upload.max_file_bytes, 30 * 1000 * 1000);
        assert_eq!(config.audio.sample_rate, 44100);
    }

    #[test]
    fn test_round_trip() {
        let config = CastupConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: CastupConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.upload.base_url, config.upload.base_url);
        assert_eq!(parsed.transcode.audio_bitrate, config.transcode.audio_bitrate);
    }
}
