//! Media primitives shared across the pipeline.
//!
//! A `MediaBlob` is the unit every stage hands onward: sealed recordings,
//! loaded files, transcoder output. `AudioFormat` names the three transcode
//! targets and their MIME types.

use serde::{Deserialize, Serialize};

/// An in-memory media payload with its MIME type.
#[derive(Debug, Clone)]
pub struct MediaBlob {
    /// Raw file bytes
    pub bytes: Vec<u8>,
    /// MIME type, e.g. "audio/mpeg"
    pub content_type: String,
}

impl MediaBlob {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    /// Payload size in bytes.
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Transcode target format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// Single-file MP3
    Mp3,
    /// Single-file M4A (AAC in MP4)
    M4a,
    /// HLS playlist plus MPEG-TS segments
    M3u8,
}

impl AudioFormat {
    /// MIME type of the format's primary output file.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::M4a => "audio/mp4",
            Self::M3u8 => "application/x-mpegURL",
        }
    }

    /// File extension of the primary output file.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
            Self::M3u8 => "m3u8",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// MIME type of an MPEG-TS segment file.
pub const SEGMENT_CONTENT_TYPE: &str = "video/mp2t";

/// Maps a file extension to the content type accepted for upload.
///
/// Returns `None` for extensions outside the allowlist
/// (mp3, mp4, m4a, wav, ogg).
pub fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "mp3" => Some("audio/mpeg"),
        "mp4" => Some("audio/mp4"),
        "m4a" => Some("audio/x-m4a"),
        "wav" => Some("audio/wav"),
        "ogg" => Some("audio/ogg"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_allowlist() {
        assert_eq!(content_type_for_extension("mp3"), Some("audio/mpeg"));
        assert_eq!(content_type_for_extension("M4A"), Some("audio/x-m4a"));
        assert_eq!(content_type_for_extension("flac"), None);
        assert_eq!(content_type_for_extension("txt"), None);
    }

    #[test]
    fn test_format_mime_types() {
        assert_eq!(AudioFormat::Mp3.content_type(), "audio/mpeg");
        assert_eq!(AudioFormat::M4a.content_type(), "audio/mp4");
        assert_eq!(AudioFormat::M3u8.content_type(), "application/x-mpegURL");
    }
}
