//! Local file ingestion.
//!
//! Validates a user-selected file against the upload allowlist and the
//! configured size ceiling before loading it into memory. Type violations
//! reject regardless of size; size violations reject regardless of type.

use std::path::Path;

use crate::error::{Error, Result};
use crate::media::{content_type_for_extension, MediaBlob};

/// Ingestion limits for locally selected files.
#[derive(Debug, Clone, Copy)]
pub struct FileSourceOptions {
    /// Size ceiling in bytes
    pub max_bytes: u64,
}

/// Loads and validates a local audio file.
///
/// # Errors
/// - `Error::InvalidInput` for a disallowed extension or an oversized file
/// - `Error::Io` if the file cannot be read
pub fn load_local_file(path: &Path, options: &FileSourceOptions) -> Result<MediaBlob> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    let content_type = validate_file(extension, file_size(path)?, options)?;

    let bytes = std::fs::read(path)?;
    tracing::info!(
        "Loaded {} ({} bytes, {})",
        path.display(),
        bytes.len(),
        content_type
    );

    Ok(MediaBlob::new(bytes, content_type))
}

/// Checks a candidate file's type and size against the allowlist and ceiling.
///
/// The type check runs first so a disallowed type is reported as such even
/// when the file is also oversized.
pub fn validate_file(
    extension: &str,
    size_bytes: u64,
    options: &FileSourceOptions,
) -> Result<&'static str> {
    let content_type = content_type_for_extension(extension).ok_or_else(|| {
        Error::InvalidInput(format!(
            "Unsupported file type '.{extension}'. Allowed: mp3, mp4, m4a, wav, ogg."
        ))
    })?;

    if size_bytes > options.max_bytes {
        return Err(Error::InvalidInput(format!(
            "File is too large ({size_bytes} bytes). The limit is {} bytes.",
            options.max_bytes
        )));
    }

    Ok(content_type)
}

fn file_size(path: &Path) -> Result<u64> {
    Ok(std::fs::metadata(path)?.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPTIONS: FileSourceOptions = FileSourceOptions {
        max_bytes: 4 * 1000 * 1000,
    };

    #[test]
    fn test_allowed_file_within_ceiling() {
        // Scenario: 2MB audio/mpeg file under a 4MB ceiling
        let content_type = validate_file("mp3", 2 * 1000 * 1000, &OPTIONS).unwrap();
        assert_eq!(content_type, "audio/mpeg");
    }

    #[test]
    fn test_disallowed_type_rejected_regardless_of_size() {
        assert!(matches!(
            validate_file("flac", 10, &OPTIONS),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            validate_file("exe", 100 * 1000 * 1000, &OPTIONS),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_oversized_file_rejected_regardless_of_type() {
        for extension in ["mp3", "m4a", "wav", "ogg"] {
            assert!(matches!(
                validate_file(extension, OPTIONS.max_bytes + 1, &OPTIONS),
                Err(Error::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_ceiling_is_inclusive() {
        assert!(validate_file("wav", OPTIONS.max_bytes, &OPTIONS).is_ok());
    }

    #[test]
    fn test_extension_case_insensitive() {
        assert_eq!(validate_file("MP3", 100, &OPTIONS).unwrap(), "audio/mpeg");
    }
}
