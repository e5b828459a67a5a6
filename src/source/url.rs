//! Remote URL ingestion.
//!
//! A remote URL passes a local scheme check, then a server round-trip that
//! probes whether the resource's format is supported. Accepted URLs are
//! handed onward as-is; the backend fetches the audio itself.

use crate::error::{Error, Result};
use crate::upload::ApiClient;

/// Validate that a string looks like a URL.
/// Rejects anything that isn't http:// or https://.
pub fn validate_scheme(url: &str) -> Result<&str> {
    let trimmed = url.trim();
    if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        Ok(trimmed)
    } else {
        Err(Error::InvalidInput(format!(
            "Invalid URL (must start with http:// or https://): {trimmed}"
        )))
    }
}

/// Validates a remote audio URL against the backend's detect endpoint.
///
/// # Errors
/// - `Error::InvalidInput` if the scheme is wrong or the format is unsupported
/// - `Error::Network` if the probe cannot reach the server
pub async fn validate_remote_url(api: &ApiClient, url: &str) -> Result<String> {
    let trimmed = validate_scheme(url)?;

    tracing::debug!("Probing remote URL: {}", trimmed);

    if !api.detect(trimmed).await? {
        return Err(Error::InvalidInput(
            "The remote resource is not a supported audio format.".to_string(),
        ));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_accepted() {
        assert!(validate_scheme("https://example.com/audio.mp3").is_ok());
    }

    #[test]
    fn test_http_accepted() {
        assert!(validate_scheme("http://example.com/audio.mp3").is_ok());
    }

    #[test]
    fn test_scheme_required() {
        assert!(validate_scheme("example.com/audio.mp3").is_err());
        assert!(validate_scheme("file:///etc/passwd").is_err());
        assert!(validate_scheme("").is_err());
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        assert_eq!(
            validate_scheme("  https://example.com/a.mp3 ").unwrap(),
            "https://example.com/a.mp3"
        );
    }
}
