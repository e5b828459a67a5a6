//! Backend REST API client.
//!
//! Covers the endpoints the pipeline consumes: presigned-URL issuance
//! (single and batched), the two finalize endpoints, remote-URL detection,
//! and the album list for the picker. JSON is camelCase on the wire.

use serde::{Deserialize, Serialize};

use crate::episode::{Album, Episode, EpisodeDraft};
use crate::error::{Error, Result};

/// Request body for a presigned write URL.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignRequest {
    pub name: String,
    pub content_type: String,
}

/// A presigned write URL plus the public address the file will be served at.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignResponse {
    pub upload_url: String,
    pub public_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchPresignRequest<'a> {
    title_hint: &'a str,
    files: &'a [PresignRequest],
}

/// One presigned entry of a batched response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedFile {
    pub name: String,
    pub upload_url: String,
}

/// Response to a batched presign request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPresignResponse {
    pub files: Vec<PresignedFile>,
    pub playlist_public_url: String,
}

/// Payload of the finalize endpoints. The single-file path sets `url`, the
/// HLS path sets `playlistUrl`; the draft fields are identical.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_url: Option<String>,
    pub title: String,
    pub status: String,
    pub language: String,
    pub description: String,
    pub original_website: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl FinalizeRequest {
    /// Builds the common payload from a validated draft. The caller sets
    /// `url` or `playlist_url` depending on the upload path taken.
    pub fn from_draft(draft: &EpisodeDraft) -> Self {
        Self {
            url: None,
            playlist_url: None,
            title: draft.title.trim().to_string(),
            status: draft.status.to_string(),
            language: draft.language.clone(),
            description: draft.description.clone(),
            original_website: draft.original_website.clone(),
            duration: draft.duration,
            album_id: draft.album_id.clone(),
            format: draft.format.map(|f| f.to_string()),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_playlist_url(mut self, url: impl Into<String>) -> Self {
        self.playlist_url = Some(url.into());
        self
    }
}

/// Error body the backend returns on rejection.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    success: bool,
}

/// Client for the episode backend.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    /// Creates a client for the backend at `base_url` (no trailing slash needed).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Requests a presigned write URL for a single file.
    ///
    /// # Errors
    /// - `Error::PresignFailed` on transport failure or a non-2xx response
    pub async fn presign(&self, name: &str, content_type: &str) -> Result<PresignResponse> {
        let url = format!("{}/api/episode/presign", self.base_url);
        let body = PresignRequest {
            name: name.to_string(),
            content_type: content_type.to_string(),
        };

        tracing::debug!("Presign request: {} ({})", name, content_type);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::PresignFailed(network_message(&e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(Error::PresignFailed(format!(
                "server returned status {status}: {error_body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::PresignFailed(format!("unreadable response: {e}")))
    }

    /// Requests presigned write URLs for a whole file set in one call.
    ///
    /// # Errors
    /// - `Error::PresignFailed` on transport failure or a non-2xx response
    pub async fn presign_batch(
        &self,
        title_hint: &str,
        files: &[PresignRequest],
    ) -> Result<BatchPresignResponse> {
        let url = format!("{}/api/episode/presign-batch", self.base_url);
        let body = BatchPresignRequest { title_hint, files };

        tracing::debug!("Batch presign request: {} files", files.len());

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::PresignFailed(network_message(&e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(Error::PresignFailed(format!(
                "server returned status {status}: {error_body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::PresignFailed(format!("unreadable response: {e}")))
    }

    /// Registers an uploaded single file (or a remote URL) as an episode.
    pub async fn finalize(&self, request: &FinalizeRequest) -> Result<Episode> {
        self.post_finalize("/api/episode/upload-url", request).await
    }

    /// Registers an uploaded HLS file set as an episode.
    pub async fn finalize_hls(&self, request: &FinalizeRequest) -> Result<Episode> {
        self.post_finalize("/api/episode/finalize-hls", request).await
    }

    /// Shared finalize call. Distinguishes a rejection carrying a server
    /// message (`Error::ServerRejected`) from transport-level failure
    /// (`Error::FinalizeFailed`).
    async fn post_finalize(&self, path: &str, request: &FinalizeRequest) -> Result<Episode> {
        let url = format!("{}{}", self.base_url, path);

        tracing::debug!("Finalize request to {}: title='{}'", path, request.title);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::FinalizeFailed(network_message(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| rejection_message(status.as_u16()));
            tracing::error!("Finalize rejected (status {status}): {body}");
            return Err(Error::ServerRejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| Error::FinalizeFailed(format!("unreadable response: {e}")))
    }

    /// Probes whether a remote URL points at a supported audio resource.
    ///
    /// # Errors
    /// - `Error::Network` on transport failure
    pub async fn detect(&self, remote_url: &str) -> Result<bool> {
        let url = format!(
            "{}/api/episode/detect?url={}",
            self.base_url,
            urlencoding::encode(remote_url)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Network(network_message(&e)))?;

        if !response.status().is_success() {
            tracing::debug!("Detect returned status {}", response.status());
            return Ok(false);
        }

        let detect: DetectResponse = response
            .json()
            .await
            .map_err(|e| Error::Network(format!("unreadable detect response: {e}")))?;

        Ok(detect.success)
    }

    /// Fetches the albums available for assignment.
    ///
    /// # Errors
    /// - `Error::Network` on transport failure or a non-2xx response
    pub async fn list_albums(&self) -> Result<Vec<Album>> {
        let url = format!("{}/api/episode/albums", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Network(network_message(&e)))?;

        if !response.status().is_success() {
            return Err(Error::Network(format!(
                "album list returned status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Network(format!("unreadable album list: {e}")))
    }
}

/// Plain-language description of a reqwest transport failure.
pub(crate) fn network_message(e: &reqwest::Error) -> String {
    if e.is_connect() {
        "Failed to connect to the episode server. Check your internet connection.".to_string()
    } else if e.is_timeout() {
        "Request to the episode server timed out. The server is not responding.".to_string()
    } else {
        format!("{e}")
    }
}

/// Fallback rejection message when the server body carries no `error` field.
fn rejection_message(status: u16) -> String {
    match status {
        400 => "The episode data was not accepted. Check the form fields.".to_string(),
        401 | 403 => "You don't have permission to publish episodes on this server.".to_string(),
        413 => "The upload is too large for this server.".to_string(),
        429 => "Too many requests. Please wait and try again.".to_string(),
        500..=599 => "The episode server is experiencing issues. Please try again later.".to_string(),
        _ => format!("The server rejected the request (status {status})."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::episode::EpisodeStatus;
    use crate::media::AudioFormat;

    fn sample_draft() -> EpisodeDraft {
        let mut draft = EpisodeDraft::new();
        draft.title = "  Morning news  ".to_string();
        draft.status = EpisodeStatus::Published;
        draft.language = "en".to_string();
        draft.album_id = Some("a1".to_string());
        draft.format = Some(AudioFormat::M3u8);
        draft.duration = Some(12.5);
        draft
    }

    #[test]
    fn test_finalize_request_serializes_camel_case() {
        let request = FinalizeRequest::from_draft(&sample_draft())
            .with_playlist_url("https://cdn/e/playlist.m3u8");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["playlistUrl"], "https://cdn/e/playlist.m3u8");
        assert_eq!(json["title"], "Morning news");
        assert_eq!(json["status"], "published");
        assert_eq!(json["albumId"], "a1");
        assert_eq!(json["format"], "m3u8");
        assert_eq!(json["originalWebsite"], "");
        // The single-file field is absent on the HLS path
        assert!(json.get("url").is_none());
    }

    #[test]
    fn test_finalize_request_single_path_omits_playlist() {
        let request = FinalizeRequest::from_draft(&sample_draft()).with_url("https://cdn/e.mp3");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["url"], "https://cdn/e.mp3");
        assert!(json.get("playlistUrl").is_none());
    }

    #[test]
    fn test_presign_request_wire_shape() {
        let request = PresignRequest {
            name: "episode.mp3".to_string(),
            content_type: "audio/mpeg".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["name"], "episode.mp3");
        assert_eq!(json["contentType"], "audio/mpeg");
    }

    #[test]
    fn test_batch_response_deserializes() {
        let response: BatchPresignResponse = serde_json::from_str(
            r#"{
                "files": [
                    {"name": "episode.m3u8", "uploadUrl": "https://store/p?sig=1"},
                    {"name": "episode_000.ts", "uploadUrl": "https://store/s0?sig=2"}
                ],
                "playlistPublicUrl": "https://cdn/e/episode.m3u8"
            }"#,
        )
        .unwrap();
        assert_eq!(response.files.len(), 2);
        assert_eq!(response.files[1].name, "episode_000.ts");
        assert_eq!(response.playlist_public_url, "https://cdn/e/episode.m3u8");
    }

    #[test]
    fn test_rejection_message_covers_common_statuses() {
        assert!(rejection_message(413).contains("too large"));
        assert!(rejection_message(503).contains("experiencing issues"));
        assert!(rejection_message(418).contains("418"));
    }

    #[test]
    fn test_base_url_trailing_slash_normalized() {
        let client = ApiClient::new("https://api.example.com/");
        assert_eq!(client.base_url, "https://api.example.com");
    }
}
