//! Upload orchestration.
//!
//! Drives the presign → PUT → finalize sequence for a single file or an HLS
//! file set. Transfers stream their bodies in chunks so progress can be
//! reported as bytes leave the client; batch uploads run strictly
//! sequentially so the aggregate percentage is well-defined.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedSender;

use crate::episode::{Episode, EpisodeDraft};
use crate::error::{Error, Result};
use crate::media::MediaBlob;
use crate::transcode::SegmentFile;

use super::api::{network_message, ApiClient, FinalizeRequest, PresignRequest, PresignedFile};
use super::progress::ProgressTracker;

/// Bytes per streamed body chunk.
const CHUNK_SIZE: usize = 64 * 1024;

/// A named file queued for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn from_blob(name: impl Into<String>, blob: MediaBlob) -> Self {
        Self {
            name: name.into(),
            content_type: blob.content_type,
            bytes: blob.bytes,
        }
    }

    pub fn from_segment(segment: SegmentFile) -> Self {
        Self {
            name: segment.name,
            content_type: segment.content_type,
            bytes: segment.bytes,
        }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Performs direct-to-storage transfers and finalizes episodes.
pub struct Uploader {
    api: ApiClient,
    client: reqwest::Client,
}

impl Uploader {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            client: reqwest::Client::new(),
        }
    }

    /// Uploads one file and registers it as an episode.
    ///
    /// Progress percentages are emitted on `progress` as the body streams
    /// out; 100 arrives only after the storage PUT succeeded.
    ///
    /// # Errors
    /// - `Error::InvalidInput` if the draft fails validation (no network call made)
    /// - `Error::PresignFailed`, `Error::Network`, `Error::ServerRejected`,
    ///   `Error::FinalizeFailed` from the respective stages
    pub async fn upload_single(
        &self,
        file: UploadFile,
        draft: &EpisodeDraft,
        progress: UnboundedSender<u8>,
    ) -> Result<Episode> {
        draft.validate()?;

        tracing::info!("Uploading '{}' ({} bytes)", file.name, file.len());

        let presigned = self.api.presign(&file.name, &file.content_type).await?;
        let tracker = Arc::new(Mutex::new(ProgressTracker::new(file.len())));

        self.put_file(&presigned.upload_url, &file, &tracker, &progress)
            .await?;

        let request = FinalizeRequest::from_draft(draft).with_url(presigned.public_url);
        let episode = self.api.finalize(&request).await?;

        tracing::info!("Episode registered: {}", episode.id);
        Ok(episode)
    }

    /// Uploads an HLS file set and registers it as an episode.
    ///
    /// One batched presign call covers every file; transfers then run
    /// strictly sequentially (file N+1 does not start until file N's PUT
    /// succeeded) and the reported percentage aggregates bytes across the
    /// whole set. Any file's failure aborts the batch naming that file.
    ///
    /// # Errors
    /// - `Error::InvalidInput` if the draft fails validation or the file set is empty
    /// - `Error::PresignFailed`, `Error::Network`, `Error::ServerRejected`,
    ///   `Error::FinalizeFailed` from the respective stages
    pub async fn upload_batch(
        &self,
        files: Vec<UploadFile>,
        title_hint: &str,
        draft: &EpisodeDraft,
        progress: UnboundedSender<u8>,
    ) -> Result<Episode> {
        draft.validate()?;

        if files.is_empty() {
            return Err(Error::InvalidInput("Nothing to upload.".to_string()));
        }

        let total_bytes: u64 = files.iter().map(UploadFile::len).sum();
        tracing::info!("Uploading {} files ({} bytes total)", files.len(), total_bytes);

        let requests: Vec<PresignRequest> = files
            .iter()
            .map(|f| PresignRequest {
                name: f.name.clone(),
                content_type: f.content_type.clone(),
            })
            .collect();
        let presigned = self.api.presign_batch(title_hint, &requests).await?;
        let plan = match_presigned(files, &presigned.files)?;

        let tracker = Arc::new(Mutex::new(ProgressTracker::new(total_bytes)));

        for (file, upload_url) in &plan {
            tracing::debug!("Uploading batch file '{}'", file.name);
            self.put_file(upload_url, file, &tracker, &progress)
                .await
                .map_err(|e| match e {
                    Error::Network(msg) => {
                        Error::Network(format!("upload of '{}' failed: {msg}", file.name))
                    }
                    other => other,
                })?;
        }

        let request =
            FinalizeRequest::from_draft(draft).with_playlist_url(presigned.playlist_public_url);
        let episode = self.api.finalize_hls(&request).await?;

        tracing::info!("HLS episode registered: {}", episode.id);
        Ok(episode)
    }

    /// PUTs one file to its presigned URL, streaming the body in chunks and
    /// reporting progress through the shared tracker.
    async fn put_file(
        &self,
        upload_url: &str,
        file: &UploadFile,
        tracker: &Arc<Mutex<ProgressTracker>>,
        progress: &UnboundedSender<u8>,
    ) -> Result<()> {
        let chunks: Vec<Vec<u8>> = file.bytes.chunks(CHUNK_SIZE).map(<[u8]>::to_vec).collect();

        let stream_tracker = Arc::clone(tracker);
        let stream_progress = progress.clone();
        let stream = futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
            let sent = chunk.len() as u64;
            if let Some(percent) = stream_tracker.lock().unwrap().chunk_sent(sent) {
                let _ = stream_progress.send(percent);
            }
            Ok::<_, std::io::Error>(chunk)
        }));

        let response = self
            .client
            .put(upload_url)
            .header(reqwest::header::CONTENT_TYPE, &file.content_type)
            .header(reqwest::header::CONTENT_LENGTH, file.len())
            .body(reqwest::Body::wrap_stream(stream))
            .send()
            .await
            .map_err(|e| Error::Network(network_message(&e)))?;

        if !response.status().is_success() {
            return Err(Error::Network(format!(
                "storage returned status {}",
                response.status()
            )));
        }

        // The PUT succeeded: move the file's bytes into the completed count
        if let Some(percent) = tracker.lock().unwrap().file_completed(file.len()) {
            let _ = progress.send(percent);
        }

        tracing::debug!("Uploaded '{}' ({} bytes)", file.name, file.len());
        Ok(())
    }
}

/// Pairs each queued file with its presigned URL, preserving upload order.
///
/// # Errors
/// - `Error::PresignFailed` if the response lacks a URL for any file
fn match_presigned(
    files: Vec<UploadFile>,
    presigned: &[PresignedFile],
) -> Result<Vec<(UploadFile, String)>> {
    files
        .into_iter()
        .map(|file| {
            let url = presigned
                .iter()
                .find(|p| p.name == file.name)
                .map(|p| p.upload_url.clone())
                .ok_or_else(|| {
                    Error::PresignFailed(format!("no upload URL issued for '{}'", file.name))
                })?;
            Ok((file, url))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, size: usize) -> UploadFile {
        UploadFile {
            name: name.to_string(),
            content_type: "video/mp2t".to_string(),
            bytes: vec![0u8; size],
        }
    }

    fn presigned(name: &str) -> PresignedFile {
        PresignedFile {
            name: name.to_string(),
            upload_url: format!("https://store/{name}?sig=x"),
        }
    }

    #[test]
    fn test_match_presigned_preserves_order() {
        let files = vec![file("episode.m3u8", 500), file("episode_000.ts", 10_000)];
        // Response order differs from upload order
        let urls = vec![presigned("episode_000.ts"), presigned("episode.m3u8")];

        let plan = match_presigned(files, &urls).unwrap();
        assert_eq!(plan[0].0.name, "episode.m3u8");
        assert_eq!(plan[0].1, "https://store/episode.m3u8?sig=x");
        assert_eq!(plan[1].0.name, "episode_000.ts");
    }

    #[test]
    fn test_match_presigned_missing_url_fails() {
        let files = vec![file("episode.m3u8", 500), file("episode_000.ts", 10_000)];
        let urls = vec![presigned("episode.m3u8")];

        assert!(matches!(
            match_presigned(files, &urls),
            Err(Error::PresignFailed(_))
        ));
    }

    #[test]
    fn test_upload_file_from_blob_keeps_mime() {
        let blob = MediaBlob::new(vec![1, 2, 3], "audio/mpeg");
        let upload = UploadFile::from_blob("episode.mp3", blob);
        assert_eq!(upload.name, "episode.mp3");
        assert_eq!(upload.content_type, "audio/mpeg");
        assert_eq!(upload.len(), 3);
    }
}
