//! Episode publishing flow.
//!
//! The interactive composition shell: acquire audio from one of three
//! sources (local file, microphone, remote URL), fill in the episode draft,
//! optionally transcode, then upload and finalize. Picking a different
//! source discards the pending one without confirmation; a failed submission
//! preserves the draft so the user can retry. Recording stop can be
//! triggered externally via SIGUSR1.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use cliclack::{confirm, input, intro, outro, outro_cancel, select, spinner};
use console::style;
use crossterm::event::{self, Event, KeyCode};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tokio::sync::mpsc;

use crate::config::CastupConfig;
use crate::episode::{Album, DraftPatch, EpisodeDraft, EpisodeStatus};
use crate::error::Error;
use crate::history::HistoryManager;
use crate::media::AudioFormat;
use crate::source::file::{load_local_file, FileSourceOptions};
use crate::source::url::validate_remote_url;
use crate::source::{AcquiredSource, RecordSource};
use crate::transcode::TranscodeEngine;
use crate::upload::api::FinalizeRequest;
use crate::upload::{ApiClient, UploadFile, Uploader};

/// What the submit step uploads.
enum SubmitPayload {
    /// One file, uploaded through the single presign path
    Single(UploadFile),
    /// HLS playlist plus segments, uploaded through the batch path
    Batch(Vec<UploadFile>),
    /// A remote URL, finalized without any transfer
    Remote(String),
}

/// Handles the publish command.
///
/// `file` and `url` skip the interactive source picker when given.
///
/// # Errors
/// - If configuration cannot be loaded
/// - If a non-interactive source argument fails validation
/// - If the interactive flow is cancelled mid-prompt
pub async fn handle_publish(file: Option<PathBuf>, url: Option<String>) -> anyhow::Result<()> {
    tracing::info!("=== castup publish started ===");

    let config = match CastupConfig::load_or_init() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Failed to load configuration: {err}");
            eprintln!(
                "Configuration error: {err}\n\nPlease check your ~/.config/castup/castup.toml file and try again."
            );
            return Err(anyhow::anyhow!("Configuration error: {err}"));
        }
    };

    tracing::info!(
        "Configuration loaded: device={}, sample_rate={}Hz, server={}",
        config.audio.device,
        config.audio.sample_rate,
        config.upload.base_url
    );

    ctrlc::set_handler(move || {}).expect("setting Ctrl-C handler");

    let api = ApiClient::new(&config.upload.base_url);

    intro(style(" castup ").on_white().black())?;

    // Album picker data; publishing works without it
    let albums = match api.list_albums().await {
        Ok(albums) => albums,
        Err(e) => {
            tracing::warn!("Album list unavailable: {e}");
            Vec::new()
        }
    };

    let (source, duration) = match acquire_source(&config, &api, file, url).await? {
        Some(acquired) => acquired,
        None => {
            outro_cancel("Nothing to publish.")?;
            return Ok(());
        }
    };

    tracing::info!("Source acquired: {}", source.describe());

    let mut draft = EpisodeDraft::new();
    let is_blob = matches!(source, AcquiredSource::Blob(_));
    fill_draft(&mut draft, &albums, is_blob, duration)?;

    // Transcode when a target format was chosen for a blob source
    let payload = build_payload(&config, source, &draft)?;

    submit(api, payload, &mut draft).await
}

/// Runs the source picker until a source is acquired or the user backs out.
///
/// Selecting a different source after acquiring one discards the pending
/// blob/URL silently, matching the tab-switch behavior of the web flow.
async fn acquire_source(
    config: &CastupConfig,
    api: &ApiClient,
    file: Option<PathBuf>,
    url: Option<String>,
) -> anyhow::Result<Option<(AcquiredSource, Option<f64>)>> {
    // Non-interactive paths: a validation failure is a hard error
    if let Some(path) = file {
        let options = FileSourceOptions {
            max_bytes: config.upload.max_file_bytes,
        };
        let blob = load_local_file(&path, &options).map_err(|e| {
            tracing::error!("File rejected: {e}");
            anyhow::anyhow!("{}", e.user_message())
        })?;
        return Ok(Some((AcquiredSource::Blob(blob), None)));
    }
    if let Some(remote) = url {
        let accepted = validate_remote_url(api, &remote).await.map_err(|e| {
            tracing::error!("URL rejected: {e}");
            anyhow::anyhow!("{}", e.user_message())
        })?;
        return Ok(Some((AcquiredSource::Url(accepted), None)));
    }

    loop {
        let choice = select("How would you like to add audio?")
            .item(0, "Upload a file", "mp3, mp4, m4a, wav, ogg")
            .item(1, "Record", "capture from the microphone")
            .item(2, "From a URL", "remote audio the server fetches")
            .item(3, "Quit", "")
            .interact()?;

        let acquired = match choice {
            0 => acquire_file(config)?,
            1 => acquire_recording(config)?,
            2 => acquire_url(api).await?,
            _ => return Ok(None),
        };

        let Some((source, duration)) = acquired else {
            // Validation failed or the sub-flow was cancelled; pick again
            continue;
        };

        let keep = select(format!("Source ready: {}", source.describe()))
            .item(0, "Use it", "")
            .item(1, "Choose a different source", "discards this one")
            .interact()?;

        if keep == 0 {
            return Ok(Some((source, duration)));
        }
        // Silent discard, back to the picker
        tracing::debug!("Pending source discarded on switch");
    }
}

/// File branch of the source picker. Inline-retryable: returns `None` on a
/// rejected file so the picker loops.
fn acquire_file(config: &CastupConfig) -> anyhow::Result<Option<(AcquiredSource, Option<f64>)>> {
    let path: String = input("Path to the audio file:")
        .placeholder("~/episodes/morning.mp3")
        .interact()?;

    let path = if let Some(stripped) = path.strip_prefix("~/") {
        dirs::home_dir()
            .map(|home| home.join(stripped))
            .unwrap_or_else(|| PathBuf::from(&path))
    } else {
        PathBuf::from(&path)
    };

    let options = FileSourceOptions {
        max_bytes: config.upload.max_file_bytes,
    };

    match load_local_file(&path, &options) {
        Ok(blob) => Ok(Some((AcquiredSource::Blob(blob), None))),
        Err(e) => {
            tracing::warn!("File rejected: {e}");
            cliclack::log::warning(e.user_message())?;
            Ok(None)
        }
    }
}

/// URL branch of the source picker.
async fn acquire_url(api: &ApiClient) -> anyhow::Result<Option<(AcquiredSource, Option<f64>)>> {
    let remote: String = input("Remote audio URL:")
        .placeholder("https://example.com/audio.mp3")
        .interact()?;

    let sp = spinner();
    sp.start("Checking the remote audio format...");

    match validate_remote_url(api, &remote).await {
        Ok(accepted) => {
            sp.stop("Remote audio accepted");
            Ok(Some((AcquiredSource::Url(accepted), None)))
        }
        Err(e) => {
            sp.stop("Remote audio rejected");
            tracing::warn!("URL rejected: {e}");
            cliclack::log::warning(e.user_message())?;
            Ok(None)
        }
    }
}

/// Record branch of the source picker: capture, then the optional
/// destructive edit menu (trim or re-record a region).
fn acquire_recording(
    config: &CastupConfig,
) -> anyhow::Result<Option<(AcquiredSource, Option<f64>)>> {
    let mut source = match capture_take(config) {
        Ok(Some(source)) => source,
        Ok(None) => return Ok(None),
        Err(e) => {
            tracing::error!("Recording failed: {e}");
            cliclack::log::warning(e.user_message())?;
            return Ok(None);
        }
    };

    loop {
        let seconds = source.duration().unwrap_or(0.0);
        let choice = select(format!("Recording ready ({seconds:.1}s)"))
            .item(0, "Use it", "")
            .item(1, "Trim a region", "remove a time range")
            .item(2, "Re-record a region", "replace a time range with a new take")
            .item(3, "Discard", "")
            .interact()?;

        match choice {
            0 => break,
            1 => {
                let (start, end) = prompt_region()?;
                if let Err(e) = source.trim(start, end) {
                    cliclack::log::warning(e.user_message())?;
                }
            }
            2 => {
                let (start, end) = prompt_region()?;
                match capture_take(config) {
                    Ok(Some(mut replacement_source)) => {
                        if let Some((replacement, _)) = replacement_source.take() {
                            if let Err(e) = source.splice(start, end, &replacement) {
                                cliclack::log::warning(e.user_message())?;
                            }
                        }
                    }
                    Ok(None) => {}
                    Err(e) => cliclack::log::warning(e.user_message())?,
                }
            }
            _ => {
                source.discard();
                return Ok(None);
            }
        }
    }

    Ok(source
        .take()
        .map(|(blob, duration)| (AcquiredSource::Blob(blob), duration)))
}

/// Captures one take, driving the key loop until Enter, the byte ceiling,
/// SIGUSR1, or cancellation.
fn capture_take(config: &CastupConfig) -> crate::error::Result<Option<RecordSource>> {
    let mut source = RecordSource::new(config.audio.sample_rate, config.audio.device.clone());
    let byte_limit = config
        .upload
        .limit_recordings
        .then_some(config.upload.max_record_bytes);

    source.start(byte_limit)?;

    let term = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    if let Err(e) = signal_hook::flag::register(signal_hook::consts::SIGUSR1, term.clone()) {
        tracing::warn!("Failed to register SIGUSR1 handler: {e}");
    }

    println!(
        "  {}",
        style("Recording... Enter = stop, Space = pause/resume, Esc = cancel").dim()
    );

    let mut cancelled = false;
    enable_raw_mode().map_err(Error::Io)?;

    loop {
        if term.load(std::sync::atomic::Ordering::Relaxed) {
            tracing::info!("Received SIGUSR1: stopping recording via external trigger");
            break;
        }

        if source.limit_reached() {
            tracing::info!(
                "Recording size ceiling reached at {} bytes",
                source.captured_bytes()
            );
            break;
        }

        if event::poll(Duration::from_millis(100)).map_err(Error::Io)? {
            if let Event::Key(key) = event::read().map_err(Error::Io)? {
                match key.code {
                    KeyCode::Enter => break,
                    KeyCode::Esc | KeyCode::Char('q') => {
                        cancelled = true;
                        break;
                    }
                    KeyCode::Char(' ') => source.toggle_pause(),
                    _ => {}
                }
            }
        }

        let paused = if source.is_paused() { " [paused]" } else { "" };
        print!(
            "\r  {:6.1}s  {:6} KiB{paused}   ",
            source.elapsed_seconds(),
            source.captured_bytes() / 1024
        );
        std::io::stdout().flush().ok();
    }

    disable_raw_mode().map_err(Error::Io)?;
    println!();

    let limit_hit = source.limit_reached();
    source.stop()?;

    if cancelled {
        source.discard();
        tracing::debug!("Recording cancelled");
        return Ok(None);
    }

    if limit_hit {
        tracing::warn!("Recording was force-stopped at the configured size ceiling");
    }

    if source.blob().is_none() {
        return Ok(None);
    }

    Ok(Some(source))
}

/// Prompts for a time region in seconds.
fn prompt_region() -> anyhow::Result<(f32, f32)> {
    let start: f32 = input("Region start (seconds):")
        .placeholder("0.0")
        .interact()?;
    let end: f32 = input("Region end (seconds):")
        .placeholder("5.0")
        .interact()?;
    Ok((start, end))
}

/// Collects the draft fields, applying them through one patch.
fn fill_draft(
    draft: &mut EpisodeDraft,
    albums: &[Album],
    is_blob: bool,
    duration: Option<f64>,
) -> anyhow::Result<()> {
    let title: String = input("Episode title:")
        .validate(|value: &String| {
            if value.trim().is_empty() {
                Err("A title is required")
            } else {
                Ok(())
            }
        })
        .interact()?;

    let status = if select("Status:")
        .item(0, "Draft", "")
        .item(1, "Published", "visible to listeners")
        .interact()?
        == 1
    {
        EpisodeStatus::Published
    } else {
        EpisodeStatus::Draft
    };

    let language: String = input("Language:").default_input("en").interact()?;
    let description: String = input("Description:").default_input("").interact()?;
    let original_website: String = input("Original website:").default_input("").interact()?;

    let album_id = if albums.is_empty() {
        None
    } else {
        let mut album_prompt = select("Album:").item(0, "None", "");
        for (i, album) in albums.iter().enumerate() {
            album_prompt = album_prompt.item(i + 1, &album.name, "");
        }
        let selected = album_prompt.interact()?;
        if selected == 0 {
            None
        } else {
            Some(albums[selected - 1].id.clone())
        }
    };

    let format = if is_blob {
        match select("Output format:")
            .item(0, "Keep original", "publish the file as-is")
            .item(1, "MP3", "single file")
            .item(2, "M4A", "single file, AAC")
            .item(3, "HLS", "playlist + segments")
            .interact()?
        {
            1 => Some(AudioFormat::Mp3),
            2 => Some(AudioFormat::M4a),
            3 => Some(AudioFormat::M3u8),
            _ => None,
        }
    } else {
        None
    };

    draft.patch(DraftPatch {
        title: Some(title),
        status: Some(status),
        language: Some(language),
        description: Some(description),
        original_website: Some(original_website),
        album_id: Some(album_id),
        format: Some(format),
        duration: Some(duration),
    });

    draft.validate().map_err(|e| anyhow::anyhow!("{e}"))?;
    Ok(())
}

/// Turns the acquired source into the payload the submit step uploads,
/// transcoding blob sources when a target format was chosen.
fn build_payload(
    config: &CastupConfig,
    source: AcquiredSource,
    draft: &EpisodeDraft,
) -> anyhow::Result<SubmitPayload> {
    let blob = match source {
        AcquiredSource::Url(url) => return Ok(SubmitPayload::Remote(url)),
        AcquiredSource::Blob(blob) => blob,
    };

    let Some(format) = draft.format else {
        let name = format!("episode.{}", extension_for(&blob.content_type));
        return Ok(SubmitPayload::Single(UploadFile::from_blob(name, blob)));
    };

    let mut engine = TranscodeEngine::new(&config.transcode);

    let sp = spinner();
    sp.start("Loading the transcoder...");
    loop {
        match engine.load() {
            Ok(()) => break,
            Err(e) => {
                sp.stop("Transcoder unavailable");
                tracing::error!("Transcoder load failed: {e}");
                cliclack::log::warning(e.user_message())?;
                if !confirm("Retry loading the transcoder?").interact()? {
                    return Err(anyhow::anyhow!("{}", e.user_message()));
                }
                sp.start("Loading the transcoder...");
            }
        }
    }

    sp.start(format!("Transcoding to {}...", format));
    let converted = match engine.convert(&blob, format) {
        Ok(converted) => converted,
        Err(e) => {
            sp.stop("Transcoding failed");
            if !engine.filesystem_health() {
                tracing::error!("Transcoder scratch directory is unhealthy");
            }
            return Err(anyhow::anyhow!("{}", e.user_message()));
        }
    };

    sp.stop(format!("Transcoded to {}", format));

    let payload = if format == AudioFormat::M3u8 {
        match engine.playlist_status() {
            Ok(status) => {
                tracing::debug!(
                    "Playlist produced ({} bytes, complete: {})",
                    status.text.len(),
                    status.complete
                );
            }
            Err(e) => tracing::warn!("Playlist status unavailable: {e}"),
        }

        let files = engine
            .collect_segments()
            .map_err(|e| anyhow::anyhow!("{}", e.user_message()))?
            .into_iter()
            .map(UploadFile::from_segment)
            .collect();
        SubmitPayload::Batch(files)
    } else {
        let name = format!("episode.{}", format.extension());
        SubmitPayload::Single(UploadFile::from_blob(name, converted))
    };

    engine.cleanup();

    Ok(payload)
}

/// Submits the payload, retrying on failure with the draft preserved.
async fn submit(
    api: ApiClient,
    payload: SubmitPayload,
    draft: &mut EpisodeDraft,
) -> anyhow::Result<()> {
    let uploader = Uploader::new(api.clone());

    loop {
        let result = match &payload {
            SubmitPayload::Remote(remote_url) => {
                let sp = spinner();
                sp.start("Registering the episode...");
                let request = FinalizeRequest::from_draft(draft).with_url(remote_url.clone());
                let result = api.finalize(&request).await;
                match &result {
                    Ok(_) => sp.stop("Episode registered"),
                    Err(_) => sp.stop("Registration failed"),
                }
                result
            }
            SubmitPayload::Single(file) => {
                upload_with_progress(&uploader, draft, SubmitPayload::Single(file.clone())).await
            }
            SubmitPayload::Batch(files) => {
                upload_with_progress(&uploader, draft, SubmitPayload::Batch(files.clone())).await
            }
        };

        match result {
            Ok(episode) => {
                let url = episode.public_url().unwrap_or_default().to_string();
                record_history(draft, &payload, &url);

                outro(format!(
                    "Published '{}'{}",
                    episode.title,
                    if url.is_empty() {
                        String::new()
                    } else {
                        format!(" at {url}")
                    }
                ))?;

                draft.reset();
                return Ok(());
            }
            Err(e) => {
                // The draft is preserved; only the message kind reaches the user
                tracing::error!("Submission failed: {e}");
                cliclack::log::error(e.user_message())?;

                if !confirm("Try publishing again?").interact()? {
                    outro_cancel("Episode not published.")?;
                    return Ok(());
                }
            }
        }
    }
}

/// Runs one upload attempt, mirroring progress onto a progress bar.
async fn upload_with_progress(
    uploader: &Uploader,
    draft: &EpisodeDraft,
    payload: SubmitPayload,
) -> crate::error::Result<crate::episode::Episode> {
    let (tx, mut rx) = mpsc::unbounded_channel::<u8>();

    let bar = cliclack::progress_bar(100);
    bar.start("Uploading...");

    let upload = async {
        match payload {
            SubmitPayload::Single(file) => uploader.upload_single(file, draft, tx).await,
            SubmitPayload::Batch(files) => {
                let title_hint = draft.title.trim().to_string();
                uploader.upload_batch(files, &title_hint, draft, tx).await
            }
            SubmitPayload::Remote(_) => unreachable!("remote URLs are finalized directly"),
        }
    };
    tokio::pin!(upload);

    let mut last_percent: u64 = 0;
    let result = loop {
        tokio::select! {
            result = &mut upload => break result,
            Some(percent) = rx.recv() => {
                let percent = percent as u64;
                if percent > last_percent {
                    bar.inc(percent - last_percent);
                    last_percent = percent;
                }
            }
        }
    };

    // Drain any progress that raced with completion
    while let Ok(percent) = rx.try_recv() {
        let percent = percent as u64;
        if percent > last_percent {
            bar.inc(percent - last_percent);
            last_percent = percent;
        }
    }

    match &result {
        Ok(_) => bar.stop("Upload complete"),
        Err(_) => bar.stop("Upload failed"),
    }

    result
}

/// Records a successful publish in the local history, best-effort.
fn record_history(draft: &EpisodeDraft, payload: &SubmitPayload, url: &str) {
    let format = match (&draft.format, payload) {
        (Some(format), _) => format.to_string(),
        (None, SubmitPayload::Remote(_)) => "url".to_string(),
        (None, SubmitPayload::Single(file)) => extension_for(&file.content_type).to_string(),
        (None, SubmitPayload::Batch(_)) => "m3u8".to_string(),
    };

    let data_dir = match dirs::home_dir() {
        Some(home) => home.join(".local").join("share").join("castup"),
        None => {
            tracing::warn!("Could not determine home directory; history not saved");
            return;
        }
    };

    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::warn!("Failed to create data directory: {e}");
        return;
    }

    match HistoryManager::new(&data_dir) {
        Ok(mut manager) => {
            if let Err(e) = manager.save_published(draft.title.trim(), url, &format) {
                tracing::warn!("Failed to save publish history: {e}");
            }
        }
        Err(e) => tracing::warn!("Failed to open publish history: {e}"),
    }
}

/// File extension for a source blob's MIME type.
fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "audio/mpeg" => "mp3",
        "audio/mp4" | "audio/x-m4a" | "audio/m4a" => "m4a",
        "audio/wav" => "wav",
        "audio/ogg" => "ogg",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for_known_types() {
        assert_eq!(extension_for("audio/mpeg"), "mp3");
        assert_eq!(extension_for("audio/x-m4a"), "m4a");
        assert_eq!(extension_for("application/octet-stream"), "bin");
    }
}
