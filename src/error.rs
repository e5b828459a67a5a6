//! Pipeline error taxonomy.
//!
//! Every failure mode of the acquire → transcode → upload pipeline maps to a
//! distinct variant so callers can branch on the kind while the UI shows a
//! single human-readable message. Raw error details are logged, never shown.

/// All errors that can occur in the publishing pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("transcoder failed to load: {0}")]
    LoadFailed(String),

    #[error("transcoding failed: {0}")]
    TranscodeFailed(String),

    #[error("failed to obtain an upload URL: {0}")]
    PresignFailed(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("server rejected the request (status {status}): {message}")]
    ServerRejected { status: u16, message: String },

    #[error("failed to register the episode: {0}")]
    FinalizeFailed(String),

    #[error("no transcoded files found")]
    NoFilesFound,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl Error {
    /// Returns the single message shown to the user for this error kind.
    ///
    /// The variant selects the text; underlying details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Error::PermissionDenied(_) => {
                "Could not access the microphone. Check that an input device is connected \
                 and not in use by another application."
                    .to_string()
            }
            Error::InvalidInput(msg) => msg.clone(),
            Error::LoadFailed(_) => {
                "The audio transcoder could not be initialized. Make sure ffmpeg is installed."
                    .to_string()
            }
            Error::TranscodeFailed(_) => {
                "Transcoding failed. The recording was kept; you can try again or publish \
                 it in its original format."
                    .to_string()
            }
            Error::PresignFailed(_) => {
                "The server did not issue an upload URL. Please try again.".to_string()
            }
            Error::Network(_) => {
                "The upload could not be completed. Check your internet connection and try again."
                    .to_string()
            }
            Error::ServerRejected { message, .. } => message.clone(),
            Error::FinalizeFailed(_) => {
                "The upload finished but the episode could not be registered. Please try again."
                    .to_string()
            }
            Error::NoFilesFound => {
                "Transcoding produced no output files. Please try again.".to_string()
            }
            Error::Io(_) | Error::Json(_) | Error::Wav(_) => {
                "An unexpected error occurred. See 'castup logs' for details.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
