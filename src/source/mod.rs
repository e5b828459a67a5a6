//! Audio source providers.
//!
//! Three mutually exclusive acquisition strategies (local file, microphone
//! recording, remote URL) that all normalize to an `AcquiredSource` handed
//! to the upload orchestrator.

pub mod file;
pub mod record;
pub mod url;

pub use record::{RecordSource, RecordState};

use crate::media::MediaBlob;

/// The normalized output of every source provider.
#[derive(Debug, Clone)]
pub enum AcquiredSource {
    /// Audio bytes acquired locally (file or recording)
    Blob(MediaBlob),
    /// A validated remote audio URL
    Url(String),
}

impl AcquiredSource {
    /// Short label used in logs and the confirmation prompt.
    pub fn describe(&self) -> String {
        match self {
            Self::Blob(blob) => format!("{} ({} bytes)", blob.content_type, blob.len()),
            Self::Url(url) => url.clone(),
        }
    }
}
