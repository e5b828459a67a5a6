//! The episode draft: form state the user edits before publishing.
//!
//! All mutation goes through `patch()` so every field change flows the same
//! way, and `validate()` gates submission before any network call is made.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::media::AudioFormat;

/// Publication status of an episode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeStatus {
    #[default]
    Draft,
    Published,
}

impl std::fmt::Display for EpisodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Published => write!(f, "published"),
        }
    }
}

/// The draft an episode is published from.
///
/// Owned by the publish flow for the whole user interaction; reset after a
/// successful submission, preserved across failed ones.
#[derive(Debug, Clone, Default)]
pub struct EpisodeDraft {
    /// Episode title (required, non-empty after trim)
    pub title: String,
    pub status: EpisodeStatus,
    pub language: String,
    pub description: String,
    pub original_website: String,
    /// Album the episode is assigned to, if any
    pub album_id: Option<String>,
    /// Requested transcode target; `None` publishes the source as-is
    pub format: Option<AudioFormat>,
    /// Duration in seconds, when known (recordings)
    pub duration: Option<f64>,
}

/// A partial update applied to a draft. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct DraftPatch {
    pub title: Option<String>,
    pub status: Option<EpisodeStatus>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub original_website: Option<String>,
    pub album_id: Option<Option<String>>,
    pub format: Option<Option<AudioFormat>>,
    pub duration: Option<Option<f64>>,
}

impl EpisodeDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a partial update. The single mutation entry point.
    pub fn patch(&mut self, patch: DraftPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(language) = patch.language {
            self.language = language;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(original_website) = patch.original_website {
            self.original_website = original_website;
        }
        if let Some(album_id) = patch.album_id {
            self.album_id = album_id;
        }
        if let Some(format) = patch.format {
            self.format = format;
        }
        if let Some(duration) = patch.duration {
            self.duration = duration;
        }
    }

    /// Checks the draft is submittable. Runs before any network call.
    ///
    /// # Errors
    /// - `Error::InvalidInput` if the title is empty or whitespace-only
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidInput(
                "A title is required before publishing.".to_string(),
            ));
        }
        Ok(())
    }

    /// Restores the draft to its initial state after a successful publish.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_applies_only_set_fields() {
        let mut draft = EpisodeDraft::new();
        draft.patch(DraftPatch {
            title: Some("Morning news".to_string()),
            language: Some("en".to_string()),
            ..Default::default()
        });
        draft.patch(DraftPatch {
            status: Some(EpisodeStatus::Published),
            ..Default::default()
        });

        assert_eq!(draft.title, "Morning news");
        assert_eq!(draft.language, "en");
        assert_eq!(draft.status, EpisodeStatus::Published);
    }

    #[test]
    fn test_patch_can_clear_optional_fields() {
        let mut draft = EpisodeDraft::new();
        draft.patch(DraftPatch {
            album_id: Some(Some("a1".to_string())),
            ..Default::default()
        });
        assert_eq!(draft.album_id.as_deref(), Some("a1"));

        draft.patch(DraftPatch {
            album_id: Some(None),
            ..Default::default()
        });
        assert!(draft.album_id.is_none());
    }

    #[test]
    fn test_empty_title_blocks_submission() {
        let mut draft = EpisodeDraft::new();
        assert!(matches!(draft.validate(), Err(Error::InvalidInput(_))));

        draft.patch(DraftPatch {
            title: Some("   \t ".to_string()),
            ..Default::default()
        });
        assert!(matches!(draft.validate(), Err(Error::InvalidInput(_))));

        draft.patch(DraftPatch {
            title: Some("Episode 1".to_string()),
            ..Default::default()
        });
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut draft = EpisodeDraft::new();
        draft.patch(DraftPatch {
            title: Some("t".to_string()),
            status: Some(EpisodeStatus::Published),
            format: Some(Some(AudioFormat::M3u8)),
            ..Default::default()
        });
        draft.reset();
        assert!(draft.title.is_empty());
        assert_eq!(draft.status, EpisodeStatus::Draft);
        assert!(draft.format.is_none());
    }
}
