//! Server-owned entities.
//!
//! The backend owns these records; the pipeline only reads the identifiers
//! and fields it needs for the album picker and finalize responses.

use serde::Deserialize;

/// A persisted episode, as returned by the finalize endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub playlist_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Episode {
    /// The address the published audio is reachable at.
    pub fn public_url(&self) -> Option<&str> {
        self.url.as_deref().or(self.playlist_url.as_deref())
    }
}

/// An album episodes can be assigned to.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_deserializes_camel_case() {
        let episode: Episode = serde_json::from_str(
            r#"{"id": "ep1", "title": "News", "playlistUrl": "https://cdn/e/playlist.m3u8"}"#,
        )
        .unwrap();
        assert_eq!(episode.id, "ep1");
        assert_eq!(episode.public_url(), Some("https://cdn/e/playlist.m3u8"));
    }

    #[test]
    fn test_album_deserializes() {
        let album: Album = serde_json::from_str(r#"{"id": "a1", "name": "Season 1"}"#).unwrap();
        assert_eq!(album.name, "Season 1");
    }
}
