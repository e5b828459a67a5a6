//! HLS playlist helpers.
//!
//! Small pure functions over M3U8 playlist text: completeness checking, the
//! idempotent end-of-list patch, and segment enumeration. A VOD playlist is
//! only valid once it ends with `#EXT-X-ENDLIST`.

/// Marks a VOD playlist as complete.
pub const ENDLIST_TAG: &str = "#EXT-X-ENDLIST";

/// Playlist text plus its completeness marker.
#[derive(Debug, Clone)]
pub struct PlaylistStatus {
    pub text: String,
    /// Whether the playlist ends with the end-of-list tag
    pub complete: bool,
}

/// Returns whether the playlist contains the end-of-list tag.
pub fn is_complete(text: &str) -> bool {
    text.lines().any(|line| line.trim() == ENDLIST_TAG)
}

/// Guarantees the playlist ends with exactly one end-of-list tag.
///
/// Already-complete playlists are returned unchanged; the tag is never
/// duplicated.
pub fn ensure_endlist(text: &str) -> String {
    if is_complete(text) {
        return text.to_string();
    }

    tracing::debug!("Playlist missing {ENDLIST_TAG}, patching");

    let mut patched = text.to_string();
    if !patched.ends_with('\n') {
        patched.push('\n');
    }
    patched.push_str(ENDLIST_TAG);
    patched.push('\n');
    patched
}

/// Lists the segment file names referenced by the playlist.
///
/// Segment entries are the non-empty, non-tag lines.
pub fn segment_names(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const INCOMPLETE: &str = "#EXTM3U\n\
        #EXT-X-VERSION:3\n\
        #EXT-X-PLAYLIST-TYPE:VOD\n\
        #EXT-X-TARGETDURATION:2\n\
        #EXTINF:2.000000,\n\
        episode_000.ts\n\
        #EXTINF:1.500000,\n\
        episode_001.ts\n";

    #[test]
    fn test_incomplete_playlist_detected() {
        assert!(!is_complete(INCOMPLETE));
    }

    #[test]
    fn test_patch_appends_endlist_once() {
        let patched = ensure_endlist(INCOMPLETE);
        assert!(is_complete(&patched));
        assert_eq!(patched.matches(ENDLIST_TAG).count(), 1);
        assert!(patched.trim_end().ends_with(ENDLIST_TAG));
    }

    #[test]
    fn test_patch_is_idempotent() {
        let once = ensure_endlist(INCOMPLETE);
        let twice = ensure_endlist(&once);
        assert_eq!(once, twice);
        assert_eq!(twice.matches(ENDLIST_TAG).count(), 1);
    }

    #[test]
    fn test_patch_handles_missing_trailing_newline() {
        let patched = ensure_endlist("#EXTM3U\n#EXTINF:2.0,\nepisode_000.ts");
        assert!(patched.contains("episode_000.ts\n#EXT-X-ENDLIST"));
    }

    #[test]
    fn test_segment_names_skip_tags_and_blanks() {
        let patched = ensure_endlist(INCOMPLETE);
        assert_eq!(
            segment_names(&patched),
            vec!["episode_000.ts".to_string(), "episode_001.ts".to_string()]
        );
    }
}
