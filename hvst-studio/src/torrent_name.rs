//! Upload torrent naming
//!
//! `"{artists} - {name} - {year} ({media} - {format} - {encoding})"`, with
//! characters that are invalid in paths removed.

use html_escape::decode_html_entities;

use crate::error::{StepError, StepResult};
use crate::models::MusicMetadata;

/// Group names longer than this are truncated
const MAX_NAME_LENGTH: usize = 70;
const TRUNCATED_NAME_LENGTH: usize = 67;

const INVALID_PATH_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Artist credit for a torrent name
pub fn joined_artists(artists: &[String]) -> String {
    match artists {
        [only] => decode_html_entities(only).into_owned(),
        [first, second] => format!(
            "{} & {}",
            decode_html_entities(first),
            decode_html_entities(second)
        ),
        _ => "Various Artists".to_string(),
    }
}

pub fn strip_invalid_path_characters(value: &str) -> String {
    value
        .chars()
        .filter(|c| !INVALID_PATH_CHARS.contains(c) && !c.is_control())
        .collect()
}

pub fn torrent_name_for_upload(metadata: &MusicMetadata) -> StepResult<String> {
    let source = metadata.additional_data.source.as_ref().ok_or_else(|| {
        StepError::fatal("Source release is not recorded in metadata, cannot name the torrent")
    })?;

    let mut name = decode_html_entities(&source.group_name).into_owned();
    if name.chars().count() > MAX_NAME_LENGTH {
        name = name.chars().take(TRUNCATED_NAME_LENGTH).collect::<String>() + "...";
    }

    let year = metadata
        .edition_year
        .map(|y| y.to_string())
        .unwrap_or_default();

    Ok(strip_invalid_path_characters(&format!(
        "{} - {} - {} ({} - {} - {})",
        joined_artists(&source.artists),
        name,
        year,
        metadata.media,
        metadata.format,
        metadata.encoding.display_name()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Encoding, Format, Media, SourceRelease};

    fn metadata(group_name: &str, artists: &[&str]) -> MusicMetadata {
        let mut m = MusicMetadata::new(group_name, Media::Cd, Format::Mp3, Encoding::V0);
        m.edition_year = Some(1994);
        m.additional_data.source = Some(SourceRelease {
            group_id: 1,
            torrent_id: 2,
            group_name: group_name.to_string(),
            artists: artists.iter().map(|a| a.to_string()).collect(),
            release_type: 1,
            description: String::new(),
        });
        m
    }

    #[test]
    fn test_basic_name() {
        let m = metadata("Dummy", &["Portishead"]);
        assert_eq!(
            torrent_name_for_upload(&m).unwrap(),
            "Portishead - Dummy - 1994 (CD - MP3 - V0)"
        );
    }

    #[test]
    fn test_artist_joining() {
        let two = vec!["Simon".to_string(), "Garfunkel".to_string()];
        assert_eq!(joined_artists(&two), "Simon & Garfunkel");
        let three = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        assert_eq!(joined_artists(&three), "Various Artists");
    }

    #[test]
    fn test_unescape_and_strip() {
        let m = metadata("Who&#39;s Next: Live?", &["The Who"]);
        assert_eq!(
            torrent_name_for_upload(&m).unwrap(),
            "The Who - Who's Next Live - 1994 (CD - MP3 - V0)"
        );
    }

    #[test]
    fn test_long_name_is_truncated() {
        let long = "a".repeat(71);
        let m = metadata(&long, &["X"]);
        let name = torrent_name_for_upload(&m).unwrap();
        assert!(name.contains(&format!("{}...", "a".repeat(67))));
        assert!(!name.contains(&"a".repeat(68)));
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let m = MusicMetadata::new("Album", Media::Web, Format::Flac, Encoding::Lossless);
        assert!(torrent_name_for_upload(&m).is_err());
    }
}
