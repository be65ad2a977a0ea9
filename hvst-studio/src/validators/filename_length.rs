//! Filename length compliance
//!
//! Once uploaded, every file lives at `<torrent name>/<rel path>`. That
//! path must stay within [`MAX_PATH_LENGTH`] characters. Overlong names get
//! their stem truncated with a trailing [`TRUNCATION_MARKER`]; the extension
//! is kept.

use std::path::{Path, PathBuf};

use crate::error::{StepError, StepResult};

pub const MAX_PATH_LENGTH: usize = 180;

/// Shortest stem a truncated filename may keep
pub const MIN_SHORTENED_STEM_LENGTH: usize = 40;

pub const TRUNCATION_MARKER: char = '\u{2026}';

/// Length of `rel_path` once placed under a directory named `torrent_name`
pub fn upload_path_length(torrent_name: &str, rel_path: &Path) -> usize {
    rel_path.to_string_lossy().chars().count() + torrent_name.chars().count() + 1
}

/// The shortened relative path for `rel_path`, or `None` if it already fits
pub fn shortened_rel_path(torrent_name: &str, rel_path: &Path) -> StepResult<Option<PathBuf>> {
    let length = upload_path_length(torrent_name, rel_path);
    if length <= MAX_PATH_LENGTH {
        return Ok(None);
    }
    let excess = length - MAX_PATH_LENGTH;

    let file_name = rel_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| StepError::fatal(format!("{} has no file name", rel_path.display())))?;
    let (stem, extension) = match rel_path.extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy();
            let stem_len = file_name.chars().count() - ext.chars().count() - 1;
            (
                file_name.chars().take(stem_len).collect::<String>(),
                format!(".{}", ext),
            )
        }
        None => (file_name.clone(), String::new()),
    };

    // The marker itself takes one character
    let stem_len = stem.chars().count();
    let truncated: String = stem.chars().take(stem_len.saturating_sub(excess + 1)).collect();
    let truncated = truncated.trim_end();
    let kept = truncated.chars().count();
    if kept < MIN_SHORTENED_STEM_LENGTH {
        return Err(StepError::fatal(format!(
            "Path {} is {} characters long under \"{}\" (limit {}). Shortening the filename would \
             leave {} characters, at least {} are required. Rename it manually.",
            rel_path.display(),
            length,
            torrent_name,
            MAX_PATH_LENGTH,
            kept,
            MIN_SHORTENED_STEM_LENGTH
        )));
    }

    let new_name = format!("{}{}{}", truncated, TRUNCATION_MARKER, extension);
    Ok(Some(rel_path.with_file_name(new_name)))
}

/// Rename `data_path/rel_path` if its upload path is too long. Returns the
/// new relative path when a rename happened.
pub fn shorten_filename_if_necessary(
    torrent_name: &str,
    data_path: &Path,
    rel_path: &Path,
) -> StepResult<Option<PathBuf>> {
    let Some(new_rel_path) = shortened_rel_path(torrent_name, rel_path)? else {
        return Ok(None);
    };

    let src = data_path.join(rel_path);
    let dst = data_path.join(&new_rel_path);
    if dst.exists() {
        return Err(StepError::fatal(format!(
            "Cannot shorten {} to {}: target already exists",
            rel_path.display(),
            new_rel_path.display()
        )));
    }

    tracing::info!(
        file = %rel_path.display(),
        shortened = %new_rel_path.display(),
        "Shortening filename"
    );
    std::fs::rename(&src, &dst)?;
    Ok(Some(new_rel_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const TORRENT_NAME: &str = "Artist - Album - 2001 (CD - FLAC - Lossless)";

    fn long_name(stem_len: usize) -> PathBuf {
        PathBuf::from(format!("{}.flac", "x".repeat(stem_len)))
    }

    #[test]
    fn test_short_path_is_untouched() {
        assert_eq!(shortened_rel_path(TORRENT_NAME, Path::new("01 - Intro.flac")).unwrap(), None);
    }

    #[test]
    fn test_shortened_path_fits_exactly() {
        let rel = PathBuf::from("CD1").join(long_name(200));
        let shortened = shortened_rel_path(TORRENT_NAME, &rel).unwrap().unwrap();

        assert_eq!(upload_path_length(TORRENT_NAME, &shortened), MAX_PATH_LENGTH);
        assert!(shortened.starts_with("CD1"));
        let name = shortened.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("\u{2026}.flac"));

        // Shortening is a no-op the second time
        assert_eq!(shortened_rel_path(TORRENT_NAME, &shortened).unwrap(), None);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let torrent_name = "é".repeat(60);
        let rel = PathBuf::from(format!("{}.flac", "ö".repeat(114)));
        // 60 + 1 + 119 = 180
        assert_eq!(upload_path_length(&torrent_name, &rel), 180);
        assert_eq!(shortened_rel_path(&torrent_name, &rel).unwrap(), None);
    }

    #[test]
    fn test_refuses_below_minimum_stem() {
        // Deep directories leave no room for a readable name
        let rel = Path::new(&"d".repeat(120)).join(long_name(50));
        let err = shortened_rel_path(TORRENT_NAME, &rel).unwrap_err();
        assert!(err.to_string().contains("at least 40 are required"));
    }

    #[test]
    fn test_trailing_spaces_do_not_count_toward_minimum_stem() {
        // The cut lands inside the spaces, which are trimmed off
        let torrent_name = "t".repeat(128);
        let rel = PathBuf::from(format!("{}{}{}.flac", "a".repeat(39), " ".repeat(10), "b".repeat(80)));
        let err = shortened_rel_path(&torrent_name, &rel).unwrap_err();
        assert!(err.to_string().contains("would leave 39 characters"));
    }

    #[test]
    fn test_rename_on_disk() {
        let temp = TempDir::new().unwrap();
        let rel = long_name(150);
        fs::write(temp.path().join(&rel), b"fLaC").unwrap();

        let new_rel = shorten_filename_if_necessary(TORRENT_NAME, temp.path(), &rel)
            .unwrap()
            .unwrap();
        assert!(!temp.path().join(&rel).exists());
        assert!(temp.path().join(&new_rel).is_file());
    }

    #[test]
    fn test_collision_is_fatal() {
        let temp = TempDir::new().unwrap();
        let rel = long_name(150);
        let taken = shortened_rel_path(TORRENT_NAME, &rel).unwrap().unwrap();
        fs::write(temp.path().join(&rel), b"fLaC").unwrap();
        fs::write(temp.path().join(&taken), b"other").unwrap();

        let err = shorten_filename_if_necessary(TORRENT_NAME, temp.path(), &rel).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert!(temp.path().join(&rel).exists());
    }
}
