//! Tag completeness
//!
//! Artist, album, title and track must be present on every file. Disc
//! defaults to 1. Track and disc accept `N` and `N/M`.

use crate::error::{StepError, StepResult};
use crate::models::{AudioFile, TrackPosition};

const DEFAULT_DISC: u32 = 1;

/// Parse a raw track/disc tag value
pub fn parse_position_value(raw: &str) -> Option<u32> {
    let number = raw.split('/').next().unwrap_or_default().trim();
    number.parse().ok()
}

fn require_tag(value: &Option<String>, name: &str, file: &AudioFile) -> StepResult<()> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(()),
        _ => Err(StepError::fatal(format!(
            "Missing {} tag on {}",
            name,
            file.path.display()
        ))),
    }
}

/// Validate one file and fill in its track position
pub fn check_file(file: &mut AudioFile) -> StepResult<()> {
    require_tag(&file.tags.artist, "artist", file)?;
    require_tag(&file.tags.album, "album", file)?;
    require_tag(&file.tags.title, "title", file)?;

    let track = match file.tags.track.as_deref() {
        None => {
            return Err(StepError::fatal(format!(
                "Missing track tag on {}",
                file.path.display()
            )))
        }
        Some(raw) => parse_position_value(raw).ok_or_else(|| {
            StepError::fatal(format!(
                "Unable to parse track number \"{}\" on {}",
                raw,
                file.path.display()
            ))
        })?,
    };

    let disc = match file.tags.disc.as_deref() {
        None => DEFAULT_DISC,
        Some(raw) if raw.trim().is_empty() => DEFAULT_DISC,
        Some(raw) => parse_position_value(raw).ok_or_else(|| {
            StepError::fatal(format!(
                "Unable to parse disc number \"{}\" on {}",
                raw,
                file.path.display()
            ))
        })?,
    };

    file.position = Some(TrackPosition { track, disc });
    Ok(())
}

/// Validate every file, stopping at the first offender
pub fn check_tag_completeness(files: &mut [AudioFile]) -> StepResult<()> {
    for file in files.iter_mut() {
        check_file(file)?;
    }
    tracing::debug!(count = files.len(), "Tag completeness check passed");
    Ok(())
}
