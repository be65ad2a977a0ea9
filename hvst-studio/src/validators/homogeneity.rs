//! Stream homogeneity
//!
//! All audio files of a release share one sample rate, channel count and
//! bit depth.

use crate::error::{StepError, StepResult};
use crate::models::{AudioFile, StreamInfo};

/// The stream layout shared by every file
pub fn common_stream(files: &[AudioFile]) -> StepResult<StreamInfo> {
    let first = files
        .first()
        .ok_or_else(|| StepError::fatal("No audio files discovered"))?;

    if let Some(odd) = files.iter().find(|f| f.stream != first.stream) {
        return Err(StepError::fatal(format!(
            "Audio files have different stream characteristics: {} is {}, but {} is {}",
            first.rel_path.display(),
            first.stream,
            odd.rel_path.display(),
            odd.stream
        )));
    }
    Ok(first.stream)
}
