//! Tag and stream property reading
//!
//! [`TagReader`] is the seam the rules step reads files through;
//! [`LoftyTagReader`] is the production implementation.

use lofty::file::{FileType, TaggedFileExt};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::ItemKey;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{Format, StreamInfo, TagBundle};

/// Tag reading errors
#[derive(Debug, Error)]
pub enum TagReadError {
    /// Declared format has no tag reader
    #[error("No idea how to read tags for format {0}")]
    UnsupportedFormat(String),

    /// File content does not match the declared format
    #[error("{path} is not a {expected} file")]
    FormatMismatch { path: PathBuf, expected: String },

    /// Failed to open or parse the file
    #[error("Failed to read {0}: {1}")]
    ReadError(PathBuf, String),

    /// Stream properties missing from the file
    #[error("Unable to determine {what} of {path}")]
    MissingProperty { path: PathBuf, what: &'static str },
}

/// Tags plus stream characteristics of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioProbe {
    pub tags: TagBundle,
    pub stream: StreamInfo,
}

/// Reads tags of a file in a declared format
pub trait TagReader: Send + Sync {
    fn read(&self, path: &Path, format: Format) -> Result<AudioProbe, TagReadError>;
}

/// Tag reader backed by lofty
#[derive(Debug, Default, Clone)]
pub struct LoftyTagReader;

impl LoftyTagReader {
    pub fn new() -> Self {
        Self
    }
}

impl TagReader for LoftyTagReader {
    fn read(&self, path: &Path, format: Format) -> Result<AudioProbe, TagReadError> {
        let expected_type = match format {
            Format::Mp3 => FileType::Mpeg,
            Format::Flac => FileType::Flac,
        };

        let tagged_file = Probe::open(path)
            .map_err(|e| TagReadError::ReadError(path.to_path_buf(), e.to_string()))?
            .read()
            .map_err(|e| TagReadError::ReadError(path.to_path_buf(), e.to_string()))?;

        if tagged_file.file_type() != expected_type {
            return Err(TagReadError::FormatMismatch {
                path: path.to_path_buf(),
                expected: format.to_string(),
            });
        }

        let properties = tagged_file.properties();
        let sample_rate = properties.sample_rate().ok_or(TagReadError::MissingProperty {
            path: path.to_path_buf(),
            what: "sample rate",
        })?;
        let channels = properties.channels().ok_or(TagReadError::MissingProperty {
            path: path.to_path_buf(),
            what: "channel count",
        })?;
        let bit_depth = match format {
            Format::Flac => Some(properties.bit_depth().ok_or(TagReadError::MissingProperty {
                path: path.to_path_buf(),
                what: "bit depth",
            })?),
            Format::Mp3 => None,
        };

        let tags = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag())
            .map(|tag| TagBundle {
                artist: tag.artist().map(|s| s.to_string()),
                album: tag.album().map(|s| s.to_string()),
                title: tag.title().map(|s| s.to_string()),
                track: tag.get_string(&ItemKey::TrackNumber).map(str::to_string),
                disc: tag.get_string(&ItemKey::DiscNumber).map(str::to_string),
            })
            .unwrap_or_default();

        tracing::debug!(
            file = %path.display(),
            artist = ?tags.artist,
            title = ?tags.title,
            track = ?tags.track,
            sample_rate,
            "Read tags"
        );

        Ok(AudioProbe {
            tags,
            stream: StreamInfo::new(sample_rate, bit_depth, channels),
        })
    }
}
