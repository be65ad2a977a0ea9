//! Discovered audio files
//!
//! Derived data: rebuilt by discovery at the start of any step that needs
//! it and never persisted on its own.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Decoded stream characteristics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Sample rate (Hz)
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u8,
    /// Bits per sample, absent for lossy streams
    #[serde(default)]
    pub bit_depth: Option<u8>,
}

impl StreamInfo {
    /// 44100 Hz / 16-bit / 2-channel
    pub const REDBOOK: StreamInfo = StreamInfo {
        sample_rate: 44100,
        channels: 2,
        bit_depth: Some(16),
    };

    pub fn new(sample_rate: u32, bit_depth: Option<u8>, channels: u8) -> Self {
        Self {
            sample_rate,
            channels,
            bit_depth,
        }
    }

    pub fn is_redbook(&self) -> bool {
        *self == Self::REDBOOK
    }
}

impl fmt::Display for StreamInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bit_depth {
            Some(bits) => write!(f, "{} Hz / {}-bit / {} ch", self.sample_rate, bits, self.channels),
            None => write!(f, "{} Hz / {} ch", self.sample_rate, self.channels),
        }
    }
}

/// Raw tag values as read from the file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagBundle {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
    /// Raw track value, e.g. `"3"` or `"3/12"`
    pub track: Option<String>,
    /// Raw disc value, e.g. `"1"` or `"1/2"`
    pub disc: Option<String>,
}

/// Parsed `(track, disc)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackPosition {
    pub track: u32,
    pub disc: u32,
}

/// One audio file of a release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFile {
    /// Absolute path
    pub path: PathBuf,
    /// Path relative to the step's data directory
    pub rel_path: PathBuf,
    pub tags: TagBundle,
    pub stream: StreamInfo,
    /// Filled in by the tag completeness check
    pub position: Option<TrackPosition>,
}

impl AudioFile {
    pub fn new(path: PathBuf, rel_path: PathBuf, tags: TagBundle, stream: StreamInfo) -> Self {
        Self {
            path,
            rel_path,
            tags,
            stream,
            position: None,
        }
    }
}
