//! Metadata record carried from step to step
//!
//! Created by the source intake step, extended additively by every later
//! step, read-only to the final delivery step. The processing log is
//! append-only and the torrent name is write-once.
//!
//! Side-channel data is typed per producing step ([`AdditionalData`]);
//! keys that no step here owns survive untouched in `extra`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::models::audio_file::StreamInfo;

/// Release media, spelled the way the catalog spells it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Media {
    #[serde(rename = "CD")]
    Cd,
    #[serde(rename = "DVD")]
    Dvd,
    Vinyl,
    Soundboard,
    #[serde(rename = "SACD")]
    Sacd,
    #[serde(rename = "DAT")]
    Dat,
    Cassette,
    #[serde(rename = "WEB")]
    Web,
    #[serde(rename = "Blu-Ray")]
    BluRay,
}

impl Media {
    pub const ALL: [Media; 9] = [
        Media::Cd,
        Media::Dvd,
        Media::Vinyl,
        Media::Soundboard,
        Media::Sacd,
        Media::Dat,
        Media::Cassette,
        Media::Web,
        Media::BluRay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Media::Cd => "CD",
            Media::Dvd => "DVD",
            Media::Vinyl => "Vinyl",
            Media::Soundboard => "Soundboard",
            Media::Sacd => "SACD",
            Media::Dat => "DAT",
            Media::Cassette => "Cassette",
            Media::Web => "WEB",
            Media::BluRay => "Blu-Ray",
        }
    }

    pub fn from_catalog(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == value)
    }
}

impl fmt::Display for Media {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audio container/codec family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    #[serde(rename = "MP3")]
    Mp3,
    #[serde(rename = "FLAC")]
    Flac,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Mp3 => "MP3",
            Format::Flac => "FLAC",
        }
    }

    pub fn from_catalog(value: &str) -> Option<Self> {
        match value {
            "MP3" => Some(Format::Mp3),
            "FLAC" => Some(Format::Flac),
            _ => None,
        }
    }

    /// File extension of audio files in this format, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Mp3 => "mp3",
            Format::Flac => "flac",
        }
    }

    pub fn is_lossy(&self) -> bool {
        matches!(self, Format::Mp3)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    #[serde(rename = "192")]
    Cbr192,
    #[serde(rename = "APS (VBR)")]
    Aps,
    #[serde(rename = "V2 (VBR)")]
    V2,
    #[serde(rename = "V1 (VBR)")]
    V1,
    #[serde(rename = "256")]
    Cbr256,
    #[serde(rename = "APX (VBR)")]
    Apx,
    #[serde(rename = "V0 (VBR)")]
    V0,
    #[serde(rename = "320")]
    Cbr320,
    Lossless,
    #[serde(rename = "24bit Lossless")]
    Lossless24Bit,
    Other,
}

impl Encoding {
    pub const ALL: [Encoding; 11] = [
        Encoding::Cbr192,
        Encoding::Aps,
        Encoding::V2,
        Encoding::V1,
        Encoding::Cbr256,
        Encoding::Apx,
        Encoding::V0,
        Encoding::Cbr320,
        Encoding::Lossless,
        Encoding::Lossless24Bit,
        Encoding::Other,
    ];

    /// Catalog API spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Cbr192 => "192",
            Encoding::Aps => "APS (VBR)",
            Encoding::V2 => "V2 (VBR)",
            Encoding::V1 => "V1 (VBR)",
            Encoding::Cbr256 => "256",
            Encoding::Apx => "APX (VBR)",
            Encoding::V0 => "V0 (VBR)",
            Encoding::Cbr320 => "320",
            Encoding::Lossless => "Lossless",
            Encoding::Lossless24Bit => "24bit Lossless",
            Encoding::Other => "Other",
        }
    }

    /// Short name used in torrent names
    pub fn display_name(&self) -> &'static str {
        match self {
            Encoding::Cbr192 => "192",
            Encoding::Aps => "APS",
            Encoding::V2 => "V2",
            Encoding::V1 => "V1",
            Encoding::Cbr256 => "256",
            Encoding::Apx => "APX",
            Encoding::V0 => "V0",
            Encoding::Cbr320 => "320",
            Encoding::Lossless => "Lossless",
            Encoding::Lossless24Bit => "Lossless 24bit",
            Encoding::Other => "Other",
        }
    }

    pub fn from_catalog(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == value)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog release type (Gazelle numbering)
pub type ReleaseType = u32;

pub const RELEASE_TYPE_SINGLE: ReleaseType = 9;
pub const RELEASE_TYPE_MIXTAPE: ReleaseType = 16;

/// Provenance of the release, written by the source intake step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRelease {
    pub group_id: u64,
    pub torrent_id: u64,
    /// Group name as the catalog returns it (HTML-escaped)
    pub group_name: String,
    /// Main artist names
    #[serde(default)]
    pub artists: Vec<String>,
    pub release_type: ReleaseType,
    /// Free-form descriptive text of the source torrent
    #[serde(default)]
    pub description: String,
}

/// Recorded by the resample step: what the stream looked like before and after
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownsampleParams {
    pub source: StreamInfo,
    pub destination: StreamInfo,
}

/// Recorded by the torrent-file creation step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentFileRecord {
    /// Hex info-hash of the created torrent
    pub info_hash: String,
}

/// Recorded by the upload step once the catalog confirms the upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub torrent_id: u64,
    pub group_id: u64,
}

/// Side-channel data, one typed slot per producing step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdditionalData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceRelease>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downsample: Option<DownsampleParams>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torrent_file: Option<TorrentFileRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadRecord>,

    /// Keys not owned by any step in this crate
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Description of the release being produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicMetadata {
    pub title: String,
    pub media: Media,
    pub format: Format,
    pub encoding: Encoding,

    #[serde(default)]
    pub edition_year: Option<u32>,
    #[serde(default)]
    pub edition_title: String,
    #[serde(default)]
    pub edition_record_label: String,
    #[serde(default)]
    pub edition_catalog_number: String,

    #[serde(default)]
    torrent_name: Option<String>,

    #[serde(default)]
    processing_steps: Vec<String>,

    #[serde(default)]
    pub additional_data: AdditionalData,
}

impl MusicMetadata {
    pub fn new(title: impl Into<String>, media: Media, format: Format, encoding: Encoding) -> Self {
        Self {
            title: title.into(),
            media,
            format,
            encoding,
            edition_year: None,
            edition_title: String::new(),
            edition_record_label: String::new(),
            edition_catalog_number: String::new(),
            torrent_name: None,
            processing_steps: Vec::new(),
            additional_data: AdditionalData::default(),
        }
    }

    pub fn torrent_name(&self) -> Option<&str> {
        self.torrent_name.as_deref()
    }

    /// Set the torrent name. Setting the same value again is a no-op; a
    /// different value once set is refused.
    pub fn set_torrent_name(&mut self, name: impl Into<String>) -> Result<(), String> {
        let name = name.into();
        match &self.torrent_name {
            Some(existing) if *existing == name => Ok(()),
            Some(existing) => Err(format!(
                "Torrent name is already set to \"{}\", refusing to change it to \"{}\"",
                existing, name
            )),
            None => {
                self.torrent_name = Some(name);
                Ok(())
            }
        }
    }

    pub fn processing_steps(&self) -> &[String] {
        &self.processing_steps
    }

    /// Append a line to the processing log
    pub fn record_processing_step(&mut self, description: impl Into<String>) {
        self.processing_steps.push(description.into());
    }
}
