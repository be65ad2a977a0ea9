//! Remote catalog contract
//!
//! The catalog is the tracker site releases are uploaded to. Steps talk to
//! it only through [`CatalogClient`]; the HTTP implementation lives in
//! [`crate::services::catalog_http`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Catalog client errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Entity does not exist (or no longer exists) at the catalog
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Catalog client not configured: {0}")]
    NotConfigured(String),
}

/// Artist entry of a group's music info
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogArtist {
    #[serde(default)]
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicInfo {
    #[serde(default)]
    pub artists: Vec<CatalogArtist>,
}

/// Release group (one work, many editions/encodings)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogGroup {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub release_type: u32,
    #[serde(default)]
    pub music_info: MusicInfo,
    #[serde(default)]
    pub wiki_body: String,
}

/// One release (torrent) inside a group. String fields are HTML-escaped
/// exactly as the catalog returns them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogTorrent {
    pub id: u64,
    pub media: String,
    pub format: String,
    pub encoding: String,
    #[serde(default)]
    pub remaster_year: u32,
    #[serde(default)]
    pub remaster_title: String,
    #[serde(default)]
    pub remaster_record_label: String,
    #[serde(default)]
    pub remaster_catalogue_number: String,
    #[serde(default)]
    pub scene: bool,
    #[serde(default)]
    pub reported: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub info_hash: String,
}

/// `action=torrent` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentResponse {
    pub group: CatalogGroup,
    pub torrent: CatalogTorrent,
}

/// `action=torrentgroup` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseGroupResponse {
    pub group: CatalogGroup,
    #[serde(default)]
    pub torrents: Vec<CatalogTorrent>,
}

/// Form fields of an upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadPayload {
    pub group_id: u64,
    pub format: String,
    pub encoding: String,
    pub media: String,
    pub remaster_year: Option<u32>,
    pub remaster_title: String,
    pub remaster_record_label: String,
    pub remaster_catalogue_number: String,
    pub release_description: String,
}

/// Result of an upload submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Accepted { torrent_id: u64, group_id: u64 },
    /// The catalog refused the upload (or answered with something unparseable)
    Rejected { raw_response: String, error: String },
}

/// Remote catalog operations used by the pipeline
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch one torrent with its group
    async fn fetch_torrent(&self, torrent_id: u64) -> Result<TorrentResponse, CatalogError>;

    /// Fetch a group with all of its releases
    async fn fetch_release_group(&self, group_id: u64) -> Result<ReleaseGroupResponse, CatalogError>;

    /// Submit an upload. Transport failures are `Err`, refusals are `Ok(Rejected)`.
    async fn submit_upload(
        &self,
        payload: &UploadPayload,
        torrent_file: &[u8],
    ) -> Result<UploadOutcome, CatalogError>;

    /// Find a torrent by info-hash. `Ok(None)` when the catalog does not know it (yet).
    async fn find_release_by_fingerprint(
        &self,
        info_hash: &str,
    ) -> Result<Option<TorrentResponse>, CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_torrent_response() {
        let json = r#"{
            "group": {
                "id": 12,
                "name": "Kind of Blue",
                "releaseType": 1,
                "musicInfo": {"artists": [{"id": 3, "name": "Miles Davis"}], "with": []},
                "wikiBody": ""
            },
            "torrent": {
                "id": 345,
                "media": "SACD",
                "format": "FLAC",
                "encoding": "24bit Lossless",
                "remasterYear": 2015,
                "remasterTitle": "Analogue Productions",
                "remasterRecordLabel": "Columbia &amp; Legacy",
                "remasterCatalogueNumber": "CAPJ 8163 SA",
                "scene": false,
                "fileCount": 5,
                "infoHash": "ABCDEF"
            }
        }"#;

        let response: TorrentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.group.music_info.artists[0].name, "Miles Davis");
        assert_eq!(response.torrent.remaster_year, 2015);
        assert_eq!(response.torrent.remaster_record_label, "Columbia &amp; Legacy");
        assert!(!response.torrent.reported);
    }
}
