//! Gazelle-style catalog HTTP client
//!
//! Talks to `ajax.php` with the API key in the `Authorization` header.
//! All requests go through a client-side rate limiter.

use async_trait::async_trait;
use hvst_common::config::CatalogConfig;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::services::catalog::{
    CatalogClient, CatalogError, ReleaseGroupResponse, TorrentResponse, UploadOutcome,
    UploadPayload,
};

const USER_AGENT: &str = concat!("hvst-studio/", env!("CARGO_PKG_VERSION"));

/// Gazelle answers unknown ids/hashes with these failure messages
const NOT_FOUND_ERRORS: [&str; 2] = ["bad id parameter", "bad hash parameter"];

/// Response envelope shared by every ajax action
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    #[serde(default)]
    response: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "torrentid")]
    torrent_id: u64,
    #[serde(rename = "groupid")]
    group_id: u64,
}

/// Minimum spacing between consecutive requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Catalog client over HTTP
pub struct HttpCatalogClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    rate_limiter: Arc<RateLimiter>,
}

impl HttpCatalogClient {
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| CatalogError::NotConfigured("[catalog] api_key is not set".to_string()))?;

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CatalogError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            rate_limiter: Arc::new(RateLimiter::new(Duration::from_millis(
                config.request_interval_ms,
            ))),
        })
    }

    fn ajax_url(&self) -> String {
        format!("{}/ajax.php", self.base_url)
    }

    async fn get_action<T: DeserializeOwned>(
        &self,
        action: &str,
        query: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        self.rate_limiter.wait().await;

        tracing::debug!(action, ?query, "Querying catalog");

        let response = self
            .http_client
            .get(self.ajax_url())
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .query(&[("action", action)])
            .query(query)
            .send()
            .await
            .map_err(|e| CatalogError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CatalogError::NetworkError(e.to_string()))?;

        // Gazelle reports failures inside a JSON envelope, often with a 400
        match serde_json::from_str::<Envelope<T>>(&body) {
            Ok(envelope) => unwrap_envelope(envelope),
            Err(_) if !status.is_success() => Err(CatalogError::ApiError(status.as_u16(), body)),
            Err(e) => Err(CatalogError::ParseError(e.to_string())),
        }
    }
}

fn unwrap_envelope<T>(envelope: Envelope<T>) -> Result<T, CatalogError> {
    if envelope.status == "success" {
        return envelope
            .response
            .ok_or_else(|| CatalogError::ParseError("success response without payload".to_string()));
    }

    let error = envelope.error.unwrap_or_else(|| envelope.status.clone());
    if NOT_FOUND_ERRORS.contains(&error.as_str()) {
        Err(CatalogError::NotFound(error))
    } else {
        Err(CatalogError::ApiError(200, error))
    }
}

fn upload_form(payload: &UploadPayload, torrent_file: &[u8]) -> Result<Form, CatalogError> {
    let torrent_part = Part::bytes(torrent_file.to_vec())
        .file_name("upload.torrent")
        .mime_str("application/x-bittorrent")
        .map_err(|e| CatalogError::ParseError(e.to_string()))?;

    let mut form = Form::new()
        .part("file_input", torrent_part)
        .text("type", "0")
        .text("groupid", payload.group_id.to_string())
        .text("format", payload.format.clone())
        .text("bitrate", payload.encoding.clone())
        .text("media", payload.media.clone())
        .text("remaster_title", payload.remaster_title.clone())
        .text("remaster_record_label", payload.remaster_record_label.clone())
        .text("remaster_catalogue_number", payload.remaster_catalogue_number.clone())
        .text("release_desc", payload.release_description.clone());
    if let Some(year) = payload.remaster_year {
        form = form.text("remaster_year", year.to_string());
    }
    Ok(form)
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn fetch_torrent(&self, torrent_id: u64) -> Result<TorrentResponse, CatalogError> {
        let response: TorrentResponse = self
            .get_action("torrent", &[("id", torrent_id.to_string())])
            .await?;

        tracing::info!(
            torrent_id,
            group = %response.group.name,
            "Retrieved torrent from catalog"
        );
        Ok(response)
    }

    async fn fetch_release_group(&self, group_id: u64) -> Result<ReleaseGroupResponse, CatalogError> {
        self.get_action("torrentgroup", &[("id", group_id.to_string())])
            .await
    }

    async fn submit_upload(
        &self,
        payload: &UploadPayload,
        torrent_file: &[u8],
    ) -> Result<UploadOutcome, CatalogError> {
        self.rate_limiter.wait().await;

        tracing::info!(group_id = payload.group_id, "Submitting upload to catalog");

        let response = self
            .http_client
            .post(self.ajax_url())
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .query(&[("action", "upload")])
            .multipart(upload_form(payload, torrent_file)?)
            .send()
            .await
            .map_err(|e| CatalogError::NetworkError(e.to_string()))?;

        let raw_response = response
            .text()
            .await
            .map_err(|e| CatalogError::NetworkError(e.to_string()))?;

        // Anything other than a well-formed success is a rejection; the raw
        // body is kept for diagnosis
        let outcome = match serde_json::from_str::<Envelope<UploadResponse>>(&raw_response) {
            Ok(envelope) => match unwrap_envelope(envelope) {
                Ok(uploaded) => UploadOutcome::Accepted {
                    torrent_id: uploaded.torrent_id,
                    group_id: uploaded.group_id,
                },
                Err(e) => UploadOutcome::Rejected {
                    raw_response,
                    error: e.to_string(),
                },
            },
            Err(e) => UploadOutcome::Rejected {
                raw_response,
                error: format!("Unparseable upload response: {}", e),
            },
        };
        Ok(outcome)
    }

    async fn find_release_by_fingerprint(
        &self,
        info_hash: &str,
    ) -> Result<Option<TorrentResponse>, CatalogError> {
        match self
            .get_action::<TorrentResponse>("torrent", &[("hash", info_hash.to_uppercase())])
            .await
        {
            Ok(response) => Ok(Some(response)),
            Err(CatalogError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
