//! Upload step
//!
//! Submits the release to the catalog exactly once, then polls the catalog
//! by info-hash until the upload is visible. A rejected submission is kept
//! as a diagnostic page and never resubmitted.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{StepError, StepResult};
use crate::models::{step_names, MusicMetadata, UploadRecord};
use crate::services::catalog::{CatalogClient, UploadOutcome, UploadPayload};
use crate::step::executor::{StepContext, StepExecutor};
use crate::step::registry::StepServices;
use crate::utils::{retry_fixed, FixedRetry, RetryOutcome};

/// Confirmation polling: 3 attempts, 2 seconds apart
pub const CONFIRM_POLICY: FixedRetry = FixedRetry::new(3, Duration::from_secs(2));

pub const TORRENT_FILE_AREA: &str = "torrent_file";
pub const UPLOAD_ERROR_AREA: &str = "upload_error";
const UPLOAD_ERROR_FILE: &str = "response.html";

/// Form fields for uploading `metadata`
pub fn upload_payload(metadata: &MusicMetadata) -> StepResult<UploadPayload> {
    let source = metadata
        .additional_data
        .source
        .as_ref()
        .ok_or_else(|| StepError::fatal("Source release is not recorded in metadata, cannot pick the upload group"))?;

    Ok(UploadPayload {
        group_id: source.group_id,
        format: metadata.format.as_str().to_string(),
        encoding: metadata.encoding.as_str().to_string(),
        media: metadata.media.as_str().to_string(),
        remaster_year: metadata.edition_year,
        remaster_title: metadata.edition_title.clone(),
        remaster_record_label: metadata.edition_record_label.clone(),
        remaster_catalogue_number: metadata.edition_catalog_number.clone(),
        release_description: metadata.processing_steps().join("\n"),
    })
}

pub struct CatalogUpload {
    catalog: Arc<dyn CatalogClient>,
    torrent_file: Vec<u8>,
    info_hash: String,
    accepted: Option<UploadRecord>,
}

impl CatalogUpload {
    pub fn new(services: &StepServices) -> Self {
        Self {
            catalog: services.catalog.clone(),
            torrent_file: Vec::new(),
            info_hash: String::new(),
            accepted: None,
        }
    }

    fn read_torrent_file(&mut self, ctx: &StepContext) -> StepResult<()> {
        let path: PathBuf = ctx.prev_work_area()?.single_file_in(TORRENT_FILE_AREA)?;
        if !path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("torrent"))
            .unwrap_or(false)
        {
            return Err(StepError::fatal(format!(
                "Expected a .torrent file, found {}",
                path.display()
            )));
        }

        self.info_hash = ctx
            .metadata()?
            .additional_data
            .torrent_file
            .as_ref()
            .map(|t| t.info_hash.clone())
            .filter(|hash| !hash.is_empty())
            .ok_or_else(|| StepError::fatal("Info-hash of the torrent file is not recorded in metadata"))?;
        self.torrent_file = std::fs::read(&path)?;

        tracing::debug!(file = %path.display(), info_hash = %self.info_hash, "Read torrent file");
        Ok(())
    }

    async fn submit_upload(&mut self, ctx: &mut StepContext) -> StepResult<()> {
        let payload = upload_payload(ctx.metadata()?)?;

        match self.catalog.submit_upload(&payload, &self.torrent_file).await {
            Ok(UploadOutcome::Accepted { torrent_id, group_id }) => {
                tracing::info!(torrent_id, group_id, "Upload accepted");
                self.accepted = Some(UploadRecord { torrent_id, group_id });
            }
            Ok(UploadOutcome::Rejected { raw_response, error }) => {
                let path = ctx.work_area().sub_area(UPLOAD_ERROR_AREA)?.join(UPLOAD_ERROR_FILE);
                std::fs::write(&path, raw_response)?;
                ctx.add_acknowledged_warning(format!(
                    "Upload was rejected by the catalog: {}. Response saved to {}.",
                    error,
                    path.display()
                ));
            }
            // The request may still have landed, so confirmation decides
            Err(e) => {
                ctx.add_acknowledged_warning(format!(
                    "Upload request failed: {}. Checking whether the upload landed anyway.",
                    e
                ));
            }
        }
        Ok(())
    }

    async fn confirm_upload(&self, ctx: &mut StepContext) -> StepResult<()> {
        let catalog = self.catalog.clone();
        let info_hash = self.info_hash.clone();

        let outcome = retry_fixed("confirm_upload", CONFIRM_POLICY, |attempt| {
            let catalog = catalog.clone();
            let info_hash = info_hash.clone();
            async move {
                tracing::debug!(attempt, info_hash = %info_hash, "Looking up upload");
                catalog.find_release_by_fingerprint(&info_hash).await
            }
        })
        .await;

        let (found, attempts) = match outcome {
            RetryOutcome::Confirmed { value, attempts } => (value, attempts),
            RetryOutcome::Exhausted { attempts, last_error } => {
                let detail = last_error.map(|e| format!(" Last error: {}", e)).unwrap_or_default();
                return Err(StepError::fatal(format!(
                    "Upload failed to confirm: info-hash {} not found at the catalog after {} attempts.{}",
                    self.info_hash, attempts, detail
                )));
            }
        };

        let record = UploadRecord {
            torrent_id: found.torrent.id,
            group_id: found.group.id,
        };
        if let Some(accepted) = &self.accepted {
            if *accepted != record {
                tracing::warn!(?accepted, confirmed = ?record, "Confirmed upload differs from submit response");
            }
        }

        let metadata = ctx.metadata_mut()?;
        metadata.record_processing_step(format!(
            "Uploaded to catalog as torrent {} in group {}, confirmed after {} attempt(s).",
            record.torrent_id, record.group_id, attempts
        ));
        metadata.additional_data.upload = Some(record);
        Ok(())
    }
}

#[async_trait]
impl StepExecutor for CatalogUpload {
    fn name(&self) -> &'static str {
        step_names::CATALOG_UPLOAD
    }

    fn description(&self) -> String {
        "Upload the release to the catalog.".to_string()
    }

    async fn run(&mut self, ctx: &mut StepContext) -> StepResult<()> {
        ctx.begin_operation("copy_prev_step_files");
        ctx.copy_prev_step_files()?;

        ctx.begin_operation("read_torrent_file");
        self.read_torrent_file(ctx)?;

        ctx.begin_operation("submit_upload");
        self.submit_upload(ctx).await?;

        ctx.begin_operation("confirm_upload");
        self.confirm_upload(ctx).await
    }
}
