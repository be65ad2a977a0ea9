//! Rules step: validates a release before it may leave the system

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{StepError, StepResult};
use crate::models::{step_names, AudioFile, StreamInfo};
use crate::services::catalog::CatalogClient;
use crate::services::file_scanner::{list_rel_files, FileScanner};
use crate::services::tag_reader::TagReader;
use crate::step::executor::{parse_kwargs, StepContext, StepExecutor};
use crate::step::registry::StepServices;
use crate::torrent_name::torrent_name_for_upload;
use crate::validators::{
    check_downsample, check_duplicates, check_metadata_plausibility, check_tag_completeness,
    check_track_sort_order, common_stream, shorten_filename_if_necessary,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckFileTagsKwargs {
    /// Query the catalog for releases identical to this one
    pub check_duplicates: bool,
}

impl Default for CheckFileTagsKwargs {
    fn default() -> Self {
        Self {
            check_duplicates: true,
        }
    }
}

pub struct CheckFileTags {
    kwargs: CheckFileTagsKwargs,
    catalog: Arc<dyn CatalogClient>,
    tag_reader: Arc<dyn TagReader>,
    scanner: FileScanner,
    files: Vec<AudioFile>,
}

impl CheckFileTags {
    pub fn from_kwargs(kwargs: &serde_json::Value, services: &StepServices) -> StepResult<Self> {
        Ok(Self {
            kwargs: parse_kwargs(kwargs)?,
            catalog: services.catalog.clone(),
            tag_reader: services.tag_reader.clone(),
            scanner: services.scanner.clone(),
            files: Vec::new(),
        })
    }

    fn generate_torrent_name(&self, ctx: &mut StepContext) -> StepResult<()> {
        let name = torrent_name_for_upload(ctx.metadata()?)?;
        tracing::info!(torrent_name = %name, "Generated torrent name");
        ctx.metadata_mut()?
            .set_torrent_name(name)
            .map_err(StepError::Fatal)
    }

    fn discover_audio_files(&mut self, ctx: &StepContext) -> StepResult<StreamInfo> {
        let format = ctx.metadata()?.format;
        let data_path = ctx.data_path();

        self.files.clear();
        for path in self.scanner.scan(&data_path, format.extension())? {
            let probe = self.tag_reader.read(&path, format)?;
            let rel_path = path
                .strip_prefix(&data_path)
                .map(PathBuf::from)
                .map_err(|_| StepError::fatal(format!("{} is outside {}", path.display(), data_path.display())))?;
            self.files.push(AudioFile::new(path, rel_path, probe.tags, probe.stream));
        }
        tracing::debug!(count = self.files.len(), "Discovered audio files");
        common_stream(&self.files)
    }

    fn shorten_filenames(&mut self, ctx: &mut StepContext) -> StepResult<()> {
        let data_path = ctx.data_path();
        let torrent_name = ctx
            .metadata()?
            .torrent_name()
            .map(str::to_string)
            .ok_or_else(|| StepError::fatal("Torrent name has not been generated"))?;

        for rel_path in list_rel_files(&data_path)? {
            let Some(new_rel_path) = shorten_filename_if_necessary(&torrent_name, &data_path, &rel_path)? else {
                continue;
            };
            if let Some(file) = self.files.iter_mut().find(|f| f.rel_path == rel_path) {
                file.path = data_path.join(&new_rel_path);
                file.rel_path = new_rel_path.clone();
            }
            ctx.metadata_mut()?.record_processing_step(format!(
                "Shortened {} to {}.",
                rel_path.display(),
                new_rel_path.display()
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl StepExecutor for CheckFileTags {
    fn name(&self) -> &'static str {
        step_names::CHECK_FILE_TAGS
    }

    fn description(&self) -> String {
        "Check the tags of audio files for upload.".to_string()
    }

    async fn run(&mut self, ctx: &mut StepContext) -> StepResult<()> {
        ctx.begin_operation("copy_prev_step_files");
        ctx.copy_prev_step_files()?;

        ctx.begin_operation("generate_torrent_name");
        self.generate_torrent_name(ctx)?;

        ctx.begin_operation("discover_audio_files");
        let stream = self.discover_audio_files(ctx)?;

        ctx.begin_operation("check_tags");
        check_tag_completeness(&mut self.files)?;

        ctx.begin_operation("check_downsample");
        check_downsample(ctx.metadata()?, stream)?;

        ctx.begin_operation("check_metadata_plausibility");
        let (metadata, ledger) = ctx.metadata_and_ledger()?;
        check_metadata_plausibility(metadata, ledger);

        ctx.begin_operation("check_duplicates");
        if self.kwargs.check_duplicates {
            let (metadata, ledger) = ctx.metadata_and_ledger()?;
            check_duplicates(metadata, self.catalog.as_ref(), ledger).await?;
        } else {
            tracing::info!("Duplicate check disabled");
        }

        ctx.begin_operation("shorten_filenames");
        self.shorten_filenames(ctx)?;

        ctx.begin_operation("check_track_sort_order");
        check_track_sort_order(&self.files, ctx.ledger_mut())
    }
}
