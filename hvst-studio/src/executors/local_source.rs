//! Source intake from a local release directory
//!
//! Used when the metadata record is already known, e.g. re-checking a
//! release on disk. Kwargs carry the path and the metadata record.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{StepError, StepResult};
use crate::executors::torrent_source::check_audio_file_count;
use crate::models::{step_names, MusicMetadata};
use crate::services::file_scanner::FileScanner;
use crate::services::work_area::copy_tree_into;
use crate::step::executor::{StepContext, StepExecutor};
use crate::step::registry::StepServices;

#[derive(Debug, Clone, Deserialize)]
pub struct LocalSourceKwargs {
    /// Release directory (or single file)
    pub path: PathBuf,
    pub metadata: MusicMetadata,
}

pub struct LocalSource {
    kwargs: LocalSourceKwargs,
    scanner: FileScanner,
}

impl LocalSource {
    pub fn from_kwargs(kwargs: &serde_json::Value, services: &StepServices) -> StepResult<Self> {
        Ok(Self {
            kwargs: serde_json::from_value(kwargs.clone())?,
            scanner: services.scanner.clone(),
        })
    }
}

#[async_trait]
impl StepExecutor for LocalSource {
    fn name(&self) -> &'static str {
        step_names::LOCAL_SOURCE
    }

    fn description(&self) -> String {
        format!("Source data from {}.", self.kwargs.path.display())
    }

    async fn run(&mut self, ctx: &mut StepContext) -> StepResult<()> {
        ctx.begin_operation("copy_source_files");
        let path = &self.kwargs.path;
        if path.is_dir() {
            copy_tree_into(path, &ctx.data_path())?;
        } else if path.is_file() {
            let file_name = path
                .file_name()
                .ok_or_else(|| StepError::fatal("Source file has no name"))?;
            copy_tree_into(path, &ctx.data_path().join(file_name))?;
        } else {
            return Err(StepError::fatal(format!(
                "Source path {} does not exist",
                path.display()
            )));
        }

        let release_type = self
            .kwargs
            .metadata
            .additional_data
            .source
            .as_ref()
            .map(|s| s.release_type);
        check_audio_file_count(ctx, &self.scanner, self.kwargs.metadata.format, release_type)?;

        ctx.begin_operation("init_metadata");
        let mut metadata = self.kwargs.metadata.clone();
        metadata.record_processing_step(format!("Sourced from local path {}.", path.display()));
        ctx.set_metadata(metadata);
        Ok(())
    }
}
