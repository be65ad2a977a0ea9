//! Step executor contract and per-run context
//!
//! An executor is built fresh for every attempt and runs its operations in
//! order against a [`StepContext`]. Each operation announces itself with
//! [`StepContext::begin_operation`] so a fatal error can be attributed to
//! it. Returning `Err` from `run` aborts the remaining operations.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{StepError, StepResult};
use crate::ledger::WarningLedger;
use crate::models::{MusicMetadata, SourceTorrentRef};
use crate::services::work_area::{copy_tree_into, WorkArea};

/// Operation name reported for failures before any operation started
pub const SETUP_OPERATION: &str = "setup";

/// One kind of step
#[async_trait]
pub trait StepExecutor: Send {
    /// Registry name
    fn name(&self) -> &'static str;

    /// Human-readable summary for logs
    fn description(&self) -> String;

    /// Run every operation in declared order
    async fn run(&mut self, ctx: &mut StepContext) -> StepResult<()>;
}

/// Parse step kwargs; `null` means all defaults
pub fn parse_kwargs<T: DeserializeOwned + Default>(kwargs: &serde_json::Value) -> StepResult<T> {
    if kwargs.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(kwargs.clone())?)
}

/// Everything a step may touch during one run
pub struct StepContext {
    project_id: Uuid,
    step_index: usize,
    step_name: String,
    work_area: WorkArea,
    prev_work_area: Option<WorkArea>,
    source: Option<SourceTorrentRef>,
    metadata: Option<MusicMetadata>,
    ledger: WarningLedger,
    operation: &'static str,
}

impl StepContext {
    pub fn new(
        project_id: Uuid,
        step_index: usize,
        step_name: impl Into<String>,
        work_area: WorkArea,
        prev_work_area: Option<WorkArea>,
    ) -> Self {
        Self {
            project_id,
            step_index,
            step_name: step_name.into(),
            work_area,
            prev_work_area,
            source: None,
            metadata: None,
            ledger: WarningLedger::new(),
            operation: SETUP_OPERATION,
        }
    }

    pub fn with_source(mut self, source: Option<SourceTorrentRef>) -> Self {
        self.source = source;
        self
    }

    /// Metadata handed over by the previous step
    pub fn with_metadata(mut self, metadata: Option<MusicMetadata>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn step_name(&self) -> &str {
        &self.step_name
    }

    /// Mark the start of the next operation
    pub fn begin_operation(&mut self, operation: &'static str) {
        tracing::info!(
            project_id = %self.project_id,
            step = %self.step_name,
            operation,
            "Running operation"
        );
        self.operation = operation;
    }

    /// Operation currently running (or the last one that ran)
    pub fn current_operation(&self) -> &'static str {
        self.operation
    }

    pub fn work_area(&self) -> &WorkArea {
        &self.work_area
    }

    pub fn data_path(&self) -> PathBuf {
        self.work_area.data_path()
    }

    pub fn prev_work_area(&self) -> StepResult<&WorkArea> {
        self.prev_work_area
            .as_ref()
            .ok_or_else(|| StepError::fatal(format!("{} has no previous step to read from", self.step_name)))
    }

    /// Copy the previous step's output tree into this step's `data/`
    pub fn copy_prev_step_files(&mut self) -> StepResult<()> {
        let src = self.prev_work_area()?.data_path();
        let dst = self.data_path();
        let bytes = copy_tree_into(&src, &dst)?;
        tracing::debug!(
            src = %src.display(),
            dst = %dst.display(),
            bytes,
            "Copied previous step files"
        );
        Ok(())
    }

    pub fn source(&self) -> Option<&SourceTorrentRef> {
        self.source.as_ref()
    }

    pub fn metadata(&self) -> StepResult<&MusicMetadata> {
        self.metadata
            .as_ref()
            .ok_or_else(|| StepError::fatal("Metadata is not initialized, a source step has to run first"))
    }

    pub fn metadata_mut(&mut self) -> StepResult<&mut MusicMetadata> {
        self.metadata
            .as_mut()
            .ok_or_else(|| StepError::fatal("Metadata is not initialized, a source step has to run first"))
    }

    /// Metadata and ledger together, for rules that read one and write the other
    pub fn metadata_and_ledger(&mut self) -> StepResult<(&MusicMetadata, &mut WarningLedger)> {
        match self.metadata.as_ref() {
            Some(metadata) => Ok((metadata, &mut self.ledger)),
            None => Err(StepError::fatal(
                "Metadata is not initialized, a source step has to run first",
            )),
        }
    }

    pub fn set_metadata(&mut self, metadata: MusicMetadata) {
        self.metadata = Some(metadata);
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.ledger.add_warning(message);
    }

    pub fn add_acknowledged_warning(&mut self, message: impl Into<String>) {
        self.ledger.add_acknowledged_warning(message);
    }

    pub fn ledger(&self) -> &WarningLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut WarningLedger {
        &mut self.ledger
    }

    /// Hand the results of the run back to the runner
    pub fn into_parts(self) -> (Option<MusicMetadata>, WarningLedger) {
        (self.metadata, self.ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Kwargs {
        check_duplicates: bool,
        limit: Option<u32>,
    }

    #[test]
    fn test_parse_kwargs() {
        let parsed: Kwargs = parse_kwargs(&serde_json::Value::Null).unwrap();
        assert_eq!(parsed, Kwargs::default());

        let parsed: Kwargs = parse_kwargs(&serde_json::json!({"limit": 3})).unwrap();
        assert_eq!(parsed.limit, Some(3));

        let result: StepResult<Kwargs> = parse_kwargs(&serde_json::json!({"limit": "three"}));
        assert!(matches!(result, Err(StepError::InvalidKwargs(_))));
    }

    #[test]
    fn test_copy_prev_step_files() {
        let temp = TempDir::new().unwrap();
        let project_id = Uuid::new_v4();
        let prev = WorkArea::new(temp.path(), project_id, 0, "local_source");
        let current = WorkArea::new(temp.path(), project_id, 1, "check_file_tags");
        prev.prepare().unwrap();
        current.prepare().unwrap();
        fs::write(prev.data_path().join("01.flac"), b"fLaC").unwrap();

        let mut ctx = StepContext::new(project_id, 1, "check_file_tags", current, Some(prev.clone()));
        ctx.copy_prev_step_files().unwrap();
        assert!(ctx.data_path().join("01.flac").is_file());
        // Previous area is left alone
        assert!(prev.data_path().join("01.flac").is_file());
    }

    #[test]
    fn test_first_step_has_no_previous_area() {
        let temp = TempDir::new().unwrap();
        let area = WorkArea::new(temp.path(), Uuid::new_v4(), 0, "check_file_tags");
        let mut ctx = StepContext::new(Uuid::new_v4(), 0, "check_file_tags", area, None);
        assert!(ctx.copy_prev_step_files().is_err());
        assert!(ctx.metadata().is_err());
        assert_eq!(ctx.current_operation(), SETUP_OPERATION);
    }
}
