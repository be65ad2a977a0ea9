//! Projects and their ordered steps
//!
//! A project is what the persistence layer stores; this module only defines
//! its shape and the state bookkeeping the runner relies on.

use chrono::{DateTime, Utc};
use hvst_common::events::StepState;
use hvst_common::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use crate::ledger::WarningLedger;
use crate::models::metadata::{Encoding, MusicMetadata};
use crate::services::catalog::TorrentResponse;

/// Downloaded catalog torrent a project transcodes from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceTorrentRef {
    /// Catalog torrent id
    pub tracker_id: u64,
    /// Directory the torrent client downloaded into
    pub download_path: PathBuf,
    /// Torrent name (file or top-level directory under `download_path`)
    pub name: String,
    /// Last catalog response seen for this torrent, used when the catalog
    /// no longer returns it
    #[serde(default)]
    pub cached_response: Option<TorrentResponse>,
}

impl SourceTorrentRef {
    pub fn content_path(&self) -> PathBuf {
        self.download_path.join(&self.name)
    }
}

/// Why a step failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    /// Operation that raised the error
    pub operation: String,
    pub message: String,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.operation, self.message)
    }
}

/// One configured step of a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectStep {
    pub executor_name: String,
    #[serde(default)]
    pub executor_kwargs: serde_json::Value,
    pub state: StepState,
    #[serde(default)]
    pub ledger: WarningLedger,
    /// Metadata as the step left it
    #[serde(default)]
    pub metadata: Option<MusicMetadata>,
    #[serde(default)]
    pub failure: Option<StepFailure>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ProjectStep {
    pub fn new(executor_name: impl Into<String>) -> Self {
        Self::with_kwargs(executor_name, serde_json::Value::Null)
    }

    pub fn with_kwargs(executor_name: impl Into<String>, executor_kwargs: serde_json::Value) -> Self {
        Self {
            executor_name: executor_name.into(),
            executor_kwargs,
            state: StepState::Pending,
            ledger: WarningLedger::new(),
            metadata: None,
            failure: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Forget the outcome of any previous attempt
    pub fn reset(&mut self) {
        self.state = StepState::Pending;
        self.ledger = WarningLedger::new();
        self.metadata = None;
        self.failure = None;
        self.started_at = None;
        self.finished_at = None;
    }

    /// Outcome of a completed run, decided by the ledger alone
    pub fn reevaluate(&mut self) -> StepState {
        if self.state == StepState::AwaitingAcknowledgment && !self.ledger.has_unacknowledged_warnings() {
            self.state = StepState::Succeeded;
        }
        self.state
    }
}

/// A release being produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub project_type: Option<String>,
    #[serde(default)]
    pub source_torrent: Option<SourceTorrentRef>,
    pub steps: Vec<ProjectStep>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            project_type: None,
            source_torrent: None,
            steps: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn push_step(&mut self, step: ProjectStep) {
        self.steps.push(step);
    }

    /// Metadata of the last succeeded step, i.e. the current release description
    pub fn current_metadata(&self) -> Option<&MusicMetadata> {
        self.steps
            .iter()
            .rev()
            .filter(|s| s.state == StepState::Succeeded)
            .find_map(|s| s.metadata.as_ref())
    }

    /// True once every step has succeeded
    pub fn is_complete(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|s| s.state == StepState::Succeeded)
    }
}

/// Step executor names shared by project builders and registries
pub mod step_names {
    pub const CATALOG_TORRENT_SOURCE: &str = "catalog_torrent_source";
    pub const LOCAL_SOURCE: &str = "local_source";
    pub const RESAMPLE: &str = "resample";
    pub const LAME_TRANSCODE: &str = "lame_transcode";
    pub const CHECK_FILE_TAGS: &str = "check_file_tags";
    pub const CREATE_TORRENT_FILE: &str = "create_torrent_file";
    pub const CATALOG_UPLOAD: &str = "catalog_upload";
    pub const FINISH_UPLOAD: &str = "finish_upload";
}

/// Kind of transcode a project produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscodeType {
    Mp3V0,
    Mp3320,
    RedbookFlac,
}

impl TranscodeType {
    pub const ALL: [TranscodeType; 3] = [
        TranscodeType::Mp3V0,
        TranscodeType::Mp3320,
        TranscodeType::RedbookFlac,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TranscodeType::Mp3V0 => "mp3_v0",
            TranscodeType::Mp3320 => "mp3_320",
            TranscodeType::RedbookFlac => "redbook_flac",
        }
    }

    /// Target lossy encoding, if any
    pub fn lossy_encoding(&self) -> Option<Encoding> {
        match self {
            TranscodeType::Mp3V0 => Some(Encoding::V0),
            TranscodeType::Mp3320 => Some(Encoding::Cbr320),
            TranscodeType::RedbookFlac => None,
        }
    }
}

impl FromStr for TranscodeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                let supported: Vec<_> = Self::ALL.iter().map(|t| t.as_str()).collect();
                Error::InvalidInput(format!(
                    "Unknown transcode type {}. Supported types: {}",
                    s,
                    supported.join(", ")
                ))
            })
    }
}

/// Ordered step list for a transcode project
pub fn transcode_project_steps(transcode_type: TranscodeType, announce_source: &str) -> Vec<ProjectStep> {
    let mut steps = vec![
        ProjectStep::new(step_names::CATALOG_TORRENT_SOURCE),
        ProjectStep::with_kwargs(
            step_names::RESAMPLE,
            json!({
                "target_sample_rate": "44100_or_48000",
                "target_bits_per_sample": 16,
                "target_channels": 2,
            }),
        ),
    ];
    if let Some(encoding) = transcode_type.lossy_encoding() {
        steps.push(ProjectStep::with_kwargs(
            step_names::LAME_TRANSCODE,
            json!({ "bitrate": encoding }),
        ));
    }
    steps.push(ProjectStep::new(step_names::CHECK_FILE_TAGS));
    steps.push(ProjectStep::with_kwargs(
        step_names::CREATE_TORRENT_FILE,
        json!({ "extra_info_keys": { "source": announce_source } }),
    ));
    steps.push(ProjectStep::new(step_names::CATALOG_UPLOAD));
    steps.push(ProjectStep::new(step_names::FINISH_UPLOAD));
    steps
}

/// Build a transcode project for a downloaded source torrent
pub fn create_transcode_project(
    name: impl Into<String>,
    source_torrent: SourceTorrentRef,
    transcode_type: TranscodeType,
    announce_source: &str,
) -> Project {
    let mut project = Project::new(format!("{} ({})", name.into(), transcode_type.as_str()));
    project.project_type = Some(format!("transcode_{}", transcode_type.as_str()));
    project.source_torrent = Some(source_torrent);
    project.steps = transcode_project_steps(transcode_type, announce_source);
    project
}
