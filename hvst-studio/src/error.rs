//! Error types for hvst-studio
//!
//! Two levels:
//! - [`StepError`] unwinds a single step. Every variant is fatal for the
//!   step; the runner records it together with the operation that was
//!   running, so a failed step always says where and why.
//! - [`PipelineError`] reports misuse of the runner itself (unknown step
//!   names, acknowledging a step that is not waiting, bad indices).

use crate::services::catalog::CatalogError;
use crate::services::file_scanner::ScanError;
use crate::services::resampler::ResampleError;
use crate::services::tag_reader::TagReadError;
use hvst_common::events::StepState;
use thiserror::Error;

/// Fatal error raised by a step operation
#[derive(Debug, Error)]
pub enum StepError {
    /// Rule violation or unrecoverable condition with an actionable message
    #[error("{0}")]
    Fatal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote catalog error
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Tag reading error
    #[error("Tag read error: {0}")]
    TagRead(#[from] TagReadError),

    /// Audio file discovery error
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    /// Resampling engine error
    #[error("Resample error: {0}")]
    Resample(#[from] ResampleError),

    /// Step kwargs could not be parsed
    #[error("Invalid step arguments: {0}")]
    InvalidKwargs(#[from] serde_json::Error),

    /// hvst-common error
    #[error("Common error: {0}")]
    Common(#[from] hvst_common::Error),
}

impl StepError {
    /// Abort the current step with a message
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal(message.into())
    }
}

/// Result type for step operations
pub type StepResult<T> = Result<T, StepError>;

/// Pipeline runner error
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Step name not present in the registry
    #[error("Unknown step executor: {0}")]
    UnknownStep(String),

    /// Project has no steps configured
    #[error("Project {0} has no steps")]
    NoSteps(uuid::Uuid),

    /// Step index out of range
    #[error("Step index {index} out of range (project has {len} steps)")]
    StepOutOfRange { index: usize, len: usize },

    /// Acknowledgment sent to a step that is not waiting for one
    #[error("Step {index} is {state}, not awaiting acknowledgment")]
    NotAwaitingAcknowledgment { index: usize, state: StepState },
}
