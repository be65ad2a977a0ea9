//! Resampling engine contract
//!
//! The engines themselves (sox and friends) live outside this crate. The
//! resample step only decides targets and records what was done.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::StreamInfo;

#[derive(Debug, Error)]
pub enum ResampleError {
    #[error("Resampler failed on {path}: {message}")]
    EngineFailed { path: PathBuf, message: String },

    #[error("Resampler cannot produce {0}")]
    UnsupportedTarget(StreamInfo),
}

/// Converts one audio file to a target stream layout
#[async_trait]
pub trait Resampler: Send + Sync {
    /// Engine name, recorded in the processing log
    fn name(&self) -> &'static str;

    /// Write `src` converted to `target` at `dst`. `dst` does not exist yet;
    /// its parent directory does.
    async fn resample(&self, src: &Path, dst: &Path, target: StreamInfo) -> Result<(), ResampleError>;
}
