//! hvst-studio library interface
//!
//! Upload studio: runs a project as an ordered list of resumable steps and
//! validates audio releases before they are uploaded to the catalog.

pub mod error;
pub mod executors;
pub mod ledger;
pub mod models;
pub mod services;
pub mod step;
pub mod torrent_name;
pub mod utils;
pub mod validators;

pub use crate::error::{PipelineError, StepError, StepResult};
pub use crate::ledger::{Warning, WarningLedger};
pub use crate::step::{PipelineRunner, PipelineStatus, StepRegistry, StepServices};

/// Module name used for config lookup and logging
pub const MODULE_NAME: &str = "hvst-studio";
