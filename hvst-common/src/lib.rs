//! # Harvest Common Library
//!
//! Shared code for the Harvest upload studio crates:
//! - Error types
//! - TOML bootstrap configuration and root folder resolution
//! - Logging initialization
//! - Pipeline event types and the broadcast event bus

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
