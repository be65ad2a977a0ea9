//! Utility modules for hvst-studio

pub mod confirm_retry;

pub use confirm_retry::{retry_fixed, FixedRetry, RetryOutcome};
