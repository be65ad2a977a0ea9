//! Test Helper Utilities
//!
//! Shared utilities for testing hvst-studio

#![allow(dead_code, unused_imports)]

pub mod fakes;
pub mod fixtures;
pub mod steps;

// Re-export commonly used items
pub use fakes::{FakeCatalog, FakeResampler, FakeTagReader};
pub use fixtures::{
    catalog_torrent, local_source_step, sample_metadata, test_runner, write_release, TestEnv,
};
pub use steps::{register_scripted_step, ScriptedStep, StepScript};
