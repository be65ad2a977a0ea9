//! Step factories
//!
//! The runner resolves step names through a [`StepRegistry`] it is given at
//! construction. Factories receive the step's kwargs and the shared
//! [`StepServices`] and build a fresh executor for one attempt.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{PipelineError, StepResult};
use crate::executors::{CatalogTorrentSource, CatalogUpload, CheckFileTags, LocalSource, Resample};
use crate::models::step_names;
use crate::services::catalog::CatalogClient;
use crate::services::file_scanner::FileScanner;
use crate::services::resampler::Resampler;
use crate::services::tag_reader::TagReader;
use crate::step::executor::StepExecutor;

/// Capabilities injected into steps
#[derive(Clone)]
pub struct StepServices {
    pub catalog: Arc<dyn CatalogClient>,
    pub tag_reader: Arc<dyn TagReader>,
    pub scanner: FileScanner,
    /// Resampling engine, if one is installed
    pub resampler: Option<Arc<dyn Resampler>>,
}

impl StepServices {
    pub fn new(catalog: Arc<dyn CatalogClient>, tag_reader: Arc<dyn TagReader>) -> Self {
        Self {
            catalog,
            tag_reader,
            scanner: FileScanner::new(),
            resampler: None,
        }
    }

    pub fn with_resampler(mut self, resampler: Arc<dyn Resampler>) -> Self {
        self.resampler = Some(resampler);
        self
    }
}

/// Builds an executor from kwargs
pub type StepFactory =
    Box<dyn Fn(&serde_json::Value, &StepServices) -> StepResult<Box<dyn StepExecutor>> + Send + Sync>;

/// Name to factory mapping
#[derive(Default)]
pub struct StepRegistry {
    factories: HashMap<String, StepFactory>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every step implemented in this crate
    pub fn with_builtin_steps() -> Self {
        let mut registry = Self::new();
        registry.register(step_names::CATALOG_TORRENT_SOURCE, |_, services| {
            Ok(Box::new(CatalogTorrentSource::new(services)))
        });
        registry.register(step_names::LOCAL_SOURCE, |kwargs, services| {
            Ok(Box::new(LocalSource::from_kwargs(kwargs, services)?))
        });
        registry.register(step_names::RESAMPLE, |kwargs, services| {
            Ok(Box::new(Resample::from_kwargs(kwargs, services)?))
        });
        registry.register(step_names::CHECK_FILE_TAGS, |kwargs, services| {
            Ok(Box::new(CheckFileTags::from_kwargs(kwargs, services)?))
        });
        registry.register(step_names::CATALOG_UPLOAD, |_, services| {
            Ok(Box::new(CatalogUpload::new(services)))
        });
        registry
    }

    /// Add or replace a factory
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&serde_json::Value, &StepServices) -> StepResult<Box<dyn StepExecutor>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build an executor. The outer error is an unknown name, the inner one
    /// a factory that rejected its kwargs.
    pub fn create(
        &self,
        name: &str,
        kwargs: &serde_json::Value,
        services: &StepServices,
    ) -> Result<StepResult<Box<dyn StepExecutor>>, PipelineError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| PipelineError::UnknownStep(name.to_string()))?;
        Ok(factory(kwargs, services))
    }
}
