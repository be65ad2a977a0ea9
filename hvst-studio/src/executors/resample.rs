//! Resample step
//!
//! Converts the previous step's audio to a target stream layout through
//! the installed [`Resampler`], copies everything else over unchanged, and
//! records what was done as a [`DownsampleParams`] for the rules step.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{StepError, StepResult};
use crate::models::{step_names, AudioFile, DownsampleParams, StreamInfo};
use crate::services::file_scanner::{list_rel_files, FileScanner};
use crate::services::resampler::Resampler;
use crate::services::tag_reader::TagReader;
use crate::services::work_area::copy_tree_into;
use crate::step::executor::{parse_kwargs, StepContext, StepExecutor};
use crate::step::registry::StepServices;
use crate::validators::common_stream;

/// Sample rate selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetSampleRate {
    Fixed(u32),
    Policy(SampleRatePolicy),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleRatePolicy {
    /// 44100 for multiples of 44100, 48000 for multiples of 48000
    #[serde(rename = "44100_or_48000")]
    Cd44100Or48000,
}

impl TargetSampleRate {
    pub fn resolve(&self, source_rate: u32) -> StepResult<u32> {
        match self {
            TargetSampleRate::Fixed(rate) => Ok(*rate),
            TargetSampleRate::Policy(SampleRatePolicy::Cd44100Or48000) => {
                if source_rate % 44100 == 0 {
                    Ok(44100)
                } else if source_rate % 48000 == 0 {
                    Ok(48000)
                } else {
                    Err(StepError::fatal(format!(
                        "Source sample rate {} Hz is not a multiple of 44100 or 48000",
                        source_rate
                    )))
                }
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResampleKwargs {
    pub target_sample_rate: TargetSampleRate,
    pub target_bits_per_sample: u8,
    pub target_channels: u8,
}

impl Default for ResampleKwargs {
    fn default() -> Self {
        Self {
            target_sample_rate: TargetSampleRate::Policy(SampleRatePolicy::Cd44100Or48000),
            target_bits_per_sample: 16,
            target_channels: 2,
        }
    }
}

impl ResampleKwargs {
    /// Target layout for a given source layout
    pub fn target_for(&self, source: StreamInfo) -> StepResult<StreamInfo> {
        Ok(StreamInfo::new(
            self.target_sample_rate.resolve(source.sample_rate)?,
            source.bit_depth.map(|_| self.target_bits_per_sample),
            self.target_channels,
        ))
    }
}

pub struct Resample {
    kwargs: ResampleKwargs,
    resampler: Arc<dyn Resampler>,
    tag_reader: Arc<dyn TagReader>,
    scanner: FileScanner,
    files: Vec<AudioFile>,
}

impl Resample {
    pub fn from_kwargs(kwargs: &serde_json::Value, services: &StepServices) -> StepResult<Self> {
        let resampler = services
            .resampler
            .clone()
            .ok_or_else(|| StepError::fatal("No resampling engine is installed"))?;
        Ok(Self {
            kwargs: parse_kwargs(kwargs)?,
            resampler,
            tag_reader: services.tag_reader.clone(),
            scanner: services.scanner.clone(),
            files: Vec::new(),
        })
    }

    fn discover_audio_files(&mut self, ctx: &StepContext) -> StepResult<StreamInfo> {
        let format = ctx.metadata()?.format;
        let src_root = ctx.prev_work_area()?.data_path();

        self.files.clear();
        for path in self.scanner.scan(&src_root, format.extension())? {
            let probe = self.tag_reader.read(&path, format)?;
            let rel_path = path
                .strip_prefix(&src_root)
                .map(PathBuf::from)
                .map_err(|_| StepError::fatal(format!("{} is outside {}", path.display(), src_root.display())))?;
            self.files.push(AudioFile::new(path, rel_path, probe.tags, probe.stream));
        }
        common_stream(&self.files)
    }

    async fn resample(&self, ctx: &mut StepContext, source: StreamInfo) -> StepResult<()> {
        let target = self.kwargs.target_for(source)?;
        let src_root = ctx.prev_work_area()?.data_path();
        let dst_root = ctx.data_path();

        if target == source {
            copy_tree_into(&src_root, &dst_root)?;
            ctx.metadata_mut()?.record_processing_step(format!(
                "Audio is already {}, no resampling needed.",
                target
            ));
            return Ok(());
        }

        let audio: HashSet<&PathBuf> = self.files.iter().map(|f| &f.rel_path).collect();
        for rel_path in list_rel_files(&src_root)? {
            if !audio.contains(&rel_path) {
                copy_tree_into(&src_root.join(&rel_path), &dst_root.join(&rel_path))?;
            }
        }

        for file in &self.files {
            let dst = dst_root.join(&file.rel_path);
            if let Some(parent) = dst.parent() {
                std::fs::create_dir_all(parent)?;
            }
            tracing::debug!(file = %file.rel_path.display(), target = %target, "Resampling");
            self.resampler.resample(&file.path, &dst, target).await?;
        }

        let metadata = ctx.metadata_mut()?;
        metadata.additional_data.downsample = Some(DownsampleParams {
            source,
            destination: target,
        });
        metadata.record_processing_step(format!(
            "Resampled {} files from {} to {} using {}.",
            self.files.len(),
            source,
            target,
            self.resampler.name()
        ));
        Ok(())
    }
}

#[async_trait]
impl StepExecutor for Resample {
    fn name(&self) -> &'static str {
        step_names::RESAMPLE
    }

    fn description(&self) -> String {
        format!(
            "Resample to {:?} / {}-bit / {} channels.",
            self.kwargs.target_sample_rate, self.kwargs.target_bits_per_sample, self.kwargs.target_channels
        )
    }

    async fn run(&mut self, ctx: &mut StepContext) -> StepResult<()> {
        ctx.begin_operation("discover_audio_files");
        let source = self.discover_audio_files(ctx)?;

        ctx.begin_operation("resample");
        self.resample(ctx, source).await
    }
}
