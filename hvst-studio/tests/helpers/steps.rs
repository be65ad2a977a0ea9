//! Scripted step executors for runner tests

use async_trait::async_trait;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hvst_studio::models::TorrentFileRecord;
use hvst_studio::step::{StepContext, StepExecutor};
use hvst_studio::{StepError, StepRegistry, StepResult};

pub const OUTPUT_FILE: &str = "output.txt";

/// What a scripted step does when run
#[derive(Clone, Default)]
pub struct StepScript {
    pub warnings: Vec<String>,
    pub acknowledged_warnings: Vec<String>,
    /// Operation that raises a fatal error
    pub fail_in: Option<&'static str>,
    /// Stage a `.torrent` file and record this info-hash
    pub info_hash: Option<String>,
    pub runs: Arc<AtomicUsize>,
}

impl StepScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warning(mut self, message: &str) -> Self {
        self.warnings.push(message.to_string());
        self
    }

    pub fn acknowledged_warning(mut self, message: &str) -> Self {
        self.acknowledged_warnings.push(message.to_string());
        self
    }

    pub fn failing_in(mut self, operation: &'static str) -> Self {
        self.fail_in = Some(operation);
        self
    }

    pub fn staging_torrent(mut self, info_hash: &str) -> Self {
        self.info_hash = Some(info_hash.to_string());
        self
    }

    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

pub struct ScriptedStep {
    name: &'static str,
    script: StepScript,
}

impl ScriptedStep {
    fn begin(&self, ctx: &mut StepContext, operation: &'static str) -> StepResult<()> {
        ctx.begin_operation(operation);
        if self.script.fail_in == Some(operation) {
            return Err(StepError::fatal(format!("{} failed on purpose", operation)));
        }
        Ok(())
    }
}

#[async_trait]
impl StepExecutor for ScriptedStep {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> String {
        format!("Scripted step {}", self.name)
    }

    async fn run(&mut self, ctx: &mut StepContext) -> StepResult<()> {
        self.script.runs.fetch_add(1, Ordering::SeqCst);

        self.begin(ctx, "copy_prev_step_files")?;
        if ctx.step_index() > 0 {
            ctx.copy_prev_step_files()?;
        }

        self.begin(ctx, "write_output")?;
        fs::write(ctx.data_path().join(OUTPUT_FILE), self.name)?;

        self.begin(ctx, "emit_warnings")?;
        for warning in &self.script.warnings {
            ctx.add_warning(warning.clone());
        }
        for warning in &self.script.acknowledged_warnings {
            ctx.add_acknowledged_warning(warning.clone());
        }

        self.begin(ctx, "stage_torrent_file")?;
        if let Some(info_hash) = &self.script.info_hash {
            let dir = ctx.work_area().sub_area("torrent_file")?;
            fs::write(dir.join("release.torrent"), b"d8:announce0:e")?;
            ctx.metadata_mut()?.additional_data.torrent_file = Some(TorrentFileRecord {
                info_hash: info_hash.clone(),
            });
        }
        Ok(())
    }
}

/// Register `name` as a scripted step. The script is shared across runs.
pub fn register_scripted_step(registry: &mut StepRegistry, name: &'static str, script: &StepScript) {
    let script = script.clone();
    registry.register(name, move |_, _| {
        Ok(Box::new(ScriptedStep {
            name,
            script: script.clone(),
        }) as Box<dyn StepExecutor>)
    });
}
