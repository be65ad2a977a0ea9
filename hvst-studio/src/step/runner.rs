//! Pipeline runner
//!
//! Advances a project one step at a time. A step only starts once every
//! step before it has succeeded. The runner stops at the first step that
//! ends awaiting acknowledgment or failed; an external acknowledgment
//! re-evaluates the waiting step without re-running it, and the next call
//! to [`PipelineRunner::run`] carries on from there.

use chrono::Utc;
use hvst_common::events::{EventBus, HaltReason, PipelineEvent, StepState};
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::models::{MusicMetadata, Project, StepFailure};
use crate::services::work_area::WorkArea;
use crate::step::executor::StepContext;
use crate::step::registry::{StepRegistry, StepServices};

const PREPARE_OPERATION: &str = "prepare_work_area";
const CONFIGURE_OPERATION: &str = "configure";

/// Where a run stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStatus {
    /// Every step succeeded
    Completed,
    AwaitingAcknowledgment { step_index: usize, warnings: Vec<String> },
    Failed { step_index: usize, failure: StepFailure },
}

pub struct PipelineRunner {
    registry: StepRegistry,
    services: StepServices,
    work_root: PathBuf,
    events: EventBus,
}

impl PipelineRunner {
    pub fn new(registry: StepRegistry, services: StepServices, work_root: PathBuf, events: EventBus) -> Self {
        Self {
            registry,
            services,
            work_root,
            events,
        }
    }

    pub fn work_root(&self) -> &Path {
        &self.work_root
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Working area of step `index` of `project`
    pub fn work_area(&self, project: &Project, index: usize) -> Result<WorkArea, PipelineError> {
        let step = project.steps.get(index).ok_or(PipelineError::StepOutOfRange {
            index,
            len: project.steps.len(),
        })?;
        Ok(WorkArea::new(&self.work_root, project.id, index, &step.executor_name))
    }

    /// Run pending steps until the pipeline completes or halts
    pub async fn run(&self, project: &mut Project) -> Result<PipelineStatus, PipelineError> {
        if project.steps.is_empty() {
            return Err(PipelineError::NoSteps(project.id));
        }
        if let Some(unknown) = project
            .steps
            .iter()
            .find(|s| !self.registry.contains(&s.executor_name))
        {
            return Err(PipelineError::UnknownStep(unknown.executor_name.clone()));
        }

        for index in 0..project.steps.len() {
            let state = project.steps[index].state;
            let state = match state {
                StepState::Succeeded => continue,
                // Interrupted mid-run: start that attempt over
                StepState::Pending | StepState::Running => self.execute_step(project, index).await?,
                StepState::AwaitingAcknowledgment | StepState::Failed => state,
            };

            match state {
                StepState::Succeeded => continue,
                StepState::AwaitingAcknowledgment => {
                    let warnings: Vec<String> = project.steps[index]
                        .ledger
                        .unacknowledged()
                        .map(|w| w.message.clone())
                        .collect();
                    self.emit_halt(
                        project,
                        index,
                        HaltReason::AwaitingAcknowledgment {
                            warnings: warnings.clone(),
                        },
                    );
                    return Ok(PipelineStatus::AwaitingAcknowledgment {
                        step_index: index,
                        warnings,
                    });
                }
                _ => {
                    let failure = project.steps[index].failure.clone().unwrap_or_else(|| StepFailure {
                        operation: CONFIGURE_OPERATION.to_string(),
                        message: "Step failed without a recorded reason".to_string(),
                    });
                    self.emit_halt(
                        project,
                        index,
                        HaltReason::Failed {
                            operation: failure.operation.clone(),
                            message: failure.message.clone(),
                        },
                    );
                    return Ok(PipelineStatus::Failed {
                        step_index: index,
                        failure,
                    });
                }
            }
        }

        tracing::info!(project_id = %project.id, "Pipeline completed");
        self.events.emit_lossy(PipelineEvent::PipelineCompleted {
            project_id: project.id,
            timestamp: Utc::now(),
        });
        Ok(PipelineStatus::Completed)
    }

    /// Acknowledge every warning of a waiting step and re-evaluate it.
    /// Operations are not re-run.
    pub fn acknowledge(&self, project: &mut Project, index: usize) -> Result<StepState, PipelineError> {
        let len = project.steps.len();
        let step = project
            .steps
            .get_mut(index)
            .ok_or(PipelineError::StepOutOfRange { index, len })?;
        if step.state != StepState::AwaitingAcknowledgment {
            return Err(PipelineError::NotAwaitingAcknowledgment {
                index,
                state: step.state,
            });
        }

        step.ledger.acknowledge_all();
        let state = step.reevaluate();
        tracing::info!(project_id = %project.id, step_index = index, state = %state, "Step acknowledged");

        let step_name = step.executor_name.clone();
        self.events.emit_lossy(PipelineEvent::StepFinished {
            project_id: project.id,
            step_index: index,
            step_name,
            state,
            timestamp: Utc::now(),
        });
        Ok(state)
    }

    /// Send step `index` and every later step back to `Pending`
    pub fn reset_from(&self, project: &mut Project, index: usize) -> Result<(), PipelineError> {
        let len = project.steps.len();
        if index >= len {
            return Err(PipelineError::StepOutOfRange { index, len });
        }
        for step in &mut project.steps[index..] {
            step.reset();
        }
        tracing::info!(project_id = %project.id, from_step = index, "Steps reset to pending");
        Ok(())
    }

    async fn execute_step(&self, project: &mut Project, index: usize) -> Result<StepState, PipelineError> {
        let project_id = project.id;
        let step_name = project.steps[index].executor_name.clone();
        let kwargs = project.steps[index].executor_kwargs.clone();
        let work_area = self.work_area(project, index)?;
        let prev_work_area = match index {
            0 => None,
            _ => Some(self.work_area(project, index - 1)?),
        };
        let prev_metadata: Option<MusicMetadata> = match index {
            0 => None,
            _ => project.steps[index - 1].metadata.clone(),
        };

        {
            let step = &mut project.steps[index];
            step.reset();
            step.state = StepState::Running;
            step.started_at = Some(Utc::now());
        }
        tracing::info!(project_id = %project_id, step_index = index, step = %step_name, "Step started");
        self.events.emit_lossy(PipelineEvent::StepStarted {
            project_id,
            step_index: index,
            step_name: step_name.clone(),
            timestamp: Utc::now(),
        });

        let mut ctx = StepContext::new(project_id, index, step_name.clone(), work_area, prev_work_area)
            .with_source(project.source_torrent.clone())
            .with_metadata(prev_metadata);

        let result = match ctx.work_area().prepare() {
            Err(e) => Err(StepFailure {
                operation: PREPARE_OPERATION.to_string(),
                message: e.to_string(),
            }),
            Ok(()) => match self.registry.create(&step_name, &kwargs, &self.services)? {
                Err(e) => Err(StepFailure {
                    operation: CONFIGURE_OPERATION.to_string(),
                    message: e.to_string(),
                }),
                Ok(mut executor) => {
                    tracing::debug!(step = %step_name, description = %executor.description(), "Executor built");
                    executor.run(&mut ctx).await.map_err(|e| StepFailure {
                        operation: ctx.current_operation().to_string(),
                        message: e.to_string(),
                    })
                }
            },
        };

        let (metadata, ledger) = ctx.into_parts();
        for warning in ledger.warnings() {
            self.events.emit_lossy(PipelineEvent::StepWarning {
                project_id,
                step_index: index,
                message: warning.message.clone(),
                acknowledged: warning.acknowledged,
                timestamp: Utc::now(),
            });
        }

        let step = &mut project.steps[index];
        step.finished_at = Some(Utc::now());
        match result {
            Ok(()) => {
                step.state = if ledger.has_unacknowledged_warnings() {
                    StepState::AwaitingAcknowledgment
                } else {
                    StepState::Succeeded
                };
                step.metadata = metadata;
                tracing::info!(
                    project_id = %project_id,
                    step_index = index,
                    step = %step_name,
                    state = %step.state,
                    warnings = ledger.len(),
                    "Step finished"
                );
            }
            Err(failure) => {
                tracing::error!(
                    project_id = %project_id,
                    step_index = index,
                    step = %step_name,
                    operation = %failure.operation,
                    error = %failure.message,
                    "Step failed"
                );
                step.state = StepState::Failed;
                step.failure = Some(failure);
            }
        }
        step.ledger = ledger;

        let state = step.state;
        self.events.emit_lossy(PipelineEvent::StepFinished {
            project_id,
            step_index: index,
            step_name,
            state,
            timestamp: Utc::now(),
        });
        Ok(state)
    }

    fn emit_halt(&self, project: &Project, index: usize, reason: HaltReason) {
        tracing::warn!(project_id = %project.id, step_index = index, ?reason, "Pipeline halted");
        self.events.emit_lossy(PipelineEvent::PipelineHalted {
            project_id: project.id,
            step_index: index,
            reason,
            timestamp: Utc::now(),
        });
    }
}
