//! Event types for the Harvest pipeline event system
//!
//! The pipeline runner emits a [`PipelineEvent`] for every step lifecycle
//! change. Whoever started a run (API layer, CLI, tests) subscribes to the
//! [`EventBus`] to learn when the pipeline halts or completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Step lifecycle state
///
/// `Pending → Running → {Succeeded, AwaitingAcknowledgment, Failed}`.
/// `AwaitingAcknowledgment` moves to `Succeeded` only through an external
/// acknowledgment; re-entering a step always goes back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    Running,
    Succeeded,
    AwaitingAcknowledgment,
    Failed,
}

impl StepState {
    /// True for the three states a run ends in
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepState::Succeeded | StepState::AwaitingAcknowledgment | StepState::Failed
        )
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepState::Pending => "pending",
            StepState::Running => "running",
            StepState::Succeeded => "succeeded",
            StepState::AwaitingAcknowledgment => "awaiting_acknowledgment",
            StepState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Why a pipeline stopped advancing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HaltReason {
    /// Step finished with unacknowledged warnings
    AwaitingAcknowledgment { warnings: Vec<String> },
    /// Step failed with a fatal error
    Failed { operation: String, message: String },
}

/// Pipeline event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// Step moved to `Running`
    StepStarted {
        project_id: Uuid,
        step_index: usize,
        step_name: String,
        timestamp: DateTime<Utc>,
    },

    /// Step recorded a warning
    StepWarning {
        project_id: Uuid,
        step_index: usize,
        message: String,
        acknowledged: bool,
        timestamp: DateTime<Utc>,
    },

    /// Step reached a terminal state (or was re-evaluated after acknowledgment)
    StepFinished {
        project_id: Uuid,
        step_index: usize,
        step_name: String,
        state: StepState,
        timestamp: DateTime<Utc>,
    },

    /// Pipeline stopped before the last step succeeded
    PipelineHalted {
        project_id: Uuid,
        step_index: usize,
        reason: HaltReason,
        timestamp: DateTime<Utc>,
    },

    /// Last step succeeded
    PipelineCompleted {
        project_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    pub fn project_id(&self) -> Uuid {
        match self {
            PipelineEvent::StepStarted { project_id, .. }
            | PipelineEvent::StepWarning { project_id, .. }
            | PipelineEvent::StepFinished { project_id, .. }
            | PipelineEvent::PipelineHalted { project_id, .. }
            | PipelineEvent::PipelineCompleted { project_id, .. } => *project_id,
        }
    }
}

/// Broadcast bus for pipeline events
///
/// Cloning shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before slow receivers lag
    ///
    /// # Examples
    ///
    /// ```
    /// use hvst_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PipelineEvent,
    ) -> Result<usize, broadcast::error::SendError<PipelineEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!StepState::Pending.is_terminal());
        assert!(!StepState::Running.is_terminal());
        assert!(StepState::Succeeded.is_terminal());
        assert!(StepState::AwaitingAcknowledgment.is_terminal());
        assert!(StepState::Failed.is_terminal());
    }

    #[test]
    fn test_step_state_serializes_snake_case() {
        let json = serde_json::to_string(&StepState::AwaitingAcknowledgment).unwrap();
        assert_eq!(json, "\"awaiting_acknowledgment\"");
        assert_eq!(StepState::AwaitingAcknowledgment.to_string(), "awaiting_acknowledgment");
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        let project_id = Uuid::new_v4();

        bus.emit(PipelineEvent::PipelineCompleted {
            project_id,
            timestamp: Utc::now(),
        })
        .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.project_id(), project_id);
        assert!(matches!(event, PipelineEvent::PipelineCompleted { .. }));
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(10);
        let event = PipelineEvent::PipelineCompleted {
            project_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        };
        assert!(bus.emit(event.clone()).is_err());
        // Lossy emission never fails
        bus.emit_lossy(event);
    }
}
