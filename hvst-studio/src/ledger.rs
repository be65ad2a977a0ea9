//! Warning ledger
//!
//! Per-step collection of non-fatal findings. Warnings accumulate across
//! every operation of a step and are never cleared mid-step. A step cannot
//! succeed while any warning is unacknowledged. Self-acknowledged warnings
//! are informational and never block.

use serde::{Deserialize, Serialize};

/// Non-fatal finding recorded by a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub message: String,
    #[serde(default)]
    pub acknowledged: bool,
}

impl Warning {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            acknowledged: false,
        }
    }

    /// Warning that is acknowledged by the rule that emits it
    pub fn acknowledged(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            acknowledged: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningLedger {
    warnings: Vec<Warning>,
}

impl WarningLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(warning = %message, "Step warning");
        self.warnings.push(Warning::new(message));
    }

    pub fn add_acknowledged_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(warning = %message, "Step warning (self-acknowledged)");
        self.warnings.push(Warning::acknowledged(message));
    }

    pub fn has_unacknowledged_warnings(&self) -> bool {
        self.warnings.iter().any(|w| !w.acknowledged)
    }

    pub fn unacknowledged(&self) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(|w| !w.acknowledged)
    }

    /// External acknowledgment of every warning
    pub fn acknowledge_all(&mut self) {
        for warning in &mut self.warnings {
            warning.acknowledged = true;
        }
    }

    /// External acknowledgment of a single warning. Returns false for a bad index.
    pub fn acknowledge(&mut self, index: usize) -> bool {
        match self.warnings.get_mut(index) {
            Some(warning) => {
                warning.acknowledged = true;
                true
            }
            None => false,
        }
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ledger_does_not_block() {
        let ledger = WarningLedger::new();
        assert!(!ledger.has_unacknowledged_warnings());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_unacknowledged_warning_blocks() {
        let mut ledger = WarningLedger::new();
        ledger.add_warning("Edition year is empty");
        assert!(ledger.has_unacknowledged_warnings());
        assert_eq!(ledger.unacknowledged().count(), 1);
    }

    #[test]
    fn test_self_acknowledged_warning_never_blocks() {
        let mut ledger = WarningLedger::new();
        ledger.add_acknowledged_warning("Possible duplicate release");
        assert!(!ledger.has_unacknowledged_warnings());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_acknowledge_all_clears_blocking() {
        let mut ledger = WarningLedger::new();
        ledger.add_warning("first");
        ledger.add_warning("second");
        ledger.acknowledge_all();
        assert!(!ledger.has_unacknowledged_warnings());
        // Warnings are kept, only their status changes
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_acknowledge_single() {
        let mut ledger = WarningLedger::new();
        ledger.add_warning("first");
        ledger.add_warning("second");

        assert!(ledger.acknowledge(0));
        assert!(ledger.has_unacknowledged_warnings());
        assert!(ledger.acknowledge(1));
        assert!(!ledger.has_unacknowledged_warnings());
        assert!(!ledger.acknowledge(5));
    }
}
