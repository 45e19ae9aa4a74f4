//! Action types for provisioning steps

use crate::sequencer::Phase;
use serde::{Deserialize, Serialize};

/// A single call against the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier for the action (e.g. "create-project:acme-dev")
    pub id: String,

    /// Phase the action belongs to
    pub phase: Phase,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Resource type (e.g. "project", "service-account", "org-policy")
    pub resource_type: String,

    /// Resource identifier
    pub resource_id: String,

    /// Human readable description
    pub description: String,
}

impl Action {
    pub fn new(
        phase: Phase,
        action_type: ActionType,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let resource_type = resource_type.into();
        let resource_id = resource_id.into();
        Self {
            id: format!("{}-{}:{}", action_type, resource_type, resource_id),
            phase,
            action_type,
            resource_type,
            resource_id,
            description: description.into(),
        }
    }
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a resource (checked for existence first)
    Create,
    /// Attach a relationship (billing link)
    Link,
    /// Enable platform APIs
    Enable,
    /// Add an IAM binding
    Grant,
    /// Change a setting on an existing resource
    Configure,
    /// Read a value back from the control plane
    Query,
    /// Wait for propagation
    Wait,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Link => write!(f, "link"),
            ActionType::Enable => write!(f, "enable"),
            ActionType::Grant => write!(f, "grant"),
            ActionType::Configure => write!(f, "configure"),
            ActionType::Query => write!(f, "query"),
            ActionType::Wait => write!(f, "wait"),
        }
    }
}

/// How an action ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum ActionOutcome {
    Done,
    /// Resource already existed
    Skipped(String),
    Failed(String),
}

/// Result of running the sequence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Successfully applied actions
    pub succeeded: Vec<ActionResult>,

    /// Creates skipped because the resource already existed
    pub skipped: Vec<ActionResult>,

    /// Failed actions
    pub failed: Vec<ActionResult>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn record(&mut self, action: Action, outcome: ActionOutcome) {
        let result = ActionResult {
            action,
            outcome: outcome.clone(),
        };
        match outcome {
            ActionOutcome::Done => self.succeeded.push(result),
            ActionOutcome::Skipped(_) => self.skipped.push(result),
            ActionOutcome::Failed(_) => self.failed.push(result),
        }
    }

    /// All actions of a given type, in execution order within each bucket
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.succeeded
            .iter()
            .chain(self.skipped.iter())
            .chain(self.failed.iter())
            .map(|r| &r.action)
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    pub fn summary(&self) -> ApplySummary {
        ApplySummary {
            succeeded: self.succeeded.len(),
            skipped: self.skipped.len(),
            failed: self.failed.len(),
        }
    }
}

/// Result of a single action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub action: Action,
    pub outcome: ActionOutcome,
}

/// Counts per outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplySummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl std::fmt::Display for ApplySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} applied, {} already present, {} failed",
            self.succeeded, self.skipped, self.failed
        )
    }
}
