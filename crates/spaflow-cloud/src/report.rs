//! Record of what a deploy run changed

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a reconciliation step did to its resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Create,
    Update,
    Delete,
    NoOp,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// One reconciled resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Resource type (e.g., "hosted-zone", "certificate", "distribution")
    pub resource_type: String,

    /// Resource identifier (ARN, id or name)
    pub resource_id: String,

    pub action_type: ActionType,

    pub description: String,
}

/// Ordered outcomes of a deploy run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployReport {
    pub steps: Vec<StepOutcome>,
}

impl DeployReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        action_type: ActionType,
        description: impl Into<String>,
    ) {
        self.steps.push(StepOutcome {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            action_type,
            description: description.into(),
        });
    }

    pub fn has_changes(&self) -> bool {
        self.steps.iter().any(|s| s.action_type != ActionType::NoOp)
    }

    /// Steps of the given type, in execution order
    pub fn steps_by_type(&self, action_type: ActionType) -> Vec<&StepOutcome> {
        self.steps
            .iter()
            .filter(|s| s.action_type == action_type)
            .collect()
    }

    pub fn find(&self, resource_type: &str) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.resource_type == resource_type)
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            create: self.steps_by_type(ActionType::Create).len(),
            update: self.steps_by_type(ActionType::Update).len(),
            delete: self.steps_by_type(ActionType::Delete).len(),
            no_change: self.steps_by_type(ActionType::NoOp).len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} deleted, {} unchanged",
            self.create, self.update, self.delete, self.no_change
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_by_type() {
        let mut report = DeployReport::new();
        assert!(!report.has_changes());

        report.record("hosted-zone", "Z1", ActionType::NoOp, "found");
        report.record("certificate", "arn:acm", ActionType::Create, "requested");
        report.record("distribution", "E1", ActionType::Update, "config changed");
        report.record("origin-access-control", "O1", ActionType::Delete, "cleanup");
        report.record("bucket", "example.com", ActionType::NoOp, "exists");

        assert!(report.has_changes());
        let summary = report.summary();
        assert_eq!(
            summary,
            ReportSummary {
                create: 1,
                update: 1,
                delete: 1,
                no_change: 2
            }
        );
        assert_eq!(
            summary.to_string(),
            "1 created, 1 updated, 1 deleted, 2 unchanged"
        );
        assert_eq!(
            report.find("distribution").map(|s| s.action_type),
            Some(ActionType::Update)
        );
    }
}
