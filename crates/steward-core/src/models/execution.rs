//! Applied response plans and per-task progression.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{field_bool, field_items, field_string, field_string_or_empty};
use crate::mapping;
use crate::paths::decode_api_string;

/// A response plan instance attached to an investigation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedPlan {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source_template_id: String,
    #[serde(default)]
    pub phases: Vec<AppliedPhase>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedPhase {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<AppliedTask>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedTask {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub is_note_required: bool,
    #[serde(default)]
    pub status: String,
}

impl AppliedTask {
    fn from_api(obj: &Value) -> Self {
        let status = field_string_or_empty(obj, "status");
        let mapped = mapping::task_status_from_api(&status);
        let status = if mapped == status {
            status.to_lowercase()
        } else {
            mapped.to_string()
        };
        AppliedTask {
            id: field_string_or_empty(obj, "id"),
            name: decode_api_string(&field_string_or_empty(obj, "name")),
            description: decode_api_string(&field_string_or_empty(obj, "description")),
            owner: field_string(obj, "owner").unwrap_or_else(|| "unassigned".to_string()),
            is_note_required: field_bool(obj, "is_note_required").unwrap_or(false),
            status,
        }
    }
}

impl AppliedPlan {
    /// Normalizes an applied-plan object from the incident detail API.
    /// Name/description strings arrive percent-encoded; the template id is
    /// reported as `template_id` on reads but `source_template_id` right
    /// after applying.
    pub fn from_api(obj: &Value) -> Self {
        let source_template_id = field_string(obj, "source_template_id")
            .or_else(|| field_string(obj, "template_id"))
            .unwrap_or_default();
        AppliedPlan {
            id: field_string_or_empty(obj, "id"),
            name: decode_api_string(&field_string_or_empty(obj, "name")),
            description: decode_api_string(&field_string_or_empty(obj, "description")),
            source_template_id,
            phases: field_items(obj, "phases")
                .into_iter()
                .map(|phase| AppliedPhase {
                    id: field_string_or_empty(phase, "id"),
                    name: decode_api_string(&field_string_or_empty(phase, "name")),
                    tasks: field_items(phase, "tasks")
                        .into_iter()
                        .map(AppliedTask::from_api)
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn phase_by_name(&self, name: &str) -> Option<&AppliedPhase> {
        self.phases.iter().find(|p| p.name == name)
    }
}

impl AppliedPhase {
    pub fn task_by_name(&self, name: &str) -> Option<&AppliedTask> {
        self.tasks.iter().find(|t| t.name == name)
    }
}

/// Desired progression of one task inside an applied plan, addressed by
/// phase and task name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub phase_name: String,
    pub task_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// Per-task result record. A lookup miss produces an `error` entry instead
/// of failing the whole operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskOutcome {
    pub phase_name: String,
    pub task_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub changed: bool,
}

impl TaskOutcome {
    pub fn lookup_error(request: &TaskRequest, error: impl Into<String>) -> Self {
        TaskOutcome {
            phase_name: request.phase_name.clone(),
            task_name: request.task_name.clone(),
            error: Some(error.into()),
            changed: false,
            ..TaskOutcome::default()
        }
    }

    pub fn settled(request: &TaskRequest, status: String, owner: String, changed: bool) -> Self {
        TaskOutcome {
            phase_name: request.phase_name.clone(),
            task_name: request.task_name.clone(),
            status: Some(status),
            owner: Some(owner),
            error: None,
            changed,
        }
    }
}

/// Whether a response plan is applied to an investigation, and through
/// which template. Used as the before/after shape for apply and remove.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplicationState {
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_plan_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_plan_id: Option<String>,
}
