//! Investigation type records.
//!
//! Investigation types have no server id of their own; the name is the
//! lookup key. Associated response plan ids are compared as sets since the
//! server does not preserve ordering.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{field_string, field_string_or_empty};

/// A Splunk ES investigation type in steward vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvestigationType {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub response_plan_ids: Vec<String>,
}

impl InvestigationType {
    /// Normalizes a raw incident-types API object.
    pub fn from_api(obj: &Value) -> Self {
        let response_plan_ids = obj
            .get("response_template_ids")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        InvestigationType {
            name: field_string_or_empty(obj, "incident_type"),
            description: field_string_or_empty(obj, "description"),
            response_plan_ids,
        }
    }

    /// True when the raw API object describes an existing type.
    pub fn exists_in(obj: &Value) -> bool {
        field_string(obj, "incident_type").is_some()
    }

    /// Create payload: the association list is not accepted at creation
    /// time and goes through a follow-up update instead.
    pub fn create_payload(&self) -> Value {
        json!({
            "incident_type": self.name,
            "description": self.description,
        })
    }

    /// Full update payload, including the response plan associations. An
    /// empty list clears them.
    pub fn update_payload(&self) -> Value {
        json!({
            "incident_type": self.name,
            "description": self.description,
            "response_template_ids": self.response_plan_ids,
        })
    }

    /// Order-insensitive comparison of response plan associations.
    pub fn same_plan_ids(&self, other: &InvestigationType) -> bool {
        let mut a = self.response_plan_ids.clone();
        let mut b = other.response_plan_ids.clone();
        a.sort();
        b.sort();
        a == b
    }
}

/// Desired state for an investigation type. `None` fields keep whatever the
/// server already has; an explicit empty association list clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvestigationTypeSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_plan_ids: Option<Vec<String>>,
}

impl InvestigationTypeSpec {
    /// Resolves this spec against the existing record (or nothing, for a
    /// create) into a concrete target state.
    pub fn resolve(&self, existing: Option<&InvestigationType>) -> InvestigationType {
        InvestigationType {
            name: self.name.clone(),
            description: self
                .description
                .clone()
                .or_else(|| existing.map(|e| e.description.clone()))
                .unwrap_or_default(),
            response_plan_ids: self
                .response_plan_ids
                .clone()
                .or_else(|| existing.map(|e| e.response_plan_ids.clone()))
                .unwrap_or_default(),
        }
    }
}
