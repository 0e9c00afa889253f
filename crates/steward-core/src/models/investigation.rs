//! Investigation (case) records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::field_string;
use crate::mapping;

/// Fields an investigation update may carry. The name is immutable after
/// creation and `finding_ids` go through their own endpoint.
pub const UPDATABLE_FIELDS: &[&str] = &[
    "description",
    "status",
    "disposition",
    "owner",
    "urgency",
    "sensitivity",
    "investigation_type",
];

/// A Splunk ES investigation in steward vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Investigation {
    /// Server-assigned GUID; present once the investigation exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disposition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub investigation_type: Option<String>,
    /// Findings aggregated into this investigation. Updates are
    /// additive-only: ids already on the server are never removed here.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finding_ids: Vec<String>,
}

/// Translates an API enum value, falling back to lowercasing unknown
/// strings so hand-entered server values still compare cleanly.
fn enum_from_api(raw: String, table: fn(&str) -> &str) -> String {
    let mapped = table(&raw);
    if mapped == raw {
        raw.to_lowercase()
    } else {
        mapped.to_string()
    }
}

impl Investigation {
    /// Normalizes a raw investigations-API object. Finding ids arrive under
    /// `consolidated_findings.event_id`, as either a scalar or a list.
    pub fn from_api(obj: &Value) -> Self {
        let finding_ids = obj
            .get("consolidated_findings")
            .map(|cf| match cf.get("event_id") {
                Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
                _ => Vec::new(),
            })
            .unwrap_or_default();

        Investigation {
            ref_id: field_string(obj, "investigation_guid"),
            name: field_string(obj, "name"),
            description: field_string(obj, "description"),
            status: field_string(obj, "status")
                .map(|s| enum_from_api(s, mapping::status_from_api)),
            disposition: field_string(obj, "disposition")
                .map(|s| enum_from_api(s, mapping::disposition_from_api)),
            owner: field_string(obj, "owner"),
            urgency: field_string(obj, "urgency"),
            sensitivity: field_string(obj, "sensitivity")
                .map(|s| enum_from_api(s, mapping::sensitivity_from_api)),
            investigation_type: field_string(obj, "investigation_type"),
            finding_ids,
        }
    }

    /// Builds the JSON body for the create endpoint.
    pub fn create_payload(&self) -> Value {
        let mut body = Map::new();
        let mut put = |key: &str, value: Option<String>| {
            if let Some(v) = value {
                body.insert(key.to_string(), Value::from(v));
            }
        };
        put("name", self.name.clone());
        put("description", self.description.clone());
        put(
            "status",
            self.status
                .as_deref()
                .map(|s| mapping::status_to_api(s).to_string()),
        );
        put(
            "disposition",
            self.disposition
                .as_deref()
                .map(|s| mapping::disposition_to_api(&s.to_lowercase()).to_string()),
        );
        put("owner", self.owner.clone());
        put("urgency", self.urgency.clone());
        put(
            "sensitivity",
            self.sensitivity
                .as_deref()
                .map(|s| mapping::sensitivity_to_api(&s.to_lowercase()).to_string()),
        );
        put("investigation_type", self.investigation_type.clone());
        if !self.finding_ids.is_empty() {
            body.insert(
                "finding_ids".to_string(),
                Value::from(self.finding_ids.clone()),
            );
        }
        Value::Object(body)
    }

    /// Extracts the updatable portion of this investigation.
    pub fn patch(&self) -> InvestigationPatch {
        InvestigationPatch {
            description: self.description.clone(),
            status: self.status.clone(),
            disposition: self.disposition.clone(),
            owner: self.owner.clone(),
            urgency: self.urgency.clone(),
            sensitivity: self.sensitivity.clone(),
            investigation_type: self.investigation_type.clone(),
        }
    }
}

/// The updatable slice of an investigation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvestigationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disposition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub investigation_type: Option<String>,
}

impl InvestigationPatch {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.status.is_none()
            && self.disposition.is_none()
            && self.owner.is_none()
            && self.urgency.is_none()
            && self.sensitivity.is_none()
            && self.investigation_type.is_none()
    }

    /// Keeps only the fields that differ from the existing investigation.
    pub fn diff(&self, existing: &Investigation) -> InvestigationPatch {
        fn keep(desired: &Option<String>, current: &Option<String>) -> Option<String> {
            match desired {
                Some(d) if current.as_deref() != Some(d.as_str()) => Some(d.clone()),
                _ => None,
            }
        }
        InvestigationPatch {
            description: keep(&self.description, &existing.description),
            status: keep(&self.status, &existing.status),
            disposition: keep(&self.disposition, &existing.disposition),
            owner: keep(&self.owner, &existing.owner),
            urgency: keep(&self.urgency, &existing.urgency),
            sensitivity: keep(&self.sensitivity, &existing.sensitivity),
            investigation_type: keep(&self.investigation_type, &existing.investigation_type),
        }
    }

    /// Builds the JSON body for the update endpoint.
    pub fn update_payload(&self) -> Value {
        let mut body = Map::new();
        let mut put = |key: &str, value: Option<String>| {
            if let Some(v) = value {
                body.insert(key.to_string(), Value::from(v));
            }
        };
        put("description", self.description.clone());
        put(
            "status",
            self.status
                .as_deref()
                .map(|s| mapping::status_to_api(s).to_string()),
        );
        put(
            "disposition",
            self.disposition
                .as_deref()
                .map(|s| mapping::disposition_to_api(&s.to_lowercase()).to_string()),
        );
        put("owner", self.owner.clone());
        put("urgency", self.urgency.clone());
        put(
            "sensitivity",
            self.sensitivity
                .as_deref()
                .map(|s| mapping::sensitivity_to_api(&s.to_lowercase()).to_string()),
        );
        put("investigation_type", self.investigation_type.clone());
        Value::Object(body)
    }

    /// Projects the post-update state over an existing investigation.
    pub fn apply_to(&self, existing: &Investigation) -> Investigation {
        let mut after = existing.clone();
        macro_rules! merge {
            ($field:ident) => {
                if let Some(v) = &self.$field {
                    after.$field = Some(v.clone());
                }
            };
        }
        merge!(description);
        merge!(status);
        merge!(disposition);
        merge!(owner);
        merge!(urgency);
        merge!(sensitivity);
        merge!(investigation_type);
        after
    }
}
