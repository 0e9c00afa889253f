//! Finding (notable event) records.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{field_int_lossy, field_string};
use crate::error::{Result, SplunkError};
use crate::mapping;

/// Fields a finding update may carry; anything else is read-only after
/// creation and silently dropped from update requests.
pub const UPDATABLE_FIELDS: &[&str] = &["owner", "status", "urgency", "disposition"];

/// A custom field attached to a finding at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub name: String,
    pub value: String,
}

/// A Splunk ES finding in steward vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Composite reference id (`{uuid}@@notable@@time{epoch}`); present once
    /// the finding exists on the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finding_score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disposition: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<CustomField>,
}

impl Finding {
    /// Normalizes a raw findings-API object into steward vocabulary:
    /// renames the API keys, translates enum codes, and truncates the
    /// string-typed score the API returns (e.g. `"50.0"`).
    pub fn from_api(obj: &Value) -> Self {
        Finding {
            ref_id: field_string(obj, "finding_id"),
            title: field_string(obj, "rule_title"),
            description: field_string(obj, "rule_description"),
            security_domain: field_string(obj, "security_domain"),
            entity: field_string(obj, "risk_object"),
            entity_type: field_string(obj, "risk_object_type"),
            finding_score: field_int_lossy(obj, "risk_score"),
            owner: field_string(obj, "owner"),
            status: field_string(obj, "status").map(|s| mapping::status_from_api(&s).to_string()),
            urgency: field_string(obj, "urgency"),
            disposition: field_string(obj, "disposition")
                .map(|s| mapping::disposition_from_api(&s).to_string()),
            fields: Vec::new(),
        }
    }

    /// Validates the fields required to create a new finding.
    pub fn validate_create(&self) -> Result<()> {
        if self.title.is_none() {
            return Err(SplunkError::Validation(
                "missing required parameter: title".to_string(),
            ));
        }
        let required: [(&str, bool); 5] = [
            ("description", self.description.is_some()),
            ("security_domain", self.security_domain.is_some()),
            ("entity", self.entity.is_some()),
            ("entity_type", self.entity_type.is_some()),
            ("finding_score", self.finding_score.is_some()),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, present)| !present)
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(SplunkError::Validation(format!(
                "missing required parameters for creating finding: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    /// Builds the JSON body for the create endpoint: API key names, API enum
    /// codes, fixed app/creator attribution, and custom fields flattened
    /// into the top level.
    pub fn create_payload(&self) -> Value {
        let mut body = Map::new();
        let mut put = |key: &str, value: Option<Value>| {
            if let Some(v) = value {
                body.insert(key.to_string(), v);
            }
        };
        put("rule_title", self.title.clone().map(Value::from));
        put("rule_description", self.description.clone().map(Value::from));
        put(
            "security_domain",
            self.security_domain.clone().map(Value::from),
        );
        put("risk_object", self.entity.clone().map(Value::from));
        put("risk_object_type", self.entity_type.clone().map(Value::from));
        put("risk_score", self.finding_score.map(Value::from));
        put("owner", self.owner.clone().map(Value::from));
        put(
            "status",
            self.status
                .as_deref()
                .map(|s| Value::from(mapping::status_to_api(s))),
        );
        put("urgency", self.urgency.clone().map(Value::from));
        put(
            "disposition",
            self.disposition
                .as_deref()
                .map(|s| Value::from(mapping::disposition_to_api(s))),
        );
        body.insert("app".to_string(), json!(crate::paths::SECURITY_SUITE_APP));
        body.insert("creator".to_string(), json!("admin"));
        for field in &self.fields {
            body.insert(field.name.clone(), Value::from(field.value.clone()));
        }
        Value::Object(body)
    }

    /// Extracts the updatable portion of this finding.
    pub fn patch(&self) -> FindingPatch {
        FindingPatch {
            owner: self.owner.clone(),
            status: self.status.clone(),
            urgency: self.urgency.clone(),
            disposition: self.disposition.clone(),
        }
    }

    /// True when any non-updatable field is set alongside a patch; those are
    /// dropped from updates rather than rejected.
    pub fn has_read_only_fields(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.security_domain.is_some()
            || self.entity.is_some()
            || self.entity_type.is_some()
            || self.finding_score.is_some()
            || !self.fields.is_empty()
    }
}

/// The updatable slice of a finding, used for diffing and update payloads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disposition: Option<String>,
}

impl FindingPatch {
    pub fn is_empty(&self) -> bool {
        self.owner.is_none()
            && self.status.is_none()
            && self.urgency.is_none()
            && self.disposition.is_none()
    }

    /// Keeps only the fields that differ from the existing finding.
    pub fn diff(&self, existing: &Finding) -> FindingPatch {
        fn keep(desired: &Option<String>, current: &Option<String>) -> Option<String> {
            match desired {
                Some(d) if current.as_deref() != Some(d.as_str()) => Some(d.clone()),
                _ => None,
            }
        }
        FindingPatch {
            owner: keep(&self.owner, &existing.owner),
            status: keep(&self.status, &existing.status),
            urgency: keep(&self.urgency, &existing.urgency),
            disposition: keep(&self.disposition, &existing.disposition),
        }
    }

    /// Builds the JSON body for the update endpoint, which uses different
    /// key names than the create endpoint (`owner` becomes `assignee`).
    pub fn update_payload(&self) -> Value {
        let mut body = Map::new();
        if let Some(owner) = &self.owner {
            body.insert("assignee".to_string(), Value::from(owner.clone()));
        }
        if let Some(status) = &self.status {
            body.insert(
                "status".to_string(),
                Value::from(mapping::status_to_api(status)),
            );
        }
        if let Some(urgency) = &self.urgency {
            body.insert("urgency".to_string(), Value::from(urgency.clone()));
        }
        if let Some(disposition) = &self.disposition {
            body.insert(
                "disposition".to_string(),
                Value::from(mapping::disposition_to_api(disposition)),
            );
        }
        Value::Object(body)
    }

    /// Projects the post-update state by merging this patch over an
    /// existing finding.
    pub fn apply_to(&self, existing: &Finding) -> Finding {
        let mut after = existing.clone();
        if let Some(owner) = &self.owner {
            after.owner = Some(owner.clone());
        }
        if let Some(status) = &self.status {
            after.status = Some(status.clone());
        }
        if let Some(urgency) = &self.urgency {
            after.urgency = Some(urgency.clone());
        }
        if let Some(disposition) = &self.disposition {
            after.disposition = Some(disposition.clone());
        }
        after
    }
}
