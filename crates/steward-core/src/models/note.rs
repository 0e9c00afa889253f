//! Notes and their attachment targets.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::field_string;
use crate::paths::ApiContext;
use crate::refid;

/// Where a note is attached. The three contexts are mutually exclusive and
/// each carries exactly the identifiers its API path needs, so an
/// under-specified target cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target_type", rename_all = "snake_case")]
pub enum NoteTarget {
    Finding {
        finding_ref_id: String,
    },
    Investigation {
        investigation_ref_id: String,
    },
    ResponsePlanTask {
        investigation_ref_id: String,
        response_plan_id: String,
        phase_id: String,
        task_id: String,
    },
}

impl NoteTarget {
    /// Path of the notes collection for this target.
    pub fn notes_path(&self, ctx: &ApiContext) -> String {
        match self {
            NoteTarget::Finding { finding_ref_id } => ctx.notes(finding_ref_id),
            NoteTarget::Investigation {
                investigation_ref_id,
            } => ctx.notes(investigation_ref_id),
            NoteTarget::ResponsePlanTask {
                investigation_ref_id,
                response_plan_id,
                phase_id,
                task_id,
            } => ctx.task_notes(investigation_ref_id, response_plan_id, phase_id, task_id),
        }
    }

    /// Path of a single note for this target.
    pub fn note_path(&self, ctx: &ApiContext, note_id: &str) -> String {
        match self {
            NoteTarget::Finding { finding_ref_id } => ctx.note(finding_ref_id, note_id),
            NoteTarget::Investigation {
                investigation_ref_id,
            } => ctx.note(investigation_ref_id, note_id),
            NoteTarget::ResponsePlanTask {
                investigation_ref_id,
                response_plan_id,
                phase_id,
                task_id,
            } => ctx.task_note(
                investigation_ref_id,
                response_plan_id,
                phase_id,
                task_id,
                note_id,
            ),
        }
    }

    /// Query parameters this target requires. Finding targets carry the
    /// notable-event epoch extracted from the reference id.
    pub fn query_params(&self) -> Vec<(String, String)> {
        match self {
            NoteTarget::Finding { finding_ref_id } => refid::notable_time(finding_ref_id)
                .map(|t| vec![("notable_time".to_string(), t.to_string())])
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Whether the API supports fetching one note of this target directly,
    /// rather than listing and filtering.
    pub fn supports_direct_get(&self) -> bool {
        matches!(self, NoteTarget::ResponsePlanTask { .. })
    }
}

/// A note in steward vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
}

impl Note {
    /// Normalizes a raw notes-API object. `create_time` arrives as either
    /// an epoch number or an RFC 3339 string depending on the endpoint.
    pub fn from_api(obj: &Value) -> Self {
        let create_time = match obj.get("create_time") {
            Some(Value::Number(n)) => n.as_i64().and_then(|t| Utc.timestamp_opt(t, 0).single()),
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok(),
            _ => None,
        };
        Note {
            note_id: field_string(obj, "id"),
            content: field_string(obj, "content").unwrap_or_default(),
            create_time,
        }
    }

    /// JSON body for create and update calls.
    pub fn payload(&self) -> Value {
        json!({ "content": self.content })
    }

    /// Notes are considered equal when their content matches; ids and
    /// timestamps are server-assigned.
    pub fn same_content(&self, other: &Note) -> bool {
        self.content == other.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_finding_target_paths_and_params() {
        let ctx = ApiContext::default();
        let target = NoteTarget::Finding {
            finding_ref_id: "abc@@notable@@time1768225865".to_string(),
        };
        assert!(target
            .notes_path(&ctx)
            .ends_with("investigations/abc%40%40notable%40%40time1768225865/notes"));
        assert_eq!(
            target.query_params(),
            vec![("notable_time".to_string(), "1768225865".to_string())]
        );
    }

    #[test]
    fn test_malformed_ref_id_adds_no_params() {
        let target = NoteTarget::Finding {
            finding_ref_id: "abc@@notable@@later".to_string(),
        };
        assert!(target.query_params().is_empty());
    }

    #[test]
    fn test_task_target_supports_direct_get() {
        let target = NoteTarget::ResponsePlanTask {
            investigation_ref_id: "inv".into(),
            response_plan_id: "plan".into(),
            phase_id: "phase".into(),
            task_id: "task".into(),
        };
        assert!(target.supports_direct_get());
        let ctx = ApiContext::default();
        assert!(target
            .note_path(&ctx, "n1")
            .ends_with("responseplans/plan/phase/phase/tasks/task/notes/n1"));
    }

    #[test]
    fn test_note_from_api_epoch_time() {
        let note = Note::from_api(&json!({
            "id": "n1",
            "content": "triage done",
            "create_time": 1768225865
        }));
        assert_eq!(note.note_id.as_deref(), Some("n1"));
        assert!(note.create_time.is_some());
    }

    #[test]
    fn test_same_content_ignores_id() {
        let a = Note {
            note_id: Some("n1".into()),
            content: "x".into(),
            create_time: None,
        };
        let b = Note {
            note_id: Some("n2".into()),
            content: "x".into(),
            create_time: None,
        };
        assert!(a.same_content(&b));
    }

    #[test]
    fn test_target_serde_tag() {
        let yaml = "target_type: investigation\ninvestigation_ref_id: inv-1\n";
        let target: NoteTarget = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            target,
            NoteTarget::Investigation {
                investigation_ref_id: "inv-1".to_string()
            }
        );
    }
}
