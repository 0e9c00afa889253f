//! Response plan templates and their reconciliation.
//!
//! A response plan is an ordered tree of phases, tasks, and suggested
//! searches. Updates are full replacements: the payload sent to the server
//! becomes the new total state, so anything absent from the desired tree is
//! implicitly deleted. Phases and tasks already on the server keep their ids
//! when a desired item of the same name exists; everything else gets a fresh
//! UUID. Task matching is scoped to the phase the task was found in, so a
//! task moved between phases is a new task.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{field_bool, field_items, field_string, field_string_or_empty};
use crate::error::{Result, SplunkError};
use crate::paths::decode_api_string;

fn default_owner() -> String {
    "unassigned".to_string()
}

fn default_template_status() -> String {
    "draft".to_string()
}

/// A suggested search attached to a task. Searches carry no server id and
/// are replaced wholesale on every update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Search {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub spl: String,
}

impl Search {
    fn from_api(obj: &Value, decode: bool) -> Self {
        let read = |key: &str| {
            let raw = field_string_or_empty(obj, key);
            if decode {
                decode_api_string(&raw)
            } else {
                raw
            }
        };
        Search {
            name: read("name"),
            description: read("description"),
            spl: read("spl"),
        }
    }
}

/// A task inside a phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_note_required: bool,
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default)]
    pub searches: Vec<Search>,
}

/// A phase inside a response plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// A response plan template in steward vocabulary, without server ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePlan {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_template_status")]
    pub template_status: String,
    #[serde(default)]
    pub phases: Vec<Phase>,
}

fn task_from_api(obj: &Value, decode: bool) -> Task {
    let read = |key: &str| {
        let raw = field_string_or_empty(obj, key);
        if decode {
            decode_api_string(&raw)
        } else {
            raw
        }
    };
    let searches = obj
        .get("suggestions")
        .map(|s| field_items(s, "searches"))
        .unwrap_or_default()
        .into_iter()
        .map(|s| Search::from_api(s, decode))
        .collect();
    Task {
        name: read("name"),
        description: read("description"),
        is_note_required: field_bool(obj, "is_note_required").unwrap_or(false),
        owner: field_string(obj, "owner").unwrap_or_else(default_owner),
        searches,
    }
}

impl ResponsePlan {
    /// Normalizes a raw template object (an API response or an outbound
    /// payload; both use the same wire shape) into steward vocabulary.
    /// Server-assigned ids and ordering metadata are dropped, which makes
    /// this the canonical form for change detection.
    pub fn from_api(obj: &Value) -> Self {
        let phases = field_items(obj, "phases")
            .into_iter()
            .map(|phase| Phase {
                name: field_string_or_empty(phase, "name"),
                tasks: field_items(phase, "tasks")
                    .into_iter()
                    .map(|t| task_from_api(t, false))
                    .collect(),
            })
            .collect();
        ResponsePlan {
            name: field_string_or_empty(obj, "name"),
            description: field_string_or_empty(obj, "description"),
            template_status: field_string(obj, "template_status")
                .unwrap_or_else(default_template_status),
            phases,
        }
    }

    /// Rejects duplicate phase names, and duplicate task names within a
    /// single phase. The same task name may appear in different phases.
    /// All violations are reported at once.
    pub fn validate_unique_names(&self) -> Result<()> {
        let mut errors = Vec::new();
        let mut phase_names = std::collections::HashSet::new();
        for phase in &self.phases {
            if !phase_names.insert(phase.name.as_str()) {
                errors.push(format!(
                    "duplicate phase name '{}' found in response plan",
                    phase.name
                ));
            }
            let mut task_names = std::collections::HashSet::new();
            for task in &phase.tasks {
                if !task_names.insert(task.name.as_str()) {
                    errors.push(format!(
                        "duplicate task name '{}' found in phase '{}'",
                        task.name, phase.name
                    ));
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SplunkError::Validation(errors.join("; ")))
        }
    }
}

/// A response plan as stored on the server, with every id the
/// reconciliation needs for name matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub id: String,
    #[serde(default)]
    pub template_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_template_status")]
    pub template_status: String,
    #[serde(default)]
    pub phases: Vec<PhaseRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_note_required: bool,
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default)]
    pub searches: Vec<Search>,
}

impl PlanRecord {
    /// Normalizes a raw template object, keeping server ids. The read-only
    /// endpoints return percent-encoded name/description/spl strings;
    /// `decode` controls whether those are unescaped for display.
    pub fn from_api(obj: &Value, decode: bool) -> Self {
        let read = |o: &Value, key: &str| {
            let raw = field_string_or_empty(o, key);
            if decode {
                decode_api_string(&raw)
            } else {
                raw
            }
        };
        let phases = field_items(obj, "phases")
            .into_iter()
            .map(|phase| PhaseRecord {
                id: field_string_or_empty(phase, "id"),
                name: read(phase, "name"),
                tasks: field_items(phase, "tasks")
                    .into_iter()
                    .map(|t| {
                        let task = task_from_api(t, decode);
                        TaskRecord {
                            id: field_string_or_empty(t, "id"),
                            name: task.name,
                            description: task.description,
                            is_note_required: task.is_note_required,
                            owner: task.owner,
                            searches: task.searches,
                        }
                    })
                    .collect(),
            })
            .collect();
        PlanRecord {
            id: field_string_or_empty(obj, "id"),
            template_id: field_string_or_empty(obj, "template_id"),
            name: read(obj, "name"),
            description: read(obj, "description"),
            template_status: field_string(obj, "template_status")
                .unwrap_or_else(default_template_status),
            phases,
        }
    }

    fn phase_by_name(&self, name: &str) -> Option<&PhaseRecord> {
        self.phases.iter().find(|p| p.name == name)
    }

    /// Strips server ids, leaving the canonical form used for change
    /// detection and before/after reporting.
    pub fn to_spec(&self) -> ResponsePlan {
        ResponsePlan {
            name: self.name.clone(),
            description: self.description.clone(),
            template_status: self.template_status.clone(),
            phases: self
                .phases
                .iter()
                .map(|phase| Phase {
                    name: phase.name.clone(),
                    tasks: phase
                        .tasks
                        .iter()
                        .map(|task| Task {
                            name: task.name.clone(),
                            description: task.description.clone(),
                            is_note_required: task.is_note_required,
                            owner: task.owner.clone(),
                            searches: task.searches.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

impl PhaseRecord {
    fn task_id_by_name(&self, name: &str) -> Option<&str> {
        self.tasks
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.id.as_str())
    }
}

fn search_payload(search: &Search) -> Value {
    json!({
        "name": search.name,
        "description": search.description,
        "spl": search.spl,
    })
}

fn task_payload(task: &Task, order: usize, existing_id: Option<&str>) -> Value {
    let is_new = existing_id.is_none();
    let id = existing_id
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let searches: Vec<Value> = task.searches.iter().map(search_payload).collect();
    json!({
        "task_id": "",
        "phase_id": "",
        "id": id,
        "name": task.name,
        "description": task.description,
        "sla": null,
        "sla_type": "minutes",
        "order": order,
        "status": "Pending",
        "is_note_required": task.is_note_required,
        "owner": task.owner,
        "isNewTask": is_new,
        "files": [],
        "notes": [],
        "suggestions": {
            "actions": [],
            "playbooks": [],
            "searches": searches,
        },
    })
}

fn phase_payload(phase: &Phase, order: usize, existing: Option<&PhaseRecord>) -> Value {
    let id = existing
        .map(|p| p.id.clone())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let tasks: Vec<Value> = phase
        .tasks
        .iter()
        .enumerate()
        .map(|(idx, task)| {
            let existing_id = existing.and_then(|p| p.task_id_by_name(&task.name));
            task_payload(task, idx + 1, existing_id)
        })
        .collect();
    json!({
        "template_id": "",
        "id": id,
        "name": phase.name,
        "sla": null,
        "sla_type": "minutes",
        "create_time": "",
        "order": order,
        "tasks": tasks,
    })
}

/// Builds the full-replacement payload for creating or updating a plan.
///
/// With no existing record every phase and task gets a fresh UUID. With one,
/// ids are reused for name matches and the record's own id is carried so the
/// server treats the payload as an update of that template.
pub fn build_plan_payload(desired: &ResponsePlan, existing: Option<&PlanRecord>) -> Value {
    let phases: Vec<Value> = desired
        .phases
        .iter()
        .enumerate()
        .map(|(idx, phase)| {
            let existing_phase = existing.and_then(|e| e.phase_by_name(&phase.name));
            phase_payload(phase, idx + 1, existing_phase)
        })
        .collect();
    let mut payload = json!({
        "name": desired.name,
        "description": desired.description,
        "template_status": desired.template_status,
        "incident_types": [],
        "phases": phases,
    });
    if let Some(record) = existing {
        if !record.id.is_empty() {
            payload["id"] = Value::from(record.id.clone());
        }
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(phases: Vec<Phase>) -> ResponsePlan {
        ResponsePlan {
            name: "Incident Response".to_string(),
            description: "Standard procedure".to_string(),
            template_status: "published".to_string(),
            phases,
        }
    }

    fn task(name: &str) -> Task {
        Task {
            name: name.to_string(),
            description: format!("{name} description"),
            is_note_required: false,
            owner: default_owner(),
            searches: Vec::new(),
        }
    }

    fn record_with_phases(names: &[(&str, &[&str])]) -> PlanRecord {
        PlanRecord {
            id: "rp-001".to_string(),
            template_id: String::new(),
            name: "Incident Response".to_string(),
            description: "Standard procedure".to_string(),
            template_status: "published".to_string(),
            phases: names
                .iter()
                .enumerate()
                .map(|(pi, (phase_name, tasks))| PhaseRecord {
                    id: format!("phase-{pi}"),
                    name: phase_name.to_string(),
                    tasks: tasks
                        .iter()
                        .enumerate()
                        .map(|(ti, task_name)| TaskRecord {
                            id: format!("task-{pi}-{ti}"),
                            name: task_name.to_string(),
                            description: String::new(),
                            is_note_required: false,
                            owner: default_owner(),
                            searches: Vec::new(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_duplicate_phase_names_rejected() {
        let p = plan(vec![
            Phase {
                name: "Triage".into(),
                tasks: vec![],
            },
            Phase {
                name: "Triage".into(),
                tasks: vec![],
            },
        ]);
        let err = p.validate_unique_names().unwrap_err();
        assert!(err.to_string().contains("duplicate phase name 'Triage'"));
    }

    #[test]
    fn test_duplicate_task_names_scoped_to_phase() {
        // The same task name in two different phases is allowed.
        let p = plan(vec![
            Phase {
                name: "Triage".into(),
                tasks: vec![task("Review"), task("Review")],
            },
            Phase {
                name: "Containment".into(),
                tasks: vec![task("Review")],
            },
        ]);
        let err = p.validate_unique_names().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("duplicate task name 'Review' found in phase 'Triage'"));
        assert!(!msg.contains("Containment"));

        let ok = plan(vec![
            Phase {
                name: "Triage".into(),
                tasks: vec![task("Review")],
            },
            Phase {
                name: "Containment".into(),
                tasks: vec![task("Review")],
            },
        ]);
        assert!(ok.validate_unique_names().is_ok());
    }

    #[test]
    fn test_create_payload_generates_ids_and_order() {
        let p = plan(vec![
            Phase {
                name: "Triage".into(),
                tasks: vec![task("Review"), task("Escalate")],
            },
            Phase {
                name: "Containment".into(),
                tasks: vec![task("Isolate")],
            },
        ]);
        let payload = build_plan_payload(&p, None);
        assert!(payload.get("id").is_none());
        let phases = payload["phases"].as_array().unwrap();
        assert_eq!(phases[0]["order"], 1);
        assert_eq!(phases[1]["order"], 2);
        let first_task = &phases[0]["tasks"][0];
        assert_eq!(first_task["order"], 1);
        assert_eq!(first_task["isNewTask"], true);
        assert_eq!(first_task["status"], "Pending");
        // Generated ids are well-formed, unique UUIDs.
        let phase_id = phases[0]["id"].as_str().unwrap();
        let task_id = first_task["id"].as_str().unwrap();
        assert!(Uuid::parse_str(phase_id).is_ok());
        assert!(Uuid::parse_str(task_id).is_ok());
        assert_ne!(phase_id, task_id);
    }

    #[test]
    fn test_update_preserves_matched_ids() {
        let existing = record_with_phases(&[
            ("Triage", &["Review", "Escalate"]),
            ("Containment", &["Isolate"]),
        ]);
        let desired = plan(vec![
            Phase {
                name: "Triage".into(),
                tasks: vec![task("Review"), task("Summarize")],
            },
            Phase {
                name: "Recovery".into(),
                tasks: vec![task("Isolate")],
            },
        ]);
        let payload = build_plan_payload(&desired, Some(&existing));
        assert_eq!(payload["id"], "rp-001");

        let phases = payload["phases"].as_array().unwrap();
        // Matched phase keeps its id; unmatched phase gets a fresh UUID.
        assert_eq!(phases[0]["id"], "phase-0");
        assert!(Uuid::parse_str(phases[1]["id"].as_str().unwrap()).is_ok());

        // Task matching is scoped to its phase: "Isolate" exists on the
        // server only inside "Containment", so inside the new "Recovery"
        // phase it is a new task.
        let triage_tasks = phases[0]["tasks"].as_array().unwrap();
        assert_eq!(triage_tasks[0]["id"], "task-0-0");
        assert_eq!(triage_tasks[0]["isNewTask"], false);
        assert_eq!(triage_tasks[1]["isNewTask"], true);
        let recovery_task = &phases[1]["tasks"][0];
        assert_ne!(recovery_task["id"], "task-1-0");
        assert_eq!(recovery_task["isNewTask"], true);
    }

    #[test]
    fn test_update_omits_removed_phases() {
        // Dropping phase C from the desired list removes it from the
        // payload entirely while A and B keep their ids.
        let existing =
            record_with_phases(&[("A", &["t1"]), ("B", &["t2"]), ("C", &["t3"])]);
        let desired = plan(vec![
            Phase {
                name: "A".into(),
                tasks: vec![task("t1")],
            },
            Phase {
                name: "B".into(),
                tasks: vec![task("t2")],
            },
        ]);
        let payload = build_plan_payload(&desired, Some(&existing));
        let phases = payload["phases"].as_array().unwrap();
        assert_eq!(phases.len(), 2);
        assert_eq!(phases[0]["id"], "phase-0");
        assert_eq!(phases[1]["id"], "phase-1");
        let names: Vec<&str> = phases
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert!(!names.contains(&"C"));
    }

    #[test]
    fn test_payload_round_trips_through_normalization() {
        let p = plan(vec![Phase {
            name: "Triage".into(),
            tasks: vec![Task {
                searches: vec![Search {
                    name: "Access Over Time".into(),
                    description: "Check access patterns".into(),
                    spl: "| tstats count from datamodel=Authentication".into(),
                }],
                ..task("Review")
            }],
        }]);
        let payload = build_plan_payload(&p, None);
        assert_eq!(ResponsePlan::from_api(&payload), p);
    }

    #[test]
    fn test_search_reorder_is_a_change() {
        let s1 = Search {
            name: "a".into(),
            ..Search::default()
        };
        let s2 = Search {
            name: "b".into(),
            ..Search::default()
        };
        let mut one = plan(vec![Phase {
            name: "P".into(),
            tasks: vec![Task {
                searches: vec![s1.clone(), s2.clone()],
                ..task("T")
            }],
        }]);
        let two = plan(vec![Phase {
            name: "P".into(),
            tasks: vec![Task {
                searches: vec![s2, s1],
                ..task("T")
            }],
        }]);
        assert_ne!(one, two);
        one.phases[0].tasks[0].searches.reverse();
        assert_eq!(one, two);
    }

    #[test]
    fn test_record_decode_unescapes_strings() {
        let obj = serde_json::json!({
            "id": "rp-1",
            "name": "Incident%20Response",
            "description": "",
            "template_status": "draft",
            "phases": [{
                "id": "ph-1",
                "name": "Initial%20Triage",
                "tasks": [null]
            }]
        });
        let record = PlanRecord::from_api(&obj, true);
        assert_eq!(record.name, "Incident Response");
        assert_eq!(record.phases[0].name, "Initial Triage");
        // Null placeholder tasks are filtered out.
        assert!(record.phases[0].tasks.is_empty());
    }
}
