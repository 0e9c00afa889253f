//! Applying response plans to investigations and progressing their tasks.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::http::SplunkClient;
use steward_core::models::execution::{
    AppliedPlan, ApplicationState, TaskOutcome, TaskRequest,
};
use steward_core::{mapping, ApiContext, Result, SplunkError};
use uuid::Uuid;

/// Result of an apply/remove against one investigation, including per-task
/// records when task progression was requested.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionOutcome {
    pub before: ApplicationState,
    pub after: ApplicationState,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tasks_updated: Vec<TaskOutcome>,
    pub changed: bool,
    pub message: String,
}

/// Response plan execution API.
pub struct ExecutionsApi<'a> {
    client: &'a SplunkClient,
    ctx: ApiContext,
}

impl<'a> ExecutionsApi<'a> {
    pub fn new(client: &'a SplunkClient) -> Self {
        Self::with_context(client, ApiContext::default())
    }

    pub fn with_context(client: &'a SplunkClient, ctx: ApiContext) -> Self {
        Self { client, ctx }
    }

    /// Lists response plans applied to an investigation. Unlike other
    /// queries, a missing investigation is a hard failure here; an applied
    /// plan cannot meaningfully be empty-listed against nothing.
    #[instrument(skip(self))]
    pub async fn list(&self, investigation_id: &str) -> Result<Vec<AppliedPlan>> {
        let raw = self.applied_raw(investigation_id).await.map_err(|e| {
            if e.is_not_found() {
                SplunkError::NotFound(format!("investigation '{investigation_id}'"))
            } else {
                e
            }
        })?;
        Ok(raw.iter().map(AppliedPlan::from_api).collect())
    }

    /// Applied plans live inside the incident detail response.
    async fn applied_raw(&self, investigation_id: &str) -> Result<Vec<Value>> {
        let response = self
            .client
            .get(&self.ctx.incident(investigation_id), &[])
            .await?;
        Ok(response
            .get("response_plans")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter(|v| v.is_object()).cloned().collect())
            .unwrap_or_default())
    }

    /// Resolves a template reference (name or UUID) to `(id, name)` via the
    /// templates listing.
    async fn resolve_template(&self, reference: &str) -> Result<(String, String)> {
        let response = self
            .client
            .get(&self.ctx.response_plans(), &[])
            .await?;
        let templates: Vec<&Value> = response
            .get("items")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter(|v| v.is_object()).collect())
            .unwrap_or_default();
        if templates.is_empty() {
            return Err(SplunkError::NotFound(
                "no response plan templates found".to_string(),
            ));
        }

        let field = |v: &Value, key: &str| v.get(key).and_then(Value::as_str).map(str::to_string);
        let resolved = if Uuid::parse_str(reference).is_ok() {
            templates
                .iter()
                .find(|t| field(t, "id").as_deref() == Some(reference))
                .and_then(|t| field(t, "name"))
                .map(|name| (reference.to_string(), name))
        } else {
            templates
                .iter()
                .find(|t| field(t, "name").as_deref() == Some(reference))
                .and_then(|t| field(t, "id"))
                .map(|id| (id, reference.to_string()))
        };
        resolved.ok_or_else(|| SplunkError::NotFound(format!("response plan '{reference}'")))
    }

    /// The incident detail response omits the source template id on applied
    /// plans, so application is matched by plan name.
    fn find_applied<'v>(applied: &'v [Value], name: &str) -> Option<&'v Value> {
        applied
            .iter()
            .find(|plan| plan.get("name").and_then(Value::as_str) == Some(name))
    }

    fn state_of(existing: Option<&Value>, template_id: &str) -> ApplicationState {
        match existing {
            Some(plan) => ApplicationState {
                applied: true,
                applied_plan_id: plan
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                response_plan_id: Some(template_id.to_string()),
            },
            None => ApplicationState::default(),
        }
    }

    /// Ensures the plan is applied (idempotent by plan name) and progresses
    /// any requested tasks. Task lookups that miss produce per-task error
    /// records without aborting the rest.
    #[instrument(skip(self, tasks))]
    pub async fn apply(
        &self,
        investigation_id: &str,
        plan_reference: &str,
        tasks: &[TaskRequest],
        dry_run: bool,
    ) -> Result<ExecutionOutcome> {
        let (template_id, template_name) = self.resolve_template(plan_reference).await?;
        debug!(%template_id, %template_name, "template resolved");

        let applied = self.applied_raw(investigation_id).await?;
        let existing = Self::find_applied(&applied, &template_name);
        let before = Self::state_of(existing, &template_id);

        if existing.is_none() && dry_run {
            return Ok(ExecutionOutcome {
                before,
                after: ApplicationState {
                    applied: true,
                    applied_plan_id: None,
                    response_plan_id: Some(template_id),
                },
                tasks_updated: Vec::new(),
                changed: true,
                message: "Dry run: would apply response plan".to_string(),
            });
        }

        let (applied_plan_id, plan_changed) = match existing {
            Some(plan) => {
                debug!("response plan already applied");
                (
                    plan.get("id")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    false,
                )
            }
            None => {
                let response = self
                    .client
                    .post_json(
                        &self.ctx.applied_plans(investigation_id),
                        &[],
                        &json!({
                            "response_template_id": template_id,
                            "incidentType": "default",
                        }),
                    )
                    .await?;
                info!(investigation_id, "response plan applied");
                (
                    response
                        .get("id")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    true,
                )
            }
        };

        let (tasks_updated, tasks_changed) = if tasks.is_empty() {
            (Vec::new(), false)
        } else {
            self.progress_tasks(investigation_id, &template_name, tasks, dry_run)
                .await?
        };

        let after = ApplicationState {
            applied: true,
            applied_plan_id: Some(applied_plan_id),
            response_plan_id: Some(template_id),
        };
        let message = match (plan_changed, tasks_changed) {
            (true, true) => "Response plan applied and tasks updated successfully",
            (true, false) => "Response plan applied successfully",
            (false, true) => "Tasks updated successfully",
            (false, false) => "No changes required",
        };
        Ok(ExecutionOutcome {
            before,
            after,
            tasks_updated,
            changed: plan_changed || tasks_changed,
            message: message.to_string(),
        })
    }

    /// Re-fetches the applied plan (the apply response lacks the full
    /// phase/task tree) and settles each requested task independently.
    async fn progress_tasks(
        &self,
        investigation_id: &str,
        template_name: &str,
        tasks: &[TaskRequest],
        dry_run: bool,
    ) -> Result<(Vec<TaskOutcome>, bool)> {
        let applied = self.applied_raw(investigation_id).await?;
        let plan = match Self::find_applied(&applied, template_name) {
            Some(raw) => AppliedPlan::from_api(raw),
            None => return Ok((Vec::new(), false)),
        };

        let mut results = Vec::with_capacity(tasks.len());
        for request in tasks {
            results.push(
                self.progress_one(investigation_id, &plan, request, dry_run)
                    .await?,
            );
        }
        let any_changed = results.iter().any(|r| r.changed);
        Ok((results, any_changed))
    }

    async fn progress_one(
        &self,
        investigation_id: &str,
        plan: &AppliedPlan,
        request: &TaskRequest,
        dry_run: bool,
    ) -> Result<TaskOutcome> {
        let phase = match plan.phase_by_name(&request.phase_name) {
            Some(phase) => phase,
            None => {
                warn!(phase = %request.phase_name, "phase not found, skipping task");
                return Ok(TaskOutcome::lookup_error(
                    request,
                    format!("phase '{}' not found", request.phase_name),
                ));
            }
        };
        let task = match phase.task_by_name(&request.task_name) {
            Some(task) => task,
            None => {
                warn!(
                    task = %request.task_name,
                    phase = %request.phase_name,
                    "task not found, skipping"
                );
                return Ok(TaskOutcome::lookup_error(
                    request,
                    format!(
                        "task '{}' not found in phase '{}'",
                        request.task_name, request.phase_name
                    ),
                ));
            }
        };

        // Status and owner settle independently; only what differs is sent.
        let status_update = request
            .status
            .as_deref()
            .filter(|s| *s != task.status);
        let owner_update = request.owner.as_deref().filter(|o| *o != task.owner);
        if status_update.is_none() && owner_update.is_none() {
            debug!(task = %request.task_name, "task already in desired state");
            return Ok(TaskOutcome::settled(
                request,
                task.status.clone(),
                task.owner.clone(),
                false,
            ));
        }

        let final_status = request.status.clone().unwrap_or_else(|| task.status.clone());
        let final_owner = request.owner.clone().unwrap_or_else(|| task.owner.clone());
        if dry_run {
            return Ok(TaskOutcome::settled(request, final_status, final_owner, true));
        }

        let mut payload = serde_json::Map::new();
        if let Some(status) = status_update {
            payload.insert(
                "status".to_string(),
                Value::from(mapping::task_status_to_api(status)),
            );
        }
        if let Some(owner) = owner_update {
            payload.insert("owner".to_string(), Value::from(owner));
        }
        self.client
            .post_json(
                &self
                    .ctx
                    .applied_task(investigation_id, &plan.id, &phase.id, &task.id),
                &[],
                &Value::Object(payload),
            )
            .await?;
        info!(task = %request.task_name, "task updated");
        Ok(TaskOutcome::settled(request, final_status, final_owner, true))
    }

    /// Removes an applied plan; not-applied plans are an idempotent no-op.
    #[instrument(skip(self))]
    pub async fn remove(
        &self,
        investigation_id: &str,
        plan_reference: &str,
        dry_run: bool,
    ) -> Result<ExecutionOutcome> {
        let (template_id, template_name) = self.resolve_template(plan_reference).await?;

        let applied = self.applied_raw(investigation_id).await?;
        let existing = Self::find_applied(&applied, &template_name);
        let before = Self::state_of(existing, &template_id);
        let after = ApplicationState::default();

        let Some(plan) = existing else {
            debug!("response plan not applied, nothing to remove");
            return Ok(ExecutionOutcome {
                before,
                after,
                tasks_updated: Vec::new(),
                changed: false,
                message: "Response plan not applied, already absent".to_string(),
            });
        };

        if dry_run {
            return Ok(ExecutionOutcome {
                before,
                after,
                tasks_updated: Vec::new(),
                changed: true,
                message: "Dry run: would remove response plan".to_string(),
            });
        }

        let applied_plan_id = plan
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.client
            .delete(&self.ctx.applied_plan(investigation_id, &applied_plan_id))
            .await?;
        info!(investigation_id, "response plan removed");
        Ok(ExecutionOutcome {
            before,
            after,
            tasks_updated: Vec::new(),
            changed: true,
            message: "Response plan removed successfully".to_string(),
        })
    }
}
