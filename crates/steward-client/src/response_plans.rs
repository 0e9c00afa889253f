//! Response plan template management.
//!
//! Updates are full replacements with name-matched id preservation; see
//! `steward_core::models::plan` for the payload construction rules.

use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::http::SplunkClient;
use steward_core::models::plan::{build_plan_payload, PlanRecord, ResponsePlan};
use steward_core::{ApiContext, Outcome, Result, SplunkError};

/// Response plans resource API.
pub struct ResponsePlansApi<'a> {
    client: &'a SplunkClient,
    ctx: ApiContext,
}

impl<'a> ResponsePlansApi<'a> {
    pub fn new(client: &'a SplunkClient) -> Self {
        Self::with_context(client, ApiContext::default())
    }

    pub fn with_context(client: &'a SplunkClient, ctx: ApiContext) -> Self {
        Self { client, ctx }
    }

    async fn fetch_raw(&self, limit: Option<u64>) -> Result<Vec<Value>> {
        let mut query = Vec::new();
        if let Some(limit) = limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        let response = match self.client.get(&self.ctx.response_plans(), &query).await {
            Ok(v) => v,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        Ok(response
            .get("items")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter(|v| v.is_object()).cloned().collect())
            .unwrap_or_default())
    }

    /// Lists all plans, with server ids and display strings decoded.
    #[instrument(skip(self))]
    pub async fn list(&self, limit: Option<u64>) -> Result<Vec<PlanRecord>> {
        let records = self
            .fetch_raw(limit)
            .await?
            .iter()
            .map(|v| PlanRecord::from_api(v, true))
            .collect();
        Ok(records)
    }

    /// Fetches one plan by exact name, decoded for display.
    #[instrument(skip(self))]
    pub async fn get(&self, name: &str) -> Result<Option<PlanRecord>> {
        Ok(self
            .list(None)
            .await?
            .into_iter()
            .find(|record| record.name == name))
    }

    /// Finds a plan by name for reconciliation, keeping the raw (encoded)
    /// strings so equality comparison sees exactly what the server stores.
    /// The API offers no server-side exact-name filter, so this is a linear
    /// scan of the full listing.
    async fn find_for_update(&self, name: &str) -> Result<Option<PlanRecord>> {
        let raw = self.fetch_raw(None).await?;
        Ok(raw
            .iter()
            .find(|v| v.get("name").and_then(Value::as_str) == Some(name))
            .map(|v| PlanRecord::from_api(v, false)))
    }

    /// Reconciles a plan by name: validates name uniqueness constraints,
    /// then creates or fully replaces as needed.
    #[instrument(skip(self, desired), fields(name = %desired.name))]
    pub async fn apply(
        &self,
        desired: &ResponsePlan,
        dry_run: bool,
    ) -> Result<Outcome<ResponsePlan>> {
        if desired.name.is_empty() {
            return Err(SplunkError::Validation(
                "missing required parameter: name".to_string(),
            ));
        }
        if desired.phases.is_empty() {
            return Err(SplunkError::Validation(
                "missing required parameter: phases".to_string(),
            ));
        }
        desired.validate_unique_names()?;

        match self.find_for_update(&desired.name).await? {
            Some(existing) => self.update(&existing, desired, dry_run).await,
            None => self.create(desired, dry_run).await,
        }
    }

    async fn create(
        &self,
        desired: &ResponsePlan,
        dry_run: bool,
    ) -> Result<Outcome<ResponsePlan>> {
        let payload = build_plan_payload(desired, None);
        if dry_run {
            let after = ResponsePlan::from_api(&payload);
            return Ok(Outcome::created(after, "Dry run: would create response plan"));
        }
        let response = self
            .client
            .post_json(&self.ctx.response_plans(), &[], &payload)
            .await?;
        let after = if response.is_object() {
            ResponsePlan::from_api(&response)
        } else {
            ResponsePlan::from_api(&payload)
        };
        info!(name = %desired.name, "response plan created");
        Ok(Outcome::created(after, "Response plan created successfully"))
    }

    async fn update(
        &self,
        existing: &PlanRecord,
        desired: &ResponsePlan,
        dry_run: bool,
    ) -> Result<Outcome<ResponsePlan>> {
        let payload = build_plan_payload(desired, Some(existing));

        // Compare the whole normalized tree; any difference anywhere in
        // phases/tasks/searches (including ordering) triggers a full update.
        let before = existing.to_spec();
        let after = ResponsePlan::from_api(&payload);
        if before == after {
            debug!("response plan already in desired state");
            return Ok(Outcome::unchanged(before, "No changes required"));
        }

        if dry_run {
            return Ok(Outcome::updated(
                before,
                after,
                "Dry run: would update response plan",
            ));
        }

        let response = self
            .client
            .post_json(&self.ctx.response_plan(&existing.id), &[], &payload)
            .await?;
        let after = if response.is_object() {
            ResponsePlan::from_api(&response)
        } else {
            after
        };
        info!(name = %desired.name, id = %existing.id, "response plan updated");
        Ok(Outcome::updated(
            before,
            after,
            "Response plan updated successfully",
        ))
    }

    /// Deletes a plan by name; already-absent plans are an idempotent no-op.
    #[instrument(skip(self))]
    pub async fn remove(&self, name: &str, dry_run: bool) -> Result<Outcome<ResponsePlan>> {
        let existing = match self.find_for_update(name).await? {
            Some(record) => record,
            None => {
                debug!(name, "response plan not found, already absent");
                return Ok(Outcome::already_absent(
                    "Response plan not found, already absent",
                ));
            }
        };
        let before = existing.to_spec();
        if dry_run {
            return Ok(Outcome::deleted(before, "Dry run: would delete response plan"));
        }
        self.client
            .delete(&self.ctx.response_plan(&existing.id))
            .await?;
        info!(name, id = %existing.id, "response plan deleted");
        Ok(Outcome::deleted(before, "Response plan deleted successfully"))
    }
}
