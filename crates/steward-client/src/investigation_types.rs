//! Investigation type management.
//!
//! Types are keyed by name; the API exposes no separate id and no delete.
//! Response plan associations are only accepted on update, so a create that
//! carries them issues a follow-up PUT.

use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::http::SplunkClient;
use steward_core::models::investigation_type::{InvestigationType, InvestigationTypeSpec};
use steward_core::{ApiContext, Outcome, Result, SplunkError};

/// Investigation types resource API.
pub struct InvestigationTypesApi<'a> {
    client: &'a SplunkClient,
    ctx: ApiContext,
}

impl<'a> InvestigationTypesApi<'a> {
    pub fn new(client: &'a SplunkClient) -> Self {
        Self::with_context(client, ApiContext::default())
    }

    pub fn with_context(client: &'a SplunkClient, ctx: ApiContext) -> Self {
        Self { client, ctx }
    }

    /// Fetches an investigation type by name.
    #[instrument(skip(self))]
    pub async fn get(&self, name: &str) -> Result<Option<InvestigationType>> {
        let response = match self
            .client
            .get(&self.ctx.investigation_type(name), &[])
            .await
        {
            Ok(v) => v,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        if InvestigationType::exists_in(&response) {
            Ok(Some(InvestigationType::from_api(&response)))
        } else {
            Ok(None)
        }
    }

    /// Lists all investigation types.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<InvestigationType>> {
        let response = match self.client.get(&self.ctx.investigation_types(), &[]).await {
            Ok(v) => v,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let types = response
            .get("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter(|v| v.is_object())
                    .map(InvestigationType::from_api)
                    .collect()
            })
            .unwrap_or_default();
        Ok(types)
    }

    /// Reconciles an investigation type by name. Unset spec fields keep
    /// their existing server values.
    #[instrument(skip(self, desired), fields(name = %desired.name))]
    pub async fn apply(
        &self,
        desired: &InvestigationTypeSpec,
        dry_run: bool,
    ) -> Result<Outcome<InvestigationType>> {
        if desired.name.is_empty() {
            return Err(SplunkError::Validation(
                "missing required parameter: name".to_string(),
            ));
        }
        match self.get(&desired.name).await? {
            Some(existing) => self.update(&existing, desired, dry_run).await,
            None => self.create(desired, dry_run).await,
        }
    }

    async fn create(
        &self,
        desired: &InvestigationTypeSpec,
        dry_run: bool,
    ) -> Result<Outcome<InvestigationType>> {
        let target = desired.resolve(None);
        if dry_run {
            return Ok(Outcome::created(
                target,
                "Dry run: would create investigation type",
            ));
        }
        let response = self
            .client
            .post_json(
                &self.ctx.investigation_types(),
                &[],
                &target.create_payload(),
            )
            .await?;
        let mut after = if response.is_object() {
            InvestigationType::from_api(&response)
        } else {
            target.clone()
        };

        // Associations are rejected by the create endpoint; send them in a
        // follow-up update.
        if !target.response_plan_ids.is_empty() {
            debug!(
                count = target.response_plan_ids.len(),
                "associating response plans"
            );
            let response = self
                .client
                .put_json(
                    &self.ctx.investigation_type(&target.name),
                    &[],
                    &target.update_payload(),
                )
                .await?;
            if response.is_object() {
                after = InvestigationType::from_api(&response);
            }
        }

        info!(name = %desired.name, "investigation type created");
        Ok(Outcome::created(
            after,
            "Investigation type created successfully",
        ))
    }

    async fn update(
        &self,
        existing: &InvestigationType,
        desired: &InvestigationTypeSpec,
        dry_run: bool,
    ) -> Result<Outcome<InvestigationType>> {
        let target = desired.resolve(Some(existing));

        let description_changed = existing.description != target.description;
        let ids_changed = !existing.same_plan_ids(&target);
        if !description_changed && !ids_changed {
            debug!("investigation type already in desired state");
            return Ok(Outcome::unchanged(existing.clone(), "No changes required"));
        }

        if dry_run {
            return Ok(Outcome::updated(
                existing.clone(),
                target,
                "Dry run: would update investigation type",
            ));
        }

        let response = self
            .client
            .put_json(
                &self.ctx.investigation_type(&target.name),
                &[],
                &target.update_payload(),
            )
            .await?;
        let after = if response.is_object() {
            InvestigationType::from_api(&response)
        } else {
            target
        };
        info!(name = %desired.name, "investigation type updated");
        Ok(Outcome::updated(
            existing.clone(),
            after,
            "Investigation type updated successfully",
        ))
    }
}
