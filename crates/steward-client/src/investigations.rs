//! Investigation management: create, field updates, and additive finding
//! attachment.

use serde_json::json;
use tracing::{debug, info, instrument};

use crate::http::SplunkClient;
use steward_core::models::investigation::Investigation;
use steward_core::{ApiContext, Outcome, Result, SplunkError};

/// Query filters for listing investigations.
#[derive(Debug, Clone, Default)]
pub struct InvestigationFilter {
    /// Exact-name match, applied client-side.
    pub name: Option<String>,
    pub create_time_min: Option<String>,
    pub create_time_max: Option<String>,
    pub limit: Option<u64>,
}

impl InvestigationFilter {
    fn query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(min) = &self.create_time_min {
            query.push(("create_time_min".to_string(), min.clone()));
        }
        if let Some(max) = &self.create_time_max {
            query.push(("create_time_max".to_string(), max.clone()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        query
    }
}

/// Investigations resource API.
pub struct InvestigationsApi<'a> {
    client: &'a SplunkClient,
    ctx: ApiContext,
}

impl<'a> InvestigationsApi<'a> {
    pub fn new(client: &'a SplunkClient) -> Self {
        Self::with_context(client, ApiContext::default())
    }

    pub fn with_context(client: &'a SplunkClient, ctx: ApiContext) -> Self {
        Self { client, ctx }
    }

    /// Fetches an investigation by GUID. The API only filters through the
    /// list endpoint's `ids` parameter; the first non-null element wins.
    #[instrument(skip(self))]
    pub async fn get(&self, ref_id: &str) -> Result<Option<Investigation>> {
        let query = vec![("ids".to_string(), ref_id.to_string())];
        let response = match self.client.get(&self.ctx.investigations(), &query).await {
            Ok(v) => v,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        let first = response
            .as_array()
            .and_then(|items| items.iter().find(|v| v.is_object()));
        Ok(first.map(|obj| {
            let mut inv = Investigation::from_api(obj);
            inv.ref_id = Some(ref_id.to_string());
            inv
        }))
    }

    /// Lists investigations with optional time-window filters and exact
    /// name matching.
    #[instrument(skip(self, filter))]
    pub async fn list(&self, filter: &InvestigationFilter) -> Result<Vec<Investigation>> {
        let response = match self
            .client
            .get(&self.ctx.investigations(), &filter.query())
            .await
        {
            Ok(v) => v,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut investigations: Vec<Investigation> = response
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter(|v| v.is_object())
                    .map(Investigation::from_api)
                    .collect()
            })
            .unwrap_or_default();
        if let Some(name) = &filter.name {
            investigations.retain(|inv| inv.name.as_deref() == Some(name.as_str()));
        }
        debug!(count = investigations.len(), "investigations fetched");
        Ok(investigations)
    }

    /// Reconciles an investigation. Without a GUID this creates; with one it
    /// diffs the updatable fields and attaches any finding ids not already
    /// present (attachment is additive, existing ids are never removed).
    #[instrument(skip(self, desired), fields(ref_id = ?desired.ref_id))]
    pub async fn apply(
        &self,
        desired: &Investigation,
        dry_run: bool,
    ) -> Result<Outcome<Investigation>> {
        match &desired.ref_id {
            Some(ref_id) => self.update(ref_id, desired, dry_run).await,
            None => self.create(desired, dry_run).await,
        }
    }

    async fn create(&self, desired: &Investigation, dry_run: bool) -> Result<Outcome<Investigation>> {
        if desired.name.is_none() {
            return Err(SplunkError::Validation(
                "missing required parameter: name".to_string(),
            ));
        }
        if dry_run {
            return Ok(Outcome::created(
                desired.clone(),
                "Dry run: would create investigation",
            ));
        }
        let response = self
            .client
            .post_json(&self.ctx.investigations(), &[], &desired.create_payload())
            .await?;
        // The create endpoint answers with little more than the GUID, so the
        // desired fields supply the rest of the after state.
        let mut after = desired.clone();
        if response.is_object() {
            let returned = Investigation::from_api(&response);
            if returned.ref_id.is_some() {
                after.ref_id = returned.ref_id;
            }
        }
        info!(name = ?desired.name, "investigation created");
        Ok(Outcome::created(
            after,
            "Investigation created successfully",
        ))
    }

    async fn update(
        &self,
        ref_id: &str,
        desired: &Investigation,
        dry_run: bool,
    ) -> Result<Outcome<Investigation>> {
        if desired.name.is_some() {
            debug!("ignoring 'name'; it cannot be updated after creation");
        }
        let patch = desired.patch();
        if patch.is_empty() && desired.finding_ids.is_empty() {
            return Err(SplunkError::Validation(
                "no updatable fields provided; the name cannot be updated".to_string(),
            ));
        }

        let existing = self.get(ref_id).await?.ok_or_else(|| {
            SplunkError::NotFound(format!("investigation with ref_id '{ref_id}'"))
        })?;

        let mut changed = false;
        let mut after = existing.clone();

        let diff = patch.diff(&existing);
        if !diff.is_empty() {
            debug!(?diff, "field changes detected");
            if !dry_run {
                self.client
                    .post_json(&self.ctx.investigation(ref_id), &[], &diff.update_payload())
                    .await?;
            }
            after = diff.apply_to(&after);
            changed = true;
        }

        if !desired.finding_ids.is_empty() {
            let new_ids: Vec<String> = desired
                .finding_ids
                .iter()
                .filter(|id| !existing.finding_ids.contains(id))
                .cloned()
                .collect();
            if new_ids.is_empty() {
                debug!("all findings already attached");
            } else {
                debug!(?new_ids, "attaching findings");
                if !dry_run {
                    self.client
                        .post_json(
                            &self.ctx.investigation_findings(ref_id),
                            &[],
                            &json!({ "finding_ids": new_ids }),
                        )
                        .await?;
                }
                after.finding_ids = existing
                    .finding_ids
                    .iter()
                    .cloned()
                    .chain(new_ids)
                    .collect();
                changed = true;
            }
        }

        if !changed {
            debug!("investigation already in desired state");
            return Ok(Outcome::unchanged(existing, "No changes required"));
        }
        let message = if dry_run {
            "Dry run: would update investigation"
        } else {
            info!(ref_id, "investigation updated");
            "Investigation updated successfully"
        };
        Ok(Outcome::updated(existing, after, message))
    }
}
