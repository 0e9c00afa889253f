//! Finding management: create, targeted update, and queries.

use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::http::SplunkClient;
use steward_core::models::finding::Finding;
use steward_core::{refid, ApiContext, Outcome, Result, SplunkError};

/// Query filters for listing findings.
#[derive(Debug, Clone, Default)]
pub struct FindingFilter {
    /// Exact-title match, applied client-side.
    pub title: Option<String>,
    pub earliest: Option<String>,
    pub latest: Option<String>,
    pub limit: Option<u64>,
}

/// Findings resource API.
pub struct FindingsApi<'a> {
    client: &'a SplunkClient,
    ctx: ApiContext,
}

impl<'a> FindingsApi<'a> {
    /// Uses the default findings context (the ES suite app).
    pub fn new(client: &'a SplunkClient) -> Self {
        Self::with_context(client, ApiContext::security_suite())
    }

    pub fn with_context(client: &'a SplunkClient, ctx: ApiContext) -> Self {
        Self { client, ctx }
    }

    /// Fetches a finding by its composite reference id. The epoch embedded
    /// in the id becomes an `earliest` filter so findings older than the
    /// API's default window are still reachable.
    #[instrument(skip(self))]
    pub async fn get(&self, ref_id: &str) -> Result<Option<Finding>> {
        let mut query = Vec::new();
        if let Some(epoch) = refid::notable_time(ref_id) {
            query.push(("earliest".to_string(), epoch.to_string()));
        }
        let response = match self.client.get(&self.ctx.finding(ref_id), &query).await {
            Ok(v) => v,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        if !response.is_object() {
            return Ok(None);
        }
        let mut finding = Finding::from_api(&response);
        finding.ref_id = Some(ref_id.to_string());
        Ok(Some(finding))
    }

    /// Lists findings, optionally filtered by time window and exact title.
    #[instrument(skip(self, filter))]
    pub async fn list(&self, filter: &FindingFilter) -> Result<Vec<Finding>> {
        let mut query = Vec::new();
        if let Some(earliest) = &filter.earliest {
            query.push(("earliest".to_string(), earliest.clone()));
        }
        if let Some(latest) = &filter.latest {
            query.push(("latest".to_string(), latest.clone()));
        }
        if let Some(limit) = filter.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        let response = match self.client.get(&self.ctx.findings(), &query).await {
            Ok(v) => v,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut findings: Vec<Finding> = response
            .get("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter(|v| v.is_object())
                    .map(Finding::from_api)
                    .collect()
            })
            .unwrap_or_default();
        if let Some(title) = &filter.title {
            findings.retain(|f| f.title.as_deref() == Some(title.as_str()));
        }
        debug!(count = findings.len(), "findings fetched");
        Ok(findings)
    }

    /// Reconciles a finding: creates it when no reference id is given,
    /// otherwise diffs the updatable fields and updates only when needed.
    #[instrument(skip(self, desired), fields(ref_id = ?desired.ref_id))]
    pub async fn apply(&self, desired: &Finding, dry_run: bool) -> Result<Outcome<Finding>> {
        match &desired.ref_id {
            Some(ref_id) => self.update(ref_id, desired, dry_run).await,
            None => self.create(desired, dry_run).await,
        }
    }

    async fn create(&self, desired: &Finding, dry_run: bool) -> Result<Outcome<Finding>> {
        desired.validate_create()?;
        if dry_run {
            return Ok(Outcome::created(
                desired.clone(),
                "Dry run: would create finding",
            ));
        }
        let response = self
            .client
            .post_json(&self.ctx.findings(), &[], &desired.create_payload())
            .await?;
        let after = if response.is_object() {
            Finding::from_api(&response)
        } else {
            desired.clone()
        };
        info!(title = ?desired.title, "finding created");
        Ok(Outcome::created(after, "Finding created successfully"))
    }

    async fn update(
        &self,
        ref_id: &str,
        desired: &Finding,
        dry_run: bool,
    ) -> Result<Outcome<Finding>> {
        if desired.has_read_only_fields() {
            debug!("ignoring fields that cannot be updated on an existing finding");
        }
        let patch = desired.patch();
        if patch.is_empty() {
            return Err(SplunkError::Validation(
                "no updatable fields provided; only owner, status, urgency, and disposition \
can be updated"
                    .to_string(),
            ));
        }

        let existing = self
            .get(ref_id)
            .await?
            .ok_or_else(|| SplunkError::NotFound(format!("finding with ref_id '{ref_id}'")))?;

        let diff = patch.diff(&existing);
        if diff.is_empty() {
            debug!("finding already in desired state");
            return Ok(Outcome::unchanged(existing, "No changes required"));
        }

        let after = diff.apply_to(&existing);
        if dry_run {
            return Ok(Outcome::updated(
                existing,
                after,
                "Dry run: would update finding",
            ));
        }

        let epoch = refid::notable_time(ref_id).ok_or_else(|| {
            SplunkError::Validation(format!(
                "cannot extract notable time from ref_id '{ref_id}'; \
expected format uuid@@notable@@time<epoch>"
            ))
        })?;
        self.client
            .post_json(
                &self.ctx.finding_update(ref_id),
                &[("notable_time".to_string(), epoch.to_string())],
                &diff.update_payload(),
            )
            .await?;

        info!(ref_id, "finding updated");
        Ok(Outcome::updated(
            existing,
            after,
            "Finding updated successfully",
        ))
    }
}
