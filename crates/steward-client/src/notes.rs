//! Note management on findings, investigations, and applied-plan tasks.

use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::http::SplunkClient;
use steward_core::models::note::{Note, NoteTarget};
use steward_core::{ApiContext, Outcome, Result, SplunkError};

/// The API caps note listings; request the maximum, newest first.
const LIST_LIMIT: &str = "100";
const LIST_SORT: &str = "create_time:-1";

/// Notes resource API.
pub struct NotesApi<'a> {
    client: &'a SplunkClient,
    ctx: ApiContext,
}

impl<'a> NotesApi<'a> {
    pub fn new(client: &'a SplunkClient) -> Self {
        Self::with_context(client, ApiContext::default())
    }

    pub fn with_context(client: &'a SplunkClient, ctx: ApiContext) -> Self {
        Self { client, ctx }
    }

    /// Lists all notes on a target, newest first.
    #[instrument(skip(self, target))]
    pub async fn list(&self, target: &NoteTarget) -> Result<Vec<Note>> {
        let mut query = target.query_params();
        query.push(("limit".to_string(), LIST_LIMIT.to_string()));
        query.push(("sort".to_string(), LIST_SORT.to_string()));
        let response = match self
            .client
            .get(&target.notes_path(&self.ctx), &query)
            .await
        {
            Ok(v) => v,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let notes: Vec<Note> = response
            .get("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter(|v| v.is_object())
                    .map(Note::from_api)
                    .collect()
            })
            .unwrap_or_default();
        debug!(count = notes.len(), "notes fetched");
        Ok(notes)
    }

    /// Fetches one note. Task targets support a direct lookup; finding and
    /// investigation targets only expose a listing, which is filtered here.
    #[instrument(skip(self, target))]
    pub async fn get(&self, target: &NoteTarget, note_id: &str) -> Result<Option<Note>> {
        if target.supports_direct_get() {
            let response = match self
                .client
                .get(&target.note_path(&self.ctx, note_id), &[])
                .await
            {
                Ok(v) => v,
                Err(e) if e.is_not_found() => return Ok(None),
                Err(e) => return Err(e),
            };
            if response.is_object() {
                return Ok(Some(Note::from_api(&response)));
            }
            return Ok(None);
        }
        let notes = self.list(target).await?;
        Ok(notes
            .into_iter()
            .find(|n| n.note_id.as_deref() == Some(note_id)))
    }

    /// Reconciles a note. Without a note id the content becomes a new note;
    /// with one, the existing note is compared and updated only on change.
    #[instrument(skip(self, target, content))]
    pub async fn apply(
        &self,
        target: &NoteTarget,
        note_id: Option<&str>,
        content: &str,
        dry_run: bool,
    ) -> Result<Outcome<Note>> {
        if content.is_empty() {
            return Err(SplunkError::Validation(
                "missing required parameter: content".to_string(),
            ));
        }
        match note_id {
            Some(id) => self.update(target, id, content, dry_run).await,
            None => self.create(target, content, dry_run).await,
        }
    }

    async fn create(
        &self,
        target: &NoteTarget,
        content: &str,
        dry_run: bool,
    ) -> Result<Outcome<Note>> {
        let note = Note {
            note_id: None,
            content: content.to_string(),
            create_time: None,
        };
        if dry_run {
            return Ok(Outcome::created(note, "Dry run: would create note"));
        }
        let response = self
            .client
            .post_json(
                &target.notes_path(&self.ctx),
                &target.query_params(),
                &note.payload(),
            )
            .await?;
        let after = if response.is_object() {
            Note::from_api(&response)
        } else {
            note
        };
        info!("note created");
        Ok(Outcome::created(after, "Note created successfully"))
    }

    async fn update(
        &self,
        target: &NoteTarget,
        note_id: &str,
        content: &str,
        dry_run: bool,
    ) -> Result<Outcome<Note>> {
        let existing = self
            .get(target, note_id)
            .await?
            .ok_or_else(|| SplunkError::NotFound(format!("note with id '{note_id}'")))?;

        let desired = Note {
            note_id: Some(note_id.to_string()),
            content: content.to_string(),
            create_time: existing.create_time,
        };
        if existing.same_content(&desired) {
            debug!("note already in desired state");
            return Ok(Outcome::unchanged(existing, "No changes required"));
        }

        if dry_run {
            return Ok(Outcome::updated(
                existing,
                desired,
                "Dry run: would update note",
            ));
        }

        let response = self
            .client
            .post_json(
                &target.note_path(&self.ctx, note_id),
                &target.query_params(),
                &desired.payload(),
            )
            .await?;
        let after = if response.is_object() {
            Note::from_api(&response)
        } else {
            desired
        };

        // The server may decline the edit silently; report what actually
        // happened rather than what was requested.
        if existing.same_content(&after) {
            debug!("api reported no content change");
            return Ok(Outcome::unchanged(existing, "No changes required"));
        }
        info!(note_id, "note updated");
        Ok(Outcome::updated(existing, after, "Note updated successfully"))
    }

    /// Deletes a note; already-absent notes are an idempotent no-op.
    #[instrument(skip(self, target))]
    pub async fn remove(
        &self,
        target: &NoteTarget,
        note_id: &str,
        dry_run: bool,
    ) -> Result<Outcome<Note>> {
        let existing = match self.get(target, note_id).await? {
            Some(note) => note,
            None => {
                debug!(note_id, "note not found, already absent");
                return Ok(Outcome::already_absent("Note not found, already absent"));
            }
        };
        if dry_run {
            return Ok(Outcome::deleted(existing, "Dry run: would delete note"));
        }
        self.client
            .delete(&target.note_path(&self.ctx, note_id))
            .await?;
        info!(note_id, "note deleted");
        Ok(Outcome::deleted(existing, "Note deleted successfully"))
    }
}
