//! Before/after result contract for write operations.

use serde::Serialize;

/// Result of a reconcile operation against a single object.
///
/// `after` in a dry run is a client-side projection (existing state merged
/// with the desired changes); the server's own defaulting and validation are
/// not simulated, so it may differ from what a real run would report.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome<T> {
    /// State before the operation, if the object existed.
    pub before: Option<T>,
    /// State after the operation (projected in dry-run mode).
    pub after: Option<T>,
    /// Whether anything changed (or would change, in dry-run mode).
    pub changed: bool,
    /// Human-readable summary of what happened.
    pub message: String,
}

impl<T> Outcome<T> {
    /// A create: nothing existed before.
    pub fn created(after: T, message: impl Into<String>) -> Self {
        Self {
            before: None,
            after: Some(after),
            changed: true,
            message: message.into(),
        }
    }

    /// An update that changed the object.
    pub fn updated(before: T, after: T, message: impl Into<String>) -> Self {
        Self {
            before: Some(before),
            after: Some(after),
            changed: true,
            message: message.into(),
        }
    }

    /// No difference between desired and existing state.
    pub fn unchanged(existing: T, message: impl Into<String>) -> Self
    where
        T: Clone,
    {
        Self {
            before: Some(existing.clone()),
            after: Some(existing),
            changed: false,
            message: message.into(),
        }
    }

    /// A delete: nothing remains after.
    pub fn deleted(before: T, message: impl Into<String>) -> Self {
        Self {
            before: Some(before),
            after: None,
            changed: true,
            message: message.into(),
        }
    }

    /// Delete of an object that was already absent.
    pub fn already_absent(message: impl Into<String>) -> Self {
        Self {
            before: None,
            after: None,
            changed: false,
            message: message.into(),
        }
    }
}
