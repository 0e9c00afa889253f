//! # steward-client
//!
//! Splunk ES REST transport and idempotent resource reconciliation.
//!
//! [`SplunkClient`] wraps the HTTP edge (auth, TLS, `output_mode=json`,
//! status classification); the per-resource APIs layer fetch → diff →
//! write orchestration over it, each honoring a dry-run flag that
//! short-circuits before any mutating call.

pub mod executions;
pub mod findings;
pub mod http;
pub mod investigation_types;
pub mod investigations;
pub mod notes;
pub mod response_plans;
pub mod secure_string;

pub use executions::{ExecutionOutcome, ExecutionsApi};
pub use findings::{FindingFilter, FindingsApi};
pub use http::{AuthConfig, SplunkClient, SplunkConfig};
pub use investigation_types::InvestigationTypesApi;
pub use investigations::{InvestigationFilter, InvestigationsApi};
pub use notes::NotesApi;
pub use response_plans::ResponsePlansApi;
pub use secure_string::SecureString;
