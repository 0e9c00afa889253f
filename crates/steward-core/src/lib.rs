//! # steward-core
//!
//! Domain models, value mappings, path construction, and the reconcile
//! engine for declarative Splunk Enterprise Security state management.
//!
//! This crate is pure logic: it never performs I/O. The companion
//! `steward-client` crate drives these types against the Splunk REST API.

pub mod error;
pub mod mapping;
pub mod models;
pub mod outcome;
pub mod paths;
pub mod refid;

pub use error::{Result, SplunkError};
pub use models::execution::{
    AppliedPhase, AppliedPlan, AppliedTask, ApplicationState, TaskOutcome, TaskRequest,
};
pub use models::finding::{CustomField, Finding, FindingPatch};
pub use models::investigation::{Investigation, InvestigationPatch};
pub use models::investigation_type::{InvestigationType, InvestigationTypeSpec};
pub use models::note::{Note, NoteTarget};
pub use models::plan::{
    build_plan_payload, Phase, PhaseRecord, PlanRecord, ResponsePlan, Search, Task, TaskRecord,
};
pub use outcome::Outcome;
pub use paths::ApiContext;
