//! REST path construction for the Splunk ES API.
//!
//! Paths follow `{namespace}/{user}/{app}/{version}/{resource}[/{id}]`.
//! Identifiers embedded in a path segment are percent-encoded here, before
//! interpolation; query-string encoding is the transport's job.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Default namespace component.
pub const DEFAULT_NAMESPACE: &str = "servicesNS";
/// Default user component.
pub const DEFAULT_USER: &str = "nobody";
/// Default app for investigations, notes, and response plans.
pub const DEFAULT_APP: &str = "missioncontrol";
/// App hosting the findings read API.
pub const SECURITY_SUITE_APP: &str = "SplunkEnterpriseSecuritySuite";

/// Everything except unreserved characters gets escaped in a path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encodes a string for use as a single path segment.
pub fn encode_segment(raw: &str) -> String {
    utf8_percent_encode(raw, SEGMENT).to_string()
}

/// Decodes percent-encoded strings the read-only APIs return for
/// name/description/spl fields.
pub fn decode_api_string(raw: &str) -> String {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Namespace/user/app triple that prefixes every API path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiContext {
    pub namespace: String,
    pub user: String,
    pub app: String,
}

impl Default for ApiContext {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            user: DEFAULT_USER.to_string(),
            app: DEFAULT_APP.to_string(),
        }
    }
}

impl ApiContext {
    /// Context for the findings read API, which lives under the ES suite app.
    pub fn security_suite() -> Self {
        Self {
            app: SECURITY_SUITE_APP.to_string(),
            ..Self::default()
        }
    }

    fn prefix(&self) -> String {
        format!("{}/{}/{}", self.namespace, self.user, self.app)
    }

    /// Findings collection: `.../public/v2/findings`.
    pub fn findings(&self) -> String {
        format!("{}/public/v2/findings", self.prefix())
    }

    /// A single finding addressed by its composite reference id.
    pub fn finding(&self, ref_id: &str) -> String {
        format!("{}/{}", self.findings(), encode_segment(ref_id))
    }

    /// Finding update endpoint. This is served by a different, fixed app
    /// than the read endpoint regardless of the configured one.
    pub fn finding_update(&self, ref_id: &str) -> String {
        format!(
            "{}/{}/{}/v1/investigations/{}",
            self.namespace,
            self.user,
            DEFAULT_APP,
            encode_segment(ref_id)
        )
    }

    /// Investigations collection: `.../public/v2/investigations`.
    pub fn investigations(&self) -> String {
        format!("{}/public/v2/investigations", self.prefix())
    }

    /// A single investigation.
    pub fn investigation(&self, ref_id: &str) -> String {
        format!("{}/{}", self.investigations(), encode_segment(ref_id))
    }

    /// Endpoint for attaching findings to an investigation.
    pub fn investigation_findings(&self, ref_id: &str) -> String {
        format!("{}/findings", self.investigation(ref_id))
    }

    /// Investigation types collection: `.../v1/incidenttypes`.
    pub fn investigation_types(&self) -> String {
        format!("{}/v1/incidenttypes", self.prefix())
    }

    /// A single investigation type, addressed by name.
    pub fn investigation_type(&self, name: &str) -> String {
        format!("{}/{}", self.investigation_types(), encode_segment(name))
    }

    /// Notes collection for a finding or investigation. For findings the
    /// caller passes the composite reference id; for investigations the GUID.
    pub fn notes(&self, owner_id: &str) -> String {
        format!("{}/notes", self.investigation(owner_id))
    }

    /// A single note on a finding or investigation.
    pub fn note(&self, owner_id: &str, note_id: &str) -> String {
        format!("{}/{}", self.notes(owner_id), encode_segment(note_id))
    }

    /// Notes collection for a task inside an applied response plan.
    pub fn task_notes(
        &self,
        investigation_id: &str,
        plan_id: &str,
        phase_id: &str,
        task_id: &str,
    ) -> String {
        format!(
            "{}/responseplans/{}/phase/{}/tasks/{}/notes",
            self.investigation(investigation_id),
            encode_segment(plan_id),
            encode_segment(phase_id),
            encode_segment(task_id)
        )
    }

    /// A single note on an applied response plan task.
    pub fn task_note(
        &self,
        investigation_id: &str,
        plan_id: &str,
        phase_id: &str,
        task_id: &str,
        note_id: &str,
    ) -> String {
        format!(
            "{}/{}",
            self.task_notes(investigation_id, plan_id, phase_id, task_id),
            encode_segment(note_id)
        )
    }

    /// Response plan templates collection: `.../v1/responsetemplates`.
    pub fn response_plans(&self) -> String {
        format!("{}/v1/responsetemplates", self.prefix())
    }

    /// A single response plan template.
    pub fn response_plan(&self, id: &str) -> String {
        format!("{}/{}", self.response_plans(), encode_segment(id))
    }

    /// Incident detail endpoint, which carries the applied response plans.
    pub fn incident(&self, investigation_id: &str) -> String {
        format!(
            "{}/v1/incidents/{}",
            self.prefix(),
            encode_segment(investigation_id)
        )
    }

    /// Applied response plans collection on an incident.
    pub fn applied_plans(&self, investigation_id: &str) -> String {
        format!("{}/responseplans", self.incident(investigation_id))
    }

    /// A single applied response plan instance.
    pub fn applied_plan(&self, investigation_id: &str, applied_id: &str) -> String {
        format!(
            "{}/{}",
            self.applied_plans(investigation_id),
            encode_segment(applied_id)
        )
    }

    /// A task inside an applied response plan.
    pub fn applied_task(
        &self,
        investigation_id: &str,
        applied_id: &str,
        phase_id: &str,
        task_id: &str,
    ) -> String {
        format!(
            "{}/phase/{}/tasks/{}",
            self.applied_plan(investigation_id, applied_id),
            encode_segment(phase_id),
            encode_segment(task_id)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_context() {
        let ctx = ApiContext::default();
        assert_eq!(
            ctx.investigations(),
            "servicesNS/nobody/missioncontrol/public/v2/investigations"
        );
        assert_eq!(
            ctx.response_plans(),
            "servicesNS/nobody/missioncontrol/v1/responsetemplates"
        );
    }

    #[test]
    fn test_findings_path_uses_suite_app() {
        let ctx = ApiContext::security_suite();
        assert_eq!(
            ctx.findings(),
            "servicesNS/nobody/SplunkEnterpriseSecuritySuite/public/v2/findings"
        );
    }

    #[test]
    fn test_finding_ref_id_is_encoded() {
        let ctx = ApiContext::security_suite();
        let path = ctx.finding("abc@@notable@@time1768225865");
        assert_eq!(
            path,
            "servicesNS/nobody/SplunkEnterpriseSecuritySuite/public/v2/findings/abc%40%40notable%40%40time1768225865"
        );
    }

    #[test]
    fn test_finding_update_ignores_configured_app() {
        let ctx = ApiContext::security_suite();
        let path = ctx.finding_update("ref-1");
        assert!(path.starts_with("servicesNS/nobody/missioncontrol/v1/investigations/"));
    }

    #[test]
    fn test_investigation_type_name_is_encoded() {
        let ctx = ApiContext::default();
        assert_eq!(
            ctx.investigation_type("Insider Threat"),
            "servicesNS/nobody/missioncontrol/v1/incidenttypes/Insider%20Threat"
        );
    }

    #[test]
    fn test_task_note_path() {
        let ctx = ApiContext::default();
        let path = ctx.task_note("inv-1", "plan-1", "phase-1", "task-1", "note-1");
        assert_eq!(
            path,
            "servicesNS/nobody/missioncontrol/public/v2/investigations/inv-1\
/responseplans/plan-1/phase/phase-1/tasks/task-1/notes/note-1"
        );
    }

    #[test]
    fn test_decode_api_string() {
        assert_eq!(decode_api_string("Initial%20Triage"), "Initial Triage");
        assert_eq!(decode_api_string("plain"), "plain");
    }
}
