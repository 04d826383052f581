//! Onboarding session model — workflow steps and the durable session object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::backend::types::ProvisioningReport;

/// The steps of the onboarding workflow.
///
/// Progresses linearly: CollectingProfile → AwaitingAuthorization →
/// ConfiguringResources → Provisioning → Complete. Display may move
/// backward; the persisted step only ever advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    CollectingProfile,
    AwaitingAuthorization,
    ConfiguringResources,
    Provisioning,
    Complete,
}

impl WorkflowStep {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_advance_to(&self, target: WorkflowStep) -> bool {
        use WorkflowStep::*;
        matches!(
            (self, target),
            (CollectingProfile, AwaitingAuthorization)
                | (AwaitingAuthorization, ConfiguringResources)
                | (ConfiguringResources, Provisioning)
                | (Provisioning, Complete)
        )
    }

    /// Whether this step is terminal (onboarding is done).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Get the next step in the linear progression, if any.
    pub fn next(&self) -> Option<WorkflowStep> {
        use WorkflowStep::*;
        match self {
            CollectingProfile => Some(AwaitingAuthorization),
            AwaitingAuthorization => Some(ConfiguringResources),
            ConfiguringResources => Some(Provisioning),
            Provisioning => Some(Complete),
            Complete => None,
        }
    }
}

impl Default for WorkflowStep {
    fn default() -> Self {
        Self::CollectingProfile
    }
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CollectingProfile => "collecting_profile",
            Self::AwaitingAuthorization => "awaiting_authorization",
            Self::ConfiguringResources => "configuring_resources",
            Self::Provisioning => "provisioning",
            Self::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

/// The durable onboarding session.
///
/// One active instance per deployment, stored as a JSON blob in the
/// settings table. Every field needed to resume after the authorization
/// redirect lives here — never in volatile memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingSession {
    /// Session correlation id (for logs; the session itself is a singleton).
    pub id: Uuid,
    /// Set at most once, by the registrar. Never reassigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    pub current_step: WorkflowStep,
    pub authorization_granted: bool,
    /// One-time correlation token set by the broker before the redirect.
    /// Cleared on a successful exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_state: Option<String>,
    /// User-entered fields preserved across the redirect boundary.
    #[serde(default)]
    pub form_snapshot: Map<String, Value>,
    /// The bound employee-data source. Later binder call wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_id: Option<String>,
    /// Ids of ingested policy records (additive, no dedup).
    #[serde(default)]
    pub policy_ids: Vec<String>,
    /// Terminal provisioning result, recorded exactly once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning: Option<ProvisioningReport>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OnboardingSession {
    /// Create a fresh session at the initial step.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            company_id: None,
            current_step: WorkflowStep::default(),
            authorization_granted: false,
            auth_state: None,
            form_snapshot: Map::new(),
            database_id: None,
            policy_ids: Vec::new(),
            provisioning: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Recompute the current step from durable fields.
    ///
    /// The persisted step enum can be stale: the in-memory object is
    /// discarded across the authorization redirect, and a crash between
    /// persist and transition leaves the step one behind its artifacts.
    /// Recovery trusts the artifacts, not the stored enum.
    pub fn derive_step(&self) -> WorkflowStep {
        if self.provisioning.is_some() {
            return WorkflowStep::Complete;
        }
        if self.authorization_granted {
            return WorkflowStep::ConfiguringResources;
        }
        if self.company_id.is_some() {
            return WorkflowStep::AwaitingAuthorization;
        }
        WorkflowStep::CollectingProfile
    }

    /// Whether the stored step disagrees with what the artifacts imply.
    pub fn step_is_stale(&self) -> bool {
        self.current_step != self.derive_step()
    }

    /// Touch the updated-at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for OnboardingSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        use WorkflowStep::*;
        let transitions = [
            (CollectingProfile, AwaitingAuthorization),
            (AwaitingAuthorization, ConfiguringResources),
            (ConfiguringResources, Provisioning),
            (Provisioning, Complete),
        ];
        for (from, to) in transitions {
            assert!(from.can_advance_to(to), "{from} should advance to {to}");
        }
    }

    #[test]
    fn invalid_transitions() {
        use WorkflowStep::*;
        // Skip steps
        assert!(!CollectingProfile.can_advance_to(ConfiguringResources));
        assert!(!AwaitingAuthorization.can_advance_to(Provisioning));
        // Go backward
        assert!(!ConfiguringResources.can_advance_to(AwaitingAuthorization));
        // Terminal
        assert!(!Complete.can_advance_to(CollectingProfile));
        // Self-transition
        assert!(!Provisioning.can_advance_to(Provisioning));
    }

    #[test]
    fn next_walks_all_steps() {
        use WorkflowStep::*;
        let expected = [
            AwaitingAuthorization,
            ConfiguringResources,
            Provisioning,
            Complete,
        ];
        let mut current = CollectingProfile;
        for expected_next in expected {
            let next = current.next().unwrap();
            assert_eq!(next, expected_next);
            current = next;
        }
        assert!(current.next().is_none());
    }

    #[test]
    fn display_matches_serde() {
        use WorkflowStep::*;
        for step in [
            CollectingProfile,
            AwaitingAuthorization,
            ConfiguringResources,
            Provisioning,
            Complete,
        ] {
            let display = format!("{step}");
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(format!("\"{display}\""), json);
        }
    }

    #[test]
    fn fresh_session_starts_at_collecting_profile() {
        let session = OnboardingSession::new();
        assert_eq!(session.current_step, WorkflowStep::CollectingProfile);
        assert!(session.company_id.is_none());
        assert!(!session.authorization_granted);
        assert!(session.database_id.is_none());
        assert!(session.provisioning.is_none());
        assert!(!session.step_is_stale());
    }

    #[test]
    fn derive_step_from_artifacts() {
        let mut session = OnboardingSession::new();
        assert_eq!(session.derive_step(), WorkflowStep::CollectingProfile);

        session.company_id = Some("C1".to_string());
        assert_eq!(session.derive_step(), WorkflowStep::AwaitingAuthorization);

        session.authorization_granted = true;
        assert_eq!(session.derive_step(), WorkflowStep::ConfiguringResources);

        session.provisioning = Some(ProvisioningReport {
            company_id: "C1".to_string(),
            database_id: "D1".to_string(),
            generated_count: 1,
            delivered_count: 1,
            failures: Vec::new(),
        });
        assert_eq!(session.derive_step(), WorkflowStep::Complete);
    }

    #[test]
    fn stale_step_is_detected() {
        // Left at AwaitingAuthorization because the in-memory object was
        // discarded across the redirect, but the grant is durable.
        let mut session = OnboardingSession::new();
        session.company_id = Some("C1".to_string());
        session.current_step = WorkflowStep::AwaitingAuthorization;
        session.authorization_granted = true;
        assert!(session.step_is_stale());
        assert_eq!(session.derive_step(), WorkflowStep::ConfiguringResources);
    }

    #[test]
    fn session_serde_roundtrip() {
        let mut session = OnboardingSession::new();
        session.company_id = Some("C1".to_string());
        session.current_step = WorkflowStep::AwaitingAuthorization;
        session.auth_state = Some("tok123".to_string());
        session
            .form_snapshot
            .insert("name".to_string(), Value::String("Acme".to_string()));

        let json = serde_json::to_string(&session).unwrap();
        let parsed: OnboardingSession = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.id, session.id);
        assert_eq!(parsed.company_id.as_deref(), Some("C1"));
        assert_eq!(parsed.current_step, WorkflowStep::AwaitingAuthorization);
        assert_eq!(parsed.auth_state.as_deref(), Some("tok123"));
        assert_eq!(parsed.form_snapshot["name"], "Acme");
    }
}
