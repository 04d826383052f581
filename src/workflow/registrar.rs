//! Company registrar — the first side-effecting step.

use std::sync::Arc;
use std::sync::OnceLock;

use regex::Regex;
use tracing::info;

use crate::backend::Backend;
use crate::backend::types::{Company, CompanyProfile};
use crate::error::WorkflowError;
use crate::session::model::OnboardingSession;

fn email_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static regex"))
}

/// Registers the company exactly once per session.
pub struct CompanyRegistrar {
    backend: Arc<dyn Backend>,
}

impl CompanyRegistrar {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Validate the profile locally. Failing here means no network call
    /// was made.
    pub fn validate(profile: &CompanyProfile) -> Result<(), WorkflowError> {
        if profile.name.trim().is_empty() {
            return Err(WorkflowError::Validation("Company name is required".into()));
        }
        if profile.contact_email.trim().is_empty() {
            return Err(WorkflowError::Validation("Contact email is required".into()));
        }
        if !email_shape().is_match(profile.contact_email.trim()) {
            return Err(WorkflowError::Validation(format!(
                "Contact email '{}' is not a valid address",
                profile.contact_email
            )));
        }
        Ok(())
    }

    /// Register the company, unless the session already carries an id.
    ///
    /// The guard checks the precondition artifact (an existing
    /// `company_id`), not the step enum — backward display navigation must
    /// never re-trigger the registration side effect. Returns `None` when
    /// the call short-circuited.
    pub async fn register_once(
        &self,
        session: &OnboardingSession,
        profile: &CompanyProfile,
    ) -> Result<Option<Company>, WorkflowError> {
        Self::validate(profile)?;

        if let Some(existing) = &session.company_id {
            info!(company_id = %existing, "Company already registered; skipping");
            return Ok(None);
        }

        let company = self.backend.register_company(profile).await?;
        info!(company_id = %company.id, name = %company.name, "Company registered");
        Ok(Some(company))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, email: &str) -> CompanyProfile {
        CompanyProfile {
            name: name.to_string(),
            contact_name: "Ana".to_string(),
            contact_email: email.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn validate_rejects_empty_name() {
        let err = CompanyRegistrar::validate(&profile("", "a@acme.com")).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[test]
    fn validate_rejects_empty_and_malformed_email() {
        assert!(CompanyRegistrar::validate(&profile("Acme", "")).is_err());
        assert!(CompanyRegistrar::validate(&profile("Acme", "not-an-email")).is_err());
        assert!(CompanyRegistrar::validate(&profile("Acme", "a@b")).is_err());
    }

    #[test]
    fn validate_accepts_reasonable_profile() {
        assert!(CompanyRegistrar::validate(&profile("Acme", "a@acme.com")).is_ok());
    }
}
