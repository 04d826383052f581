//! Authorization broker — builds the outbound redirect and validates the
//! inbound callback.
//!
//! The redirect destroys all process-local state, so everything needed to
//! resume is persisted durably BEFORE the target is handed to the caller.

use std::sync::Arc;

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Deserialize;
use tracing::{info, warn};

use crate::backend::Backend;
use crate::error::WorkflowError;
use crate::session::model::{OnboardingSession, WorkflowStep};
use crate::session::store::SessionStore;

/// Length of the one-time state token carried through the redirect.
const STATE_TOKEN_LEN: usize = 32;

/// Parameters returned by the provider on the callback redirect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    /// Error or cancellation indicator from the provider.
    #[serde(default)]
    pub error: Option<String>,
}

/// Mediates the redirect-based external consent exchange. Never stores or
/// inspects the durable credential — it only forwards the one-time code.
pub struct AuthorizationBroker {
    store: Arc<dyn SessionStore>,
    backend: Arc<dyn Backend>,
}

impl AuthorizationBroker {
    pub fn new(store: Arc<dyn SessionStore>, backend: Arc<dyn Backend>) -> Self {
        Self { store, backend }
    }

    /// Build the redirect target for the external provider.
    ///
    /// Persists the pending context (company id + state token) before
    /// returning; the navigation away may never return control to this
    /// process. Does not itself navigate.
    pub async fn initiate(
        &self,
        session: &mut OnboardingSession,
    ) -> Result<String, WorkflowError> {
        let company_id = session
            .company_id
            .clone()
            .ok_or_else(|| WorkflowError::Validation("No registered company in session".into()))?;

        if session.authorization_granted {
            return Err(WorkflowError::OutOfOrder {
                expected: WorkflowStep::AwaitingAuthorization.to_string(),
                actual: session.current_step.to_string(),
            });
        }

        let state_token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(STATE_TOKEN_LEN)
            .map(char::from)
            .collect();

        // Persist pending context first — mandatory ordering.
        session.auth_state = Some(state_token.clone());
        session.current_step = WorkflowStep::AwaitingAuthorization;
        session.touch();
        self.store.save(session).await?;

        let target = self.backend.initiate_authorization(&company_id).await?;
        let target = append_query(&target, "state", &state_token);

        info!(company_id = %company_id, "Authorization redirect prepared");
        Ok(target)
    }

    /// Validate the inbound callback and exchange the one-time code.
    ///
    /// On success sets `authorization_granted` and persists; the
    /// orchestrator performs the step transition afterwards.
    pub async fn complete(
        &self,
        session: &mut OnboardingSession,
        params: &CallbackParams,
    ) -> Result<(), WorkflowError> {
        // A callback without pending context is stale or replayed.
        let (company_id, expected_state) = match (&session.company_id, &session.auth_state) {
            (Some(id), Some(state)) => (id.clone(), state.clone()),
            _ => return Err(WorkflowError::AuthorizationMissingContext),
        };

        if let Some(error) = &params.error {
            warn!(company_id = %company_id, error = %error, "Authorization denied by provider");
            // Session untouched: company id preserved, step stays
            // AwaitingAuthorization, user may retry initiate.
            return Err(WorkflowError::AuthorizationDenied(error.clone()));
        }

        if params.state.as_deref() != Some(expected_state.as_str()) {
            return Err(WorkflowError::AuthorizationMissingContext);
        }

        let code = params
            .code
            .as_deref()
            .ok_or_else(|| WorkflowError::Validation("Callback carried no code".into()))?;

        self.backend
            .exchange_authorization_code(&company_id, code)
            .await?;

        session.authorization_granted = true;
        session.auth_state = None;
        session.touch();
        self.store.save(session).await?;

        info!(company_id = %company_id, "Authorization granted");
        Ok(())
    }
}

/// Append a query parameter to a URL that may or may not already have one.
fn append_query(url: &str, key: &str, value: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{key}={value}")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::backend::types::{
        Company, CompanyProfile, DatabaseDescriptor, DocumentRef, PolicyEntry, ProvisioningReport,
    };
    use crate::error::BackendError;
    use crate::session::store::MemoryStore;

    /// Stub backend for broker tests (no real API calls).
    #[derive(Default)]
    struct StubBackend {
        exchange_calls: AtomicUsize,
        fail_exchange: bool,
    }

    #[async_trait]
    impl Backend for StubBackend {
        async fn register_company(
            &self,
            _profile: &CompanyProfile,
        ) -> Result<Company, BackendError> {
            unimplemented!("not used in broker tests")
        }

        async fn initiate_authorization(
            &self,
            company_id: &str,
        ) -> Result<String, BackendError> {
            Ok(format!(
                "https://provider.example/consent?company={company_id}"
            ))
        }

        async fn exchange_authorization_code(
            &self,
            _company_id: &str,
            _code: &str,
        ) -> Result<(), BackendError> {
            self.exchange_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_exchange {
                return Err(BackendError::RequestFailed {
                    operation: "exchange_authorization_code".to_string(),
                    reason: "boom".to_string(),
                });
            }
            Ok(())
        }

        async fn add_policy_text(
            &self,
            _company_id: &str,
            _entry: &PolicyEntry,
        ) -> Result<String, BackendError> {
            unimplemented!("not used in broker tests")
        }

        async fn add_policy_document(
            &self,
            _company_id: &str,
            _document: &DocumentRef,
        ) -> Result<String, BackendError> {
            unimplemented!("not used in broker tests")
        }

        async fn bind_database(
            &self,
            _company_id: &str,
            _descriptor: &DatabaseDescriptor,
        ) -> Result<String, BackendError> {
            unimplemented!("not used in broker tests")
        }

        async fn provision_credentials(
            &self,
            _company_id: &str,
            _database_id: &str,
        ) -> Result<ProvisioningReport, BackendError> {
            unimplemented!("not used in broker tests")
        }
    }

    fn broker_with(backend: StubBackend) -> (AuthorizationBroker, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let broker = AuthorizationBroker::new(store.clone(), Arc::new(backend));
        (broker, store)
    }

    fn registered_session() -> OnboardingSession {
        let mut session = OnboardingSession::new();
        session.company_id = Some("C1".to_string());
        session.current_step = WorkflowStep::AwaitingAuthorization;
        session
    }

    #[tokio::test]
    async fn initiate_persists_before_returning_target() {
        let (broker, store) = broker_with(StubBackend::default());
        let mut session = registered_session();

        let target = broker.initiate(&mut session).await.unwrap();
        assert!(target.starts_with("https://provider.example/consent?company=C1"));
        assert!(target.contains("&state="));

        // The pending context must already be durable.
        let persisted = store.load().await.unwrap().unwrap();
        assert_eq!(persisted.company_id.as_deref(), Some("C1"));
        assert!(persisted.auth_state.is_some());
        assert_eq!(
            persisted.current_step,
            WorkflowStep::AwaitingAuthorization
        );
    }

    #[tokio::test]
    async fn initiate_without_company_fails_locally() {
        let (broker, store) = broker_with(StubBackend::default());
        let mut session = OnboardingSession::new();

        let err = broker.initiate(&mut session).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn complete_succeeds_and_sets_grant() {
        let (broker, store) = broker_with(StubBackend::default());
        let mut session = registered_session();
        broker.initiate(&mut session).await.unwrap();
        let state = session.auth_state.clone();

        let params = CallbackParams {
            code: Some("X".to_string()),
            state,
            error: None,
        };
        broker.complete(&mut session, &params).await.unwrap();

        assert!(session.authorization_granted);
        assert!(session.auth_state.is_none());
        let persisted = store.load().await.unwrap().unwrap();
        assert!(persisted.authorization_granted);
    }

    #[tokio::test]
    async fn complete_with_provider_error_is_denied_and_preserves_session() {
        let (broker, _store) = broker_with(StubBackend::default());
        let mut session = registered_session();
        broker.initiate(&mut session).await.unwrap();
        let before = session.clone();

        let params = CallbackParams {
            code: None,
            state: session.auth_state.clone(),
            error: Some("access_denied".to_string()),
        };
        let err = broker.complete(&mut session, &params).await.unwrap_err();

        assert!(matches!(err, WorkflowError::AuthorizationDenied(_)));
        assert_eq!(session.company_id, before.company_id);
        assert_eq!(session.current_step, WorkflowStep::AwaitingAuthorization);
        assert!(!session.authorization_granted);
        // Pending state is kept so the user may retry initiate.
        assert_eq!(session.auth_state, before.auth_state);
    }

    #[tokio::test]
    async fn complete_without_pending_context_is_rejected_without_mutation() {
        let (broker, store) = broker_with(StubBackend::default());
        let mut session = registered_session();
        // No initiate — no pending auth_state.
        let params = CallbackParams {
            code: Some("X".to_string()),
            state: Some("whatever".to_string()),
            error: None,
        };
        let err = broker.complete(&mut session, &params).await.unwrap_err();

        assert!(matches!(err, WorkflowError::AuthorizationMissingContext));
        assert!(!session.authorization_granted);
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replayed_state_is_rejected() {
        let (broker, _store) = broker_with(StubBackend::default());
        let mut session = registered_session();
        broker.initiate(&mut session).await.unwrap();

        let params = CallbackParams {
            code: Some("X".to_string()),
            state: Some("stale-token".to_string()),
            error: None,
        };
        let err = broker.complete(&mut session, &params).await.unwrap_err();
        assert!(matches!(err, WorkflowError::AuthorizationMissingContext));
        assert!(!session.authorization_granted);
    }

    #[tokio::test]
    async fn exchange_failure_leaves_grant_unset() {
        let (broker, _store) = broker_with(StubBackend {
            fail_exchange: true,
            ..Default::default()
        });
        let mut session = registered_session();
        broker.initiate(&mut session).await.unwrap();

        let params = CallbackParams {
            code: Some("X".to_string()),
            state: session.auth_state.clone(),
            error: None,
        };
        let err = broker.complete(&mut session, &params).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Backend(_)));
        assert!(!session.authorization_granted);
        // Context is preserved for a retry.
        assert!(session.auth_state.is_some());
    }

    #[test]
    fn append_query_handles_both_shapes() {
        assert_eq!(
            append_query("https://x.test/a", "state", "s1"),
            "https://x.test/a?state=s1"
        );
        assert_eq!(
            append_query("https://x.test/a?b=1", "state", "s1"),
            "https://x.test/a?b=1&state=s1"
        );
    }
}
