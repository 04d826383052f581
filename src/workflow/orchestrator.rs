//! Workflow orchestrator — the onboarding state machine.
//!
//! Composes the session store, authorization broker, and step executors
//! into the ordered flow. Every side effect follows persist-then-
//! transition so an interruption at any point recovers deterministically
//! from the durable fields.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::auth::broker::{AuthorizationBroker, CallbackParams};
use crate::backend::Backend;
use crate::backend::types::{
    CompanyProfile, DatabaseDescriptor, DocumentRef, PolicyEntry, ProvisioningReport,
};
use crate::error::{Error, WorkflowError};
use crate::notify::CompletionNotifier;
use crate::session::model::{OnboardingSession, WorkflowStep};
use crate::session::store::SessionStore;
use crate::workflow::binder::DatabaseBinder;
use crate::workflow::policies::{IngestionReport, PolicyIngestor};
use crate::workflow::provisioner::CredentialProvisioner;
use crate::workflow::registrar::CompanyRegistrar;

/// A user-driven request to move the workflow forward.
#[derive(Debug)]
pub enum Advance {
    /// Submit the company profile (CollectingProfile → AwaitingAuthorization).
    Profile(CompanyProfile),
    /// Ingest policies. Repeatable while configuring resources.
    Policies {
        texts: Vec<PolicyEntry>,
        documents: Vec<DocumentRef>,
    },
    /// Bind (or re-bind) the employee-data source. Later call wins.
    Database(DatabaseDescriptor),
    /// Finalize: run provisioning and complete the workflow.
    Finalize,
}

/// Result of a successful `advance` call.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    ProfileAccepted { company_id: String },
    PoliciesIngested(IngestionReport),
    DatabaseBound { database_id: String },
    Provisioned(ProvisioningReport),
}

/// Snapshot of the session for display.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub step: WorkflowStep,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    pub authorization_granted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_id: Option<String>,
    pub policy_count: usize,
    pub provisioned: bool,
}

/// The state machine driving the onboarding flow.
pub struct Orchestrator {
    store: Arc<dyn SessionStore>,
    broker: AuthorizationBroker,
    registrar: CompanyRegistrar,
    ingestor: PolicyIngestor,
    binder: DatabaseBinder,
    provisioner: CredentialProvisioner,
    notifier: Option<CompletionNotifier>,
    session: RwLock<OnboardingSession>,
    /// Serializes side-effecting calls. A second concurrent call is
    /// rejected, never queued — a duplicated click must not create two
    /// companies or double-provision.
    advance_gate: Mutex<()>,
}

impl Orchestrator {
    /// Construct the orchestrator, resuming any persisted session.
    ///
    /// If no session exists, a fresh one is created and persisted. If the
    /// persisted step disagrees with the durable artifacts (the in-memory
    /// object was discarded across the authorization redirect, or a crash
    /// hit between persist and transition), the step is recomputed from
    /// the artifacts and repaired in place.
    pub async fn resume(
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn Backend>,
        notifier: Option<CompletionNotifier>,
    ) -> Result<Self, Error> {
        let session = match store.load().await? {
            Some(mut session) => {
                if session.step_is_stale() {
                    let derived = session.derive_step();
                    info!(
                        persisted = %session.current_step,
                        derived = %derived,
                        "Repairing stale session step"
                    );
                    session.current_step = derived;
                    session.touch();
                    store.save(&session).await?;
                } else {
                    info!(step = %session.current_step, "Resumed onboarding session");
                }
                session
            }
            None => {
                let session = OnboardingSession::new();
                store.save(&session).await?;
                info!(session_id = %session.id, "Started new onboarding session");
                session
            }
        };

        Ok(Self {
            store: store.clone(),
            broker: AuthorizationBroker::new(store.clone(), backend.clone()),
            registrar: CompanyRegistrar::new(backend.clone()),
            ingestor: PolicyIngestor::new(backend.clone()),
            binder: DatabaseBinder::new(backend.clone()),
            provisioner: CredentialProvisioner::new(backend),
            notifier,
            session: RwLock::new(session),
            advance_gate: Mutex::new(()),
        })
    }

    /// Current session snapshot for display.
    pub async fn status(&self) -> SessionStatus {
        let session = self.session.read().await;
        SessionStatus {
            step: session.current_step,
            company_id: session.company_id.clone(),
            authorization_granted: session.authorization_granted,
            database_id: session.database_id.clone(),
            policy_count: session.policy_ids.len(),
            provisioned: session.provisioning.is_some(),
        }
    }

    /// A copy of the full session (primarily for tests and diagnostics).
    pub async fn session(&self) -> OnboardingSession {
        self.session.read().await.clone()
    }

    /// Drive the workflow forward. Rejects re-entrant calls while a step
    /// is outstanding.
    pub async fn advance(&self, action: Advance) -> Result<StepOutcome, WorkflowError> {
        let _gate = self
            .advance_gate
            .try_lock()
            .map_err(|_| WorkflowError::StepInFlight)?;
        let mut session = self.session.write().await;

        match action {
            Advance::Profile(profile) => self.advance_profile(&mut session, profile).await,
            Advance::Policies { texts, documents } => {
                self.advance_policies(&mut session, &texts, &documents).await
            }
            Advance::Database(descriptor) => {
                self.advance_database(&mut session, &descriptor).await
            }
            Advance::Finalize => self.advance_finalize(&mut session).await,
        }
    }

    /// Build the authorization redirect target. The caller navigates.
    pub async fn initiate_authorization(&self) -> Result<String, WorkflowError> {
        let _gate = self
            .advance_gate
            .try_lock()
            .map_err(|_| WorkflowError::StepInFlight)?;
        let mut session = self.session.write().await;
        self.broker.initiate(&mut session).await
    }

    /// Handle the provider callback. This is the one transition not
    /// driven by direct user input to `advance`.
    pub async fn complete_authorization(
        &self,
        params: &CallbackParams,
    ) -> Result<SessionStatus, WorkflowError> {
        let _gate = self
            .advance_gate
            .try_lock()
            .map_err(|_| WorkflowError::StepInFlight)?;
        let mut session = self.session.write().await;

        // The broker persists the grant; the transition follows it.
        self.broker.complete(&mut session, params).await?;

        session.current_step = WorkflowStep::ConfiguringResources;
        session.touch();
        self.store.save(&session).await?;
        info!(step = %session.current_step, "Advanced after authorization");

        Ok(SessionStatus {
            step: session.current_step,
            company_id: session.company_id.clone(),
            authorization_granted: session.authorization_granted,
            database_id: session.database_id.clone(),
            policy_count: session.policy_ids.len(),
            provisioned: session.provisioning.is_some(),
        })
    }

    /// Abandon the flow: clears the session entirely. Already-created
    /// backend entities are not deleted — orphan cleanup is an
    /// administrative concern outside this workflow.
    pub async fn reset(&self) -> Result<(), WorkflowError> {
        let _gate = self.advance_gate.lock().await;
        let mut session = self.session.write().await;

        self.store.clear().await?;
        let fresh = OnboardingSession::new();
        self.store.save(&fresh).await?;
        info!(old_session = %session.id, new_session = %fresh.id, "Session reset");
        *session = fresh;
        Ok(())
    }

    // ── Step handlers ───────────────────────────────────────────────

    async fn advance_profile(
        &self,
        session: &mut OnboardingSession,
        profile: CompanyProfile,
    ) -> Result<StepOutcome, WorkflowError> {
        if session.provisioning.is_some() {
            return Err(WorkflowError::AlreadyProvisioned);
        }
        if session.authorization_granted {
            return Err(WorkflowError::OutOfOrder {
                expected: WorkflowStep::CollectingProfile.to_string(),
                actual: session.current_step.to_string(),
            });
        }

        match self.registrar.register_once(session, &profile).await? {
            Some(company) => {
                // Snapshot the form so the flow can resume after the
                // redirect, then persist the id BEFORE the transition.
                if let Ok(serde_json::Value::Object(map)) = serde_json::to_value(&profile) {
                    session.form_snapshot = map;
                }
                session.company_id = Some(company.id.clone());
                session.touch();
                self.store.save(session).await?;

                session.current_step = WorkflowStep::AwaitingAuthorization;
                session.touch();
                self.store.save(session).await?;
                info!(company_id = %company.id, step = %session.current_step, "Profile step done");

                Ok(StepOutcome::ProfileAccepted {
                    company_id: company.id,
                })
            }
            None => {
                // Back-navigation revisit: the id already exists, the
                // transition short-circuits without a network call.
                let company_id = session
                    .company_id
                    .clone()
                    .expect("register_once short-circuits only with an id");
                if session.current_step == WorkflowStep::CollectingProfile {
                    session.current_step = WorkflowStep::AwaitingAuthorization;
                    session.touch();
                    self.store.save(session).await?;
                }
                Ok(StepOutcome::ProfileAccepted { company_id })
            }
        }
    }

    async fn advance_policies(
        &self,
        session: &mut OnboardingSession,
        texts: &[PolicyEntry],
        documents: &[DocumentRef],
    ) -> Result<StepOutcome, WorkflowError> {
        let company_id = self.require_configuring(session)?;

        // Ingestion never blocks the workflow; failures ride in the report.
        let report = self.ingestor.ingest(&company_id, texts, documents).await;

        session.policy_ids.extend(report.policy_ids.iter().cloned());
        session.touch();
        self.store.save(session).await?;

        Ok(StepOutcome::PoliciesIngested(report))
    }

    async fn advance_database(
        &self,
        session: &mut OnboardingSession,
        descriptor: &DatabaseDescriptor,
    ) -> Result<StepOutcome, WorkflowError> {
        let company_id = self.require_configuring(session)?;

        let database_id = self.binder.bind(&company_id, descriptor).await?;

        // At most one binding per session: a later call wins, no merge.
        if let Some(previous) = session.database_id.replace(database_id.clone()) {
            info!(previous = %previous, current = %database_id, "Replaced bound database");
        }
        session.touch();
        self.store.save(session).await?;

        Ok(StepOutcome::DatabaseBound { database_id })
    }

    async fn advance_finalize(
        &self,
        session: &mut OnboardingSession,
    ) -> Result<StepOutcome, WorkflowError> {
        if session.provisioning.is_some() {
            return Err(WorkflowError::AlreadyProvisioned);
        }
        let company_id = self.require_configuring(session)?;
        let database_id = session.database_id.clone().ok_or_else(|| {
            WorkflowError::Validation(
                "A bound employee-data source is required before provisioning".into(),
            )
        })?;

        session.current_step = WorkflowStep::Provisioning;
        session.touch();
        self.store.save(session).await?;

        // Success and partial failure are both terminal-success here; only
        // a hard transport/validation error propagates, leaving the
        // session retryable (no report recorded).
        let report = self.provisioner.provision(&company_id, &database_id).await?;

        session.provisioning = Some(report.clone());
        session.touch();
        self.store.save(session).await?;

        session.current_step = WorkflowStep::Complete;
        session.touch();
        self.store.save(session).await?;

        if let Some(notifier) = &self.notifier {
            let contact = session
                .form_snapshot
                .get("contact_email")
                .and_then(|v| v.as_str());
            let company_name = session
                .form_snapshot
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("your company");
            if let Some(contact) = contact {
                notifier.notify_completion(contact, company_name, &report);
            }
        }

        // The session is destroyed on reaching Complete; the in-memory
        // copy keeps serving status until the next start.
        self.store.clear().await?;
        info!(company_id = %company_id, "Onboarding complete");

        Ok(StepOutcome::Provisioned(report))
    }

    /// Resource configuration requires the registered company and the
    /// authorization grant, and must not have passed Provisioning.
    fn require_configuring(
        &self,
        session: &OnboardingSession,
    ) -> Result<String, WorkflowError> {
        if session.current_step.is_terminal() {
            return Err(WorkflowError::OutOfOrder {
                expected: WorkflowStep::ConfiguringResources.to_string(),
                actual: session.current_step.to_string(),
            });
        }
        match (&session.company_id, session.authorization_granted) {
            (Some(id), true) => Ok(id.clone()),
            _ => Err(WorkflowError::OutOfOrder {
                expected: WorkflowStep::ConfiguringResources.to_string(),
                actual: session.current_step.to_string(),
            }),
        }
    }
}
