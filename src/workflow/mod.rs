//! Workflow orchestration — the onboarding state machine and its step
//! executors.

pub mod binder;
pub mod orchestrator;
pub mod policies;
pub mod provisioner;
pub mod registrar;

pub use binder::DatabaseBinder;
pub use orchestrator::{Advance, Orchestrator, SessionStatus, StepOutcome};
pub use policies::{IngestionReport, PolicyIngestor};
pub use provisioner::CredentialProvisioner;
pub use registrar::CompanyRegistrar;
