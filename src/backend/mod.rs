//! Backend collaborator — the request/response contracts the workflow
//! consumes. Schema inference, credential generation internals, and mail
//! transport all live behind this boundary.

pub mod http;
pub mod types;

use async_trait::async_trait;

use crate::error::BackendError;
use types::{
    Company, CompanyProfile, DatabaseDescriptor, DocumentRef, PolicyEntry, ProvisioningReport,
};

/// Abstract backend interface, one method per remote operation.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Register a new company. Called at most once per session.
    async fn register_company(&self, profile: &CompanyProfile) -> Result<Company, BackendError>;

    /// Build the outbound authorization redirect. Returns the target URL;
    /// the caller performs the navigation.
    async fn initiate_authorization(&self, company_id: &str) -> Result<String, BackendError>;

    /// Exchange the one-time callback code for a durable credential held
    /// by the backend. The workflow only sees an opaque acknowledgment.
    async fn exchange_authorization_code(
        &self,
        company_id: &str,
        code: &str,
    ) -> Result<(), BackendError>;

    /// Ingest one text policy. Returns the policy record id.
    async fn add_policy_text(
        &self,
        company_id: &str,
        entry: &PolicyEntry,
    ) -> Result<String, BackendError>;

    /// Upload one policy document. Returns the policy record id.
    async fn add_policy_document(
        &self,
        company_id: &str,
        document: &DocumentRef,
    ) -> Result<String, BackendError>;

    /// Bind an employee-data source. Returns the connection id, or
    /// `BackendError::Rejected` when the source cannot be read.
    async fn bind_database(
        &self,
        company_id: &str,
        descriptor: &DatabaseDescriptor,
    ) -> Result<String, BackendError>;

    /// Bulk-provision credentials for every employee the backend resolves
    /// from the bound source. Not safely repeatable.
    async fn provision_credentials(
        &self,
        company_id: &str,
        database_id: &str,
    ) -> Result<ProvisioningReport, BackendError>;
}
