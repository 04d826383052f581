//! Credential provisioner — bulk generation and delivery, best-effort.

use std::sync::Arc;

use tracing::{info, warn};

use crate::backend::Backend;
use crate::backend::types::ProvisioningReport;
use crate::error::{BackendError, WorkflowError};

/// Runs the bulk provisioning call. Partial failure is terminal-success:
/// the aggregate report carries the failures, it is never thrown.
///
/// NOT safely repeatable — a repeat for the same database id may
/// regenerate and redeliver credentials. The orchestrator enforces the
/// once-per-session guard.
pub struct CredentialProvisioner {
    backend: Arc<dyn Backend>,
}

impl CredentialProvisioner {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn provision(
        &self,
        company_id: &str,
        database_id: &str,
    ) -> Result<ProvisioningReport, WorkflowError> {
        let report = self
            .backend
            .provision_credentials(company_id, database_id)
            .await?;

        // delivered <= generated must hold for any well-formed report.
        if report.delivered_count > report.generated_count {
            return Err(WorkflowError::Backend(BackendError::InvalidResponse {
                operation: "provision_credentials".to_string(),
                reason: format!(
                    "delivered_count {} exceeds generated_count {}",
                    report.delivered_count, report.generated_count
                ),
            }));
        }

        if report.failures.is_empty() {
            info!(
                company_id = %company_id,
                generated = report.generated_count,
                delivered = report.delivered_count,
                "Provisioning complete"
            );
        } else {
            warn!(
                company_id = %company_id,
                generated = report.generated_count,
                delivered = report.delivered_count,
                failed = report.failures.len(),
                "Provisioning complete with partial failures"
            );
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::backend::types::{
        Company, CompanyProfile, DatabaseDescriptor, DocumentRef, PolicyEntry,
        ProvisioningFailure,
    };

    struct StubBackend {
        generated: u32,
        delivered: u32,
    }

    #[async_trait]
    impl Backend for StubBackend {
        async fn register_company(
            &self,
            _profile: &CompanyProfile,
        ) -> Result<Company, BackendError> {
            unimplemented!("not used in provisioner tests")
        }

        async fn initiate_authorization(&self, _company_id: &str) -> Result<String, BackendError> {
            unimplemented!("not used in provisioner tests")
        }

        async fn exchange_authorization_code(
            &self,
            _company_id: &str,
            _code: &str,
        ) -> Result<(), BackendError> {
            unimplemented!("not used in provisioner tests")
        }

        async fn add_policy_text(
            &self,
            _company_id: &str,
            _entry: &PolicyEntry,
        ) -> Result<String, BackendError> {
            unimplemented!("not used in provisioner tests")
        }

        async fn add_policy_document(
            &self,
            _company_id: &str,
            _document: &DocumentRef,
        ) -> Result<String, BackendError> {
            unimplemented!("not used in provisioner tests")
        }

        async fn bind_database(
            &self,
            _company_id: &str,
            _descriptor: &DatabaseDescriptor,
        ) -> Result<String, BackendError> {
            unimplemented!("not used in provisioner tests")
        }

        async fn provision_credentials(
            &self,
            company_id: &str,
            database_id: &str,
        ) -> Result<ProvisioningReport, BackendError> {
            Ok(ProvisioningReport {
                company_id: company_id.to_string(),
                database_id: database_id.to_string(),
                generated_count: self.generated,
                delivered_count: self.delivered,
                failures: vec![ProvisioningFailure {
                    employee_ref: "E7".to_string(),
                    reason: "invalid_email".to_string(),
                }],
            })
        }
    }

    #[tokio::test]
    async fn partial_failure_is_terminal_success() {
        let provisioner = CredentialProvisioner::new(Arc::new(StubBackend {
            generated: 10,
            delivered: 9,
        }));
        let report = provisioner.provision("C1", "D1").await.unwrap();
        assert_eq!(report.generated_count, 10);
        assert_eq!(report.delivered_count, 9);
        assert_eq!(report.failures.len(), 1);
        assert!(report.delivered_count <= report.generated_count);
    }

    #[tokio::test]
    async fn malformed_report_is_rejected() {
        let provisioner = CredentialProvisioner::new(Arc::new(StubBackend {
            generated: 5,
            delivered: 6,
        }));
        let err = provisioner.provision("C1", "D1").await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Backend(BackendError::InvalidResponse { .. })
        ));
    }
}
