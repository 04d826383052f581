//! Database binder — connects the employee-data source.

use std::sync::Arc;

use tracing::info;

use crate::backend::Backend;
use crate::backend::types::DatabaseDescriptor;
use crate::error::{BackendError, WorkflowError};

/// Binds exactly one employee-data source per session. A later successful
/// call replaces the stored connection; there is no merge.
pub struct DatabaseBinder {
    backend: Arc<dyn Backend>,
}

impl DatabaseBinder {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Bind the described source and return the connection id.
    ///
    /// `ConnectionRejected` is surfaced verbatim and never retried here:
    /// remediation (granting read access to the source) happens outside
    /// this workflow, after which the user retries `bind`.
    pub async fn bind(
        &self,
        company_id: &str,
        descriptor: &DatabaseDescriptor,
    ) -> Result<String, WorkflowError> {
        if descriptor.locator.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "A source locator is required to bind a database".into(),
            ));
        }

        let database_id = self
            .backend
            .bind_database(company_id, descriptor)
            .await
            .map_err(|e| match e {
                BackendError::Rejected { reason, .. } => WorkflowError::ConnectionRejected(reason),
                other => WorkflowError::Backend(other),
            })?;

        info!(
            company_id = %company_id,
            database_id = %database_id,
            source_type = %descriptor.source_type,
            "Database bound"
        );
        Ok(database_id)
    }
}
