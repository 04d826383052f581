//! Policy ingestor — best-effort, never gates the workflow.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::backend::Backend;
use crate::backend::types::{DocumentRef, PolicyEntry};

/// One item the ingestor could not submit.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionFailure {
    pub item: String,
    pub reason: String,
}

/// Aggregate result of one ingestion call. Failures are data here, never
/// errors — policies are supplementary, not gating.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestionReport {
    pub submitted: u32,
    pub succeeded: u32,
    pub skipped: u32,
    pub failures: Vec<IngestionFailure>,
    /// Ids of the records created by this call.
    pub policy_ids: Vec<String>,
}

/// Ingests text policies and policy documents, each item independently.
/// Re-invocation simply adds more records; no dedup at this layer.
pub struct PolicyIngestor {
    backend: Arc<dyn Backend>,
}

impl PolicyIngestor {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Process text entries and document uploads for the company.
    ///
    /// A text entry missing title or content is skipped, not rejected.
    /// A failed upload is recorded and does not block the others.
    pub async fn ingest(
        &self,
        company_id: &str,
        texts: &[PolicyEntry],
        documents: &[DocumentRef],
    ) -> IngestionReport {
        let mut report = IngestionReport::default();

        for entry in texts {
            if entry.title.trim().is_empty() || entry.content.trim().is_empty() {
                report.skipped += 1;
                continue;
            }
            report.submitted += 1;
            match self.backend.add_policy_text(company_id, entry).await {
                Ok(id) => {
                    report.succeeded += 1;
                    report.policy_ids.push(id);
                }
                Err(e) => {
                    warn!(title = %entry.title, error = %e, "Text policy ingestion failed");
                    report.failures.push(IngestionFailure {
                        item: entry.title.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        for document in documents {
            report.submitted += 1;
            match self.backend.add_policy_document(company_id, document).await {
                Ok(id) => {
                    report.succeeded += 1;
                    report.policy_ids.push(id);
                }
                Err(e) => {
                    warn!(file = %document.file_name, error = %e, "Document upload failed");
                    report.failures.push(IngestionFailure {
                        item: document.file_name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        report
    }
}
