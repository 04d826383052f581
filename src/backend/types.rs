//! Wire types shared with the backend collaborator.

use serde::{Deserialize, Serialize};

/// Company profile collected from the user before registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    pub contact_name: String,
    pub contact_email: String,
    /// Where employees are pointed for password resets and login trouble.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_link: Option<String>,
}

/// A registered company. Created exactly once; immutable from the
/// workflow's perspective afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    pub contact_name: String,
    pub contact_email: String,
}

/// A text policy entry. Entries missing title or content are skipped by
/// the ingestor, not rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyEntry {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub content: String,
}

/// A policy document to upload. Each upload is one independent network
/// operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentRef {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub file_name: String,
    #[serde(default)]
    pub content: Vec<u8>,
}

/// Descriptor for the employee-data source to bind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseDescriptor {
    /// Source kind, e.g. "google_sheet".
    pub source_type: String,
    /// Spreadsheet id or full link; the backend extracts what it needs.
    pub locator: String,
    /// Optional sub-selector, e.g. a worksheet name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subselector: Option<String>,
}

/// One employee the provisioner could not deliver to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningFailure {
    pub employee_ref: String,
    pub reason: String,
}

/// Aggregate result of the bulk provisioning call. Produced once,
/// terminal, never recomputed in place. `delivered_count <=
/// generated_count` always holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningReport {
    pub company_id: String,
    pub database_id: String,
    pub generated_count: u32,
    pub delivered_count: u32,
    #[serde(default)]
    pub failures: Vec<ProvisioningFailure>,
}

impl ProvisioningReport {
    /// Whether every generated credential was also delivered.
    pub fn fully_delivered(&self) -> bool {
        self.delivered_count == self.generated_count && self.failures.is_empty()
    }
}
