//! Completion notification — best-effort summary email to the company
//! contact once provisioning finishes.

use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::backend::types::ProvisioningReport;

/// SMTP configuration for the completion notifier, built from environment
/// variables.
#[derive(Clone)]
pub struct NotifierConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
}

impl NotifierConfig {
    /// Build config from environment variables.
    /// Returns `None` if `HR_ONBOARD_SMTP_HOST` is not set (notifier disabled).
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("HR_ONBOARD_SMTP_HOST").ok()?;

        let smtp_port: u16 = std::env::var("HR_ONBOARD_SMTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(587);

        let username = std::env::var("HR_ONBOARD_SMTP_USERNAME").unwrap_or_default();
        let password =
            SecretString::from(std::env::var("HR_ONBOARD_SMTP_PASSWORD").unwrap_or_default());
        let from_address =
            std::env::var("HR_ONBOARD_SMTP_FROM").unwrap_or_else(|_| username.clone());

        Some(Self {
            smtp_host,
            smtp_port,
            username,
            password,
            from_address,
        })
    }
}

/// Sends the onboarding-complete summary. Failures are logged and never
/// block the workflow reaching Complete.
pub struct CompletionNotifier {
    config: NotifierConfig,
}

impl CompletionNotifier {
    pub fn new(config: NotifierConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Option<Self> {
        NotifierConfig::from_env().map(Self::new)
    }

    /// Send the summary email. Best-effort: errors are logged, not
    /// propagated.
    pub fn notify_completion(
        &self,
        to_email: &str,
        company_name: &str,
        report: &ProvisioningReport,
    ) {
        let subject = format!("Onboarding complete - {company_name}");
        let body = summary_body(company_name, report);

        if let Err(e) = self.send(to_email, &subject, &body) {
            warn!(to = %to_email, error = %e, "Completion notification failed");
        } else {
            info!(to = %to_email, "Completion notification sent");
        }
    }

    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        let creds = Credentials::new(
            self.config.username.clone(),
            self.config.password.expose_secret().to_string(),
        );

        let transport = SmtpTransport::relay(&self.config.smtp_host)
            .map_err(|e| format!("SMTP relay error: {e}"))?
            .port(self.config.smtp_port)
            .credentials(creds)
            .build();

        let email = Message::builder()
            .from(
                self.config
                    .from_address
                    .parse()
                    .map_err(|e| format!("Invalid from address: {e}"))?,
            )
            .to(to.parse().map_err(|e| format!("Invalid to address: {e}"))?)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| format!("Failed to build message: {e}"))?;

        transport
            .send(&email)
            .map_err(|e| format!("SMTP send failed: {e}"))?;
        Ok(())
    }
}

fn summary_body(company_name: &str, report: &ProvisioningReport) -> String {
    let mut lines = vec![
        format!("Onboarding for {company_name} is complete."),
        String::new(),
        format!("Credentials generated: {}", report.generated_count),
        format!("Credentials delivered: {}", report.delivered_count),
    ];
    if !report.failures.is_empty() {
        lines.push(format!("Delivery failures: {}", report.failures.len()));
        for failure in &report.failures {
            lines.push(format!("  - {}: {}", failure.employee_ref, failure.reason));
        }
        lines.push("Failed deliveries can be retried from the admin console.".to_string());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::ProvisioningFailure;

    #[test]
    fn summary_lists_failures() {
        let report = ProvisioningReport {
            company_id: "C1".to_string(),
            database_id: "D1".to_string(),
            generated_count: 10,
            delivered_count: 9,
            failures: vec![ProvisioningFailure {
                employee_ref: "E7".to_string(),
                reason: "invalid_email".to_string(),
            }],
        };
        let body = summary_body("Acme", &report);
        assert!(body.contains("Acme"));
        assert!(body.contains("generated: 10"));
        assert!(body.contains("delivered: 9"));
        assert!(body.contains("E7: invalid_email"));
    }

    #[test]
    fn summary_omits_failure_section_when_clean() {
        let report = ProvisioningReport {
            company_id: "C1".to_string(),
            database_id: "D1".to_string(),
            generated_count: 3,
            delivered_count: 3,
            failures: Vec::new(),
        };
        let body = summary_body("Acme", &report);
        assert!(!body.contains("failures"));
    }
}
