//! HTTP backend client — talks to the onboarding API over JSON/multipart.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::backend::Backend;
use crate::backend::types::{
    Company, CompanyProfile, DatabaseDescriptor, DocumentRef, PolicyEntry, ProvisioningReport,
};
use crate::error::BackendError;

/// Backend client over `reqwest`.
pub struct HttpBackend {
    base_url: String,
    api_token: Option<SecretString>,
    client: reqwest::Client,
}

/// Response carrying just a record id.
#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

/// Response carrying the authorization redirect target.
#[derive(Debug, Deserialize)]
struct RedirectResponse {
    redirect_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, api_token: Option<SecretString>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Attach the bearer token when one is configured.
    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Send a request and deserialize a 2xx JSON body, mapping failure
    /// statuses onto the backend error taxonomy.
    async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        builder: RequestBuilder,
    ) -> Result<T, BackendError> {
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|e| BackendError::RequestFailed {
                operation: operation.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| BackendError::InvalidResponse {
                    operation: operation.to_string(),
                    reason: e.to_string(),
                });
        }

        let body = response.text().await.unwrap_or_default();
        // Forbidden / unprocessable mean the backend refused the operation
        // itself (no read access to the source, bad grant), not transport.
        if status == StatusCode::FORBIDDEN || status == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(BackendError::Rejected {
                operation: operation.to_string(),
                reason: body,
            });
        }

        Err(BackendError::UnexpectedStatus {
            operation: operation.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn register_company(&self, profile: &CompanyProfile) -> Result<Company, BackendError> {
        let builder = self
            .client
            .post(self.url("/api/companies/register"))
            .json(profile);
        self.execute("register_company", builder).await
    }

    async fn initiate_authorization(&self, company_id: &str) -> Result<String, BackendError> {
        let builder = self
            .client
            .post(self.url("/api/auth/initiate"))
            .json(&serde_json::json!({ "company_id": company_id }));
        let response: RedirectResponse = self.execute("initiate_authorization", builder).await?;
        Ok(response.redirect_url)
    }

    async fn exchange_authorization_code(
        &self,
        company_id: &str,
        code: &str,
    ) -> Result<(), BackendError> {
        let builder = self
            .client
            .post(self.url("/api/auth/exchange"))
            .json(&serde_json::json!({ "company_id": company_id, "code": code }));
        // The ack body is opaque; only success matters.
        let _ack: serde_json::Value = self.execute("exchange_authorization_code", builder).await?;
        Ok(())
    }

    async fn add_policy_text(
        &self,
        company_id: &str,
        entry: &PolicyEntry,
    ) -> Result<String, BackendError> {
        let builder = self
            .client
            .post(self.url(&format!("/api/companies/{company_id}/policies/text")))
            .json(entry);
        let response: IdResponse = self.execute("add_policy_text", builder).await?;
        Ok(response.id)
    }

    async fn add_policy_document(
        &self,
        company_id: &str,
        document: &DocumentRef,
    ) -> Result<String, BackendError> {
        let part = Part::bytes(document.content.clone())
            .file_name(document.file_name.clone())
            .mime_str("application/octet-stream")
            .map_err(|e| BackendError::RequestFailed {
                operation: "add_policy_document".to_string(),
                reason: e.to_string(),
            })?;
        let form = Form::new()
            .text("title", document.title.clone())
            .text("description", document.description.clone().unwrap_or_default())
            .part("file", part);

        let builder = self
            .client
            .post(self.url(&format!("/api/companies/{company_id}/policies/document")))
            .multipart(form);
        let response: IdResponse = self.execute("add_policy_document", builder).await?;
        Ok(response.id)
    }

    async fn bind_database(
        &self,
        company_id: &str,
        descriptor: &DatabaseDescriptor,
    ) -> Result<String, BackendError> {
        let builder = self
            .client
            .post(self.url(&format!("/api/companies/{company_id}/databases")))
            .json(descriptor);
        let response: IdResponse = self.execute("bind_database", builder).await?;
        Ok(response.id)
    }

    async fn provision_credentials(
        &self,
        company_id: &str,
        database_id: &str,
    ) -> Result<ProvisioningReport, BackendError> {
        let builder = self.client.post(self.url(&format!(
            "/api/companies/{company_id}/databases/{database_id}/provision"
        )));
        self.execute("provision_credentials", builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let backend = HttpBackend::new("http://localhost:8000/", None);
        assert_eq!(
            backend.url("/api/companies/register"),
            "http://localhost:8000/api/companies/register"
        );
    }
}
