//! Service configuration, built from environment variables.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Service configuration.
#[derive(Clone)]
pub struct ServiceConfig {
    /// Base URL of the backend API (required).
    pub backend_url: String,
    /// Optional bearer token for backend calls.
    pub api_token: Option<SecretString>,
    /// Path of the local session database.
    pub db_path: String,
    /// Port the REST server binds to.
    pub port: u16,
}

impl ServiceConfig {
    /// Build config from `HR_ONBOARD_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend_url = std::env::var("HR_ONBOARD_BACKEND_URL")
            .map_err(|_| ConfigError::MissingEnvVar("HR_ONBOARD_BACKEND_URL".into()))?;

        let api_token = std::env::var("HR_ONBOARD_API_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .map(SecretString::from);

        let db_path = std::env::var("HR_ONBOARD_DB_PATH")
            .unwrap_or_else(|_| "./data/hr-onboard.db".to_string());

        let port = match std::env::var("HR_ONBOARD_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "HR_ONBOARD_PORT".into(),
                message: format!("'{raw}' is not a valid port"),
            })?,
            Err(_) => 8080,
        };

        Ok(Self {
            backend_url,
            api_token,
            db_path,
            port,
        })
    }
}
