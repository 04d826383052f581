//! Error types for the onboarding workflow.

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session store error: {0}")]
    Store(#[from] StoreError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Session store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open store: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Backend request errors — transport and contract failures only.
/// Partial ingestion/provisioning failures are data in the returned
/// reports, not errors.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Request to {operation} failed: {reason}")]
    RequestFailed { operation: String, reason: String },

    #[error("{operation} returned status {status}: {body}")]
    UnexpectedStatus {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {operation}: {reason}")]
    InvalidResponse { operation: String, reason: String },

    /// The backend refused the operation (e.g. it cannot read the
    /// requested source). Distinct from transport failure so callers can
    /// surface it verbatim.
    #[error("{operation} was rejected: {reason}")]
    Rejected { operation: String, reason: String },
}

/// Workflow errors — the blocking taxonomy. Each variant is surfaced to
/// the caller before any state mutation for the step that raised it.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Local precondition failure; no network call was made.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A second `advance` arrived while one was still outstanding.
    #[error("Another step is already in flight for this session")]
    StepInFlight,

    /// The requested action does not match the session's current step.
    #[error("Step {actual} cannot accept this action (expected {expected})")]
    OutOfOrder { expected: String, actual: String },

    /// Provisioning already ran for this session; repeating it could
    /// regenerate and redeliver credentials.
    #[error("Credentials were already provisioned for this session")]
    AlreadyProvisioned,

    /// The provider reported cancellation or an error on the callback.
    /// The session keeps its company id; the user may retry.
    #[error("Authorization was denied by the provider: {0}")]
    AuthorizationDenied(String),

    /// A callback arrived with no pending authorization context (stale
    /// or replayed). The session is left untouched.
    #[error("No pending authorization context for this callback")]
    AuthorizationMissingContext,

    /// The backend could not read the bound source. Retryable only after
    /// out-of-band remediation (e.g. granting access to the sheet).
    #[error("Connection rejected: {0}")]
    ConnectionRejected(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Session store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
