//! `SessionStore` trait — durable key-value persistence for the session.
//!
//! The store is the only shared mutable resource in the workflow. Writes
//! follow persist-before-transition so recovery after an interruption is
//! deterministic.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::session::model::OnboardingSession;

/// Settings keys used for session persistence.
pub mod keys {
    /// Key for the OnboardingSession JSON blob in the settings table.
    pub const SESSION: &str = "onboarding_session";
    /// Default user id (single-tenant deployment).
    pub const DEFAULT_USER: &str = "default";
}

/// Backend-agnostic durable store for the one active session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the persisted session, if any.
    async fn load(&self) -> Result<Option<OnboardingSession>, StoreError>;

    /// Persist the session, replacing any previous value.
    async fn save(&self, session: &OnboardingSession) -> Result<(), StoreError>;

    /// Remove the persisted session. Returns whether one existed.
    async fn clear(&self) -> Result<bool, StoreError>;
}

/// In-memory store for tests and ephemeral runs.
pub struct MemoryStore {
    inner: Mutex<Option<serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self) -> Result<Option<OnboardingSession>, StoreError> {
        let guard = self.inner.lock().expect("MemoryStore mutex poisoned");
        match guard.as_ref() {
            Some(value) => {
                let session = serde_json::from_value(value.clone())
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, session: &OnboardingSession) -> Result<(), StoreError> {
        let value = serde_json::to_value(session)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut guard = self.inner.lock().expect("MemoryStore mutex poisoned");
        *guard = Some(value);
        Ok(())
    }

    async fn clear(&self) -> Result<bool, StoreError> {
        let mut guard = self.inner.lock().expect("MemoryStore mutex poisoned");
        Ok(guard.take().is_some())
    }
}
