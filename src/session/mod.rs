//! Durable onboarding session — the one shared mutable resource of the
//! workflow.

pub mod libsql;
pub mod model;
pub mod store;

pub use libsql::LibSqlStore;
pub use model::{OnboardingSession, WorkflowStep};
pub use store::{MemoryStore, SessionStore};
