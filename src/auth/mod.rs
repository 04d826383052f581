//! External authorization — the redirect-based consent exchange.

pub mod broker;

pub use broker::{AuthorizationBroker, CallbackParams};
