//! HR Onboard — company onboarding and provisioning workflow.

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod notify;
pub mod routes;
pub mod session;
pub mod workflow;
