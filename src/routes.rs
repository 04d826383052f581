//! REST surface for the onboarding workflow.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::auth::broker::CallbackParams;
use crate::backend::types::{CompanyProfile, DatabaseDescriptor, DocumentRef, PolicyEntry};
use crate::error::WorkflowError;
use crate::workflow::orchestrator::{Advance, Orchestrator};

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub orchestrator: Arc<Orchestrator>,
}

/// Map workflow errors onto HTTP statuses. Blocking errors become error
/// responses; partial failures never reach here — they ride inside the
/// step's result body.
fn error_response(err: WorkflowError) -> Response {
    let status = match &err {
        WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
        WorkflowError::StepInFlight
        | WorkflowError::OutOfOrder { .. }
        | WorkflowError::AlreadyProvisioned => StatusCode::CONFLICT,
        WorkflowError::AuthorizationDenied(_) => StatusCode::FORBIDDEN,
        WorkflowError::AuthorizationMissingContext => StatusCode::GONE,
        WorkflowError::ConnectionRejected(_) | WorkflowError::Backend(_) => {
            StatusCode::BAD_GATEWAY
        }
        WorkflowError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}

/// GET /api/onboarding/status
async fn get_status(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    Json(state.orchestrator.status().await)
}

/// POST /api/onboarding/profile
async fn post_profile(
    State(state): State<OnboardingRouteState>,
    Json(profile): Json<CompanyProfile>,
) -> Response {
    match state.orchestrator.advance(Advance::Profile(profile)).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/onboarding/authorize — returns the redirect target; the
/// browser performs the navigation.
async fn post_authorize(State(state): State<OnboardingRouteState>) -> Response {
    match state.orchestrator.initiate_authorization().await {
        Ok(redirect) => Json(serde_json::json!({ "redirect": redirect })).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/onboarding/callback — the provider's redirect lands here.
async fn get_callback(
    State(state): State<OnboardingRouteState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    match state.orchestrator.complete_authorization(&params).await {
        Ok(status) => Json(status).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct PoliciesBody {
    #[serde(default)]
    texts: Vec<PolicyEntry>,
    #[serde(default)]
    documents: Vec<DocumentRef>,
}

/// POST /api/onboarding/policies
async fn post_policies(
    State(state): State<OnboardingRouteState>,
    Json(body): Json<PoliciesBody>,
) -> Response {
    let action = Advance::Policies {
        texts: body.texts,
        documents: body.documents,
    };
    match state.orchestrator.advance(action).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/onboarding/database
async fn post_database(
    State(state): State<OnboardingRouteState>,
    Json(descriptor): Json<DatabaseDescriptor>,
) -> Response {
    match state.orchestrator.advance(Advance::Database(descriptor)).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/onboarding/finalize
async fn post_finalize(State(state): State<OnboardingRouteState>) -> Response {
    match state.orchestrator.advance(Advance::Finalize).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/onboarding/reset
async fn post_reset(State(state): State<OnboardingRouteState>) -> Response {
    match state.orchestrator.reset().await {
        Ok(()) => Json(serde_json::json!({ "reset": true })).into_response(),
        Err(e) => error_response(e),
    }
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/api/onboarding/status", get(get_status))
        .route("/api/onboarding/profile", post(post_profile))
        .route("/api/onboarding/authorize", post(post_authorize))
        .route("/api/onboarding/callback", get(get_callback))
        .route("/api/onboarding/policies", post(post_policies))
        .route("/api/onboarding/database", post(post_database))
        .route("/api/onboarding/finalize", post(post_finalize))
        .route("/api/onboarding/reset", post(post_reset))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
