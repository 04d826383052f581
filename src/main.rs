use std::sync::Arc;

use hr_onboard::backend::http::HttpBackend;
use hr_onboard::config::ServiceConfig;
use hr_onboard::notify::CompletionNotifier;
use hr_onboard::routes::{OnboardingRouteState, onboarding_routes};
use hr_onboard::session::libsql::LibSqlStore;
use hr_onboard::session::store::SessionStore;
use hr_onboard::workflow::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ServiceConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export HR_ONBOARD_BACKEND_URL=http://localhost:8000");
        std::process::exit(1);
    });

    eprintln!("🏢 HR Onboard v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend: {}", config.backend_url);
    eprintln!("   API: http://0.0.0.0:{}/api/onboarding/status", config.port);

    // ── Session store ────────────────────────────────────────────────
    let db_path = std::path::Path::new(&config.db_path);
    let store: Arc<dyn SessionStore> =
        Arc::new(LibSqlStore::new_local(db_path).await.unwrap_or_else(|e| {
            eprintln!("Error: Failed to open session store at {}: {e}", config.db_path);
            std::process::exit(1);
        }));
    eprintln!("   Session store: {}", config.db_path);

    // ── Backend client ───────────────────────────────────────────────
    let backend = Arc::new(HttpBackend::new(
        config.backend_url.clone(),
        config.api_token.clone(),
    ));

    // ── Completion notifier (optional) ───────────────────────────────
    let notifier = CompletionNotifier::from_env();
    eprintln!(
        "   Notifier: {}",
        if notifier.is_some() { "enabled" } else { "disabled" }
    );

    // ── Orchestrator ─────────────────────────────────────────────────
    let orchestrator = Arc::new(Orchestrator::resume(store, backend, notifier).await?);
    let status = orchestrator.status().await;
    eprintln!("   Session step: {}\n", status.step);

    // ── REST server ──────────────────────────────────────────────────
    let app = onboarding_routes(OnboardingRouteState { orchestrator });
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Onboarding server started");
    axum::serve(listener, app).await?;

    Ok(())
}
