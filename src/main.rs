use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use facilities_auth::config::AuthConfig;
use facilities_auth::observability::init_tracing;
use facilities_auth::services::{
    AuthOrchestrator, AuthStore, ChallengeStore, GoogleProvider, MicrosoftProvider,
    PostgresStore, ProviderRegistry, SmtpEmailSender, TokenIssuer,
};
use facilities_auth::workers::{Janitor, WorkerManager};
use facilities_auth::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();
    let config = Arc::new(AuthConfig::from_env()?);
    init_tracing(&config);

    let store: Arc<dyn AuthStore> =
        Arc::new(PostgresStore::connect(&config.database_url).await?);
    let tokens = Arc::new(TokenIssuer::new(&config.auth_secret, &config.auth_salt)?);
    let challenges = Arc::new(ChallengeStore::new());
    let email = Arc::new(SmtpEmailSender::new(&config.smtp)?);

    let http = reqwest::Client::new();
    let providers = Arc::new(ProviderRegistry::new());
    providers.register(Arc::new(GoogleProvider::new(
        config.google.clone(),
        http.clone(),
    )));
    providers.register(Arc::new(MicrosoftProvider::new(
        config.microsoft.clone(),
        http,
    )));

    let auth = Arc::new(AuthOrchestrator::new(
        store.clone(),
        tokens.clone(),
        challenges.clone(),
        providers,
        email,
        config.default_provider.clone(),
        config.frontend_url.clone(),
    ));

    let mut workers = WorkerManager::new();
    workers.spawn(Box::new(Janitor::new(
        store.clone(),
        challenges,
        Duration::from_secs(config.janitor_interval_seconds),
    )));

    let state = AppState {
        config: config.clone(),
        auth,
        tokens,
        store,
    };
    let router = build_router(state);

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(port = config.port, service = %config.service_name, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    workers.shutdown().await;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
