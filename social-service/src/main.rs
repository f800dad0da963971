use service_core::{error::AppError, observability::logging::init_tracing};
use social_service::{
    build_router,
    config::SocialConfig,
    db,
    services::{metrics::init_metrics, Database, EmailService, RedisCache, Repositories, CasbinPolicy},
    AppState,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = SocialConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.common.otlp_endpoint.as_deref(),
    );
    init_metrics();

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting social service"
    );

    // A broken rule table must stop startup, not deny every request.
    let policy = CasbinPolicy::load(&config.policy.model_path, &config.policy.path)
        .await
        .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;

    let pool = db::connect(&config.database).await?;
    let repos = Repositories::from_store(Arc::new(Database::new(pool)));
    tracing::info!("Database initialized successfully");

    let cache = RedisCache::new(&config.redis.url).await?;
    tracing::info!("Redis cache initialized");

    let email = EmailService::new(&config.smtp)?;
    tracing::info!("Email service initialized");

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    let state = AppState::new(
        config,
        repos,
        Arc::new(cache),
        Arc::new(email),
        Arc::new(policy),
    );
    let app = build_router(state);

    tracing::info!(address = %addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
