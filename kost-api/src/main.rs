//! Kost API Server Entry Point
//!
//! Bootstraps configuration, seeds the in-memory property store and starts
//! the Axum HTTP server.

use std::sync::Arc;

use axum::Router;
use kost_api::seed::load_seed_file;
use kost_api::telemetry::{init_tracing, TelemetryConfig};
use kost_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, AppState, AuthConfig, AvailabilityService,
    RoleAuthorizer,
};
use kost_storage::{InMemoryPropertyRepository, SystemClock};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config)?;

    let api_config = ApiConfig::from_env();
    api_config.validate()?;
    let auth_config = AuthConfig::from_env()?;

    let repository = Arc::new(InMemoryPropertyRepository::new());
    if let Some(path) = &api_config.seed_file {
        load_seed_file(path, &repository).await?;
    } else {
        tracing::warn!("KOST_SEED_FILE not set - starting with an empty property store");
    }

    let service = Arc::new(
        AvailabilityService::new(
            repository,
            Arc::new(RoleAuthorizer),
            Arc::new(SystemClock),
            api_config.cache.clone(),
            api_config.service.clone(),
        )
        .map_err(|e| ApiError::internal_error(format!("Failed to initialize service: {}", e)))?,
    );
    service.start_sweeper();

    let app: Router = create_api_router(AppState::new(service.clone()), &api_config, auth_config)?;

    let addr = api_config.bind_addr;
    tracing::info!(%addr, environment = %api_config.environment, "Starting kost API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    service.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
