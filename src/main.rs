use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod aws_clients;
mod config;
mod domain;
mod errors;
mod handlers;
mod location;
mod models;
mod pins;
mod repositories;
mod routes;
mod startup;
mod storage;
#[cfg(test)]
mod test_support;

use crate::{
    auth::TokenIssuer,
    config::Config,
    domain::CredentialVerifier,
    errors::AppError,
    pins::PinService,
};

/// AppState holds shared resources for the web server.
pub struct AppState {
    pub pins: PinService,
    pub credentials: Arc<dyn CredentialVerifier>,
    pub tokens: TokenIssuer,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "map_pins=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Missing secrets or connection strings stop the process here.
    let config = Config::load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        AppError::from(e)
    })?;
    tracing::info!(?config, "Configuration loaded");

    let (state, options) = startup::build_state(&config).await?;
    let app = routes::create_router(state, &options);

    tracing::info!("Server listening on http://{}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
