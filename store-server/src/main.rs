//! store-server: order lifecycle and payment backend for the online store
//!
//! Long-running service that:
//! - Handles customer checkout and order self-service
//! - Provides the staff order management API (JWT authenticated)
//! - Reconciles gateway payment callbacks against orders and stock
//! - Keeps an immutable audit trail of every order action

mod api;
mod auth;
mod config;
mod db;
mod error;
mod notify;
mod orders;
mod state;
mod utils;
mod vnpay;

use config::Config;
use state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "store_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting store-server (env: {})", config.environment);

    // Initialize application state
    let state = AppState::new(&config).await?;

    // Build router
    let app = api::create_router(state);

    // Start HTTP server
    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("store-server HTTP listening on {http_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
