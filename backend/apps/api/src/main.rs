//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors; request-level errors flow through
//! `kernel::error::AppError`.

mod dto;
mod handlers;
mod middleware;
mod state;
mod store;

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vault::{TokenService, TokenSigningKey, derive_message_key};

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,vault=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // The shared message-encryption secret is supplied externally and
    // never generated here; without it the server must not start.
    let crypto_key = env::var("CRYPTO_KEY").context("CRYPTO_KEY must be set in environment")?;
    let message_key = derive_message_key(&crypto_key);

    // Fresh signing key per process: every token issued by a previous
    // run is invalid from this point on.
    let tokens = TokenService::new(TokenSigningKey::generate());
    tracing::info!("Token signing key generated for this process");

    let state = Arc::new(AppState::new(message_key, tokens));

    // CORS configuration (public API, token-authenticated)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        .route("/api/register", post(handlers::register))
        .route("/api/login", post(handlers::login))
        .route("/api/logout", get(handlers::logout))
        .route("/api/user/users", get(handlers::list_users))
        .route(
            "/api/user/messages",
            post(handlers::send_message).get(handlers::get_messages),
        )
        .route("/api/admin/block", post(handlers::block_user))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
