//! Motchi server library
//!
//! HTTP and WebSocket backend for the shared-pet game: account and pet
//! management over REST, real-time co-owner synchronization over WebSocket.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod registry;
pub mod session;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use registry::ConnectionRegistry;
pub use state::AppState;

/// Start the Motchi server
pub async fn start_server(config: ServerConfig) -> ServerResult<()> {
    use axum::Router;
    use std::net::SocketAddr;
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    tracing::info!("Starting Motchi server on {}", config.bind_address);

    let state = AppState::new(config.clone()).await?;

    let app = Router::new()
        .nest("/api/v1", handlers::routes(state.clone()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = config.bind_address.parse()?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
