//! HTTP request handlers

use axum::{
    Router, middleware,
    routing::{get, post},
};

pub mod auth;
pub mod health;
pub mod pets;
pub mod users;
pub mod ws;

use crate::state::AppState;

/// Build all API routes
pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/users", post(users::create_user))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh_token))
        // The socket authenticates itself before the upgrade
        .route("/ws", get(ws::upgrade));

    let protected = Router::new()
        .route("/pets", post(pets::create_pet))
        .route("/pets/co-owner", post(pets::add_co_owner))
        .layer(middleware::from_fn_with_state(
            state,
            crate::middleware::require_auth,
        ));

    public.merge(protected)
}
