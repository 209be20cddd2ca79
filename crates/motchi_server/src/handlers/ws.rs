//! WebSocket entry point
//!
//! The handshake is authenticated before the protocol upgrade: an invalid
//! credential gets a plain 401 and no socket ever opens. Browser clients
//! cannot set headers on a WebSocket handshake, so the access token is also
//! accepted as a `token` query parameter.

use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::HeaderMap,
    response::Response,
};
use motchi_api::ApiError;
use motchi_core::{IdentityResolver, PetStore};
use serde::Deserialize;
use std::sync::Arc;

use crate::{middleware::bearer_token, session::Session, state::AppState};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

pub async fn upgrade(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let credential = bearer_token(&headers)
        .or(query.token.as_deref())
        .ok_or_else(|| ApiError::unauthorized("Missing access token"))?;

    let user_id = state.resolver.resolve(credential).await?;

    let session = Session::new(
        user_id,
        state.store.clone() as Arc<dyn PetStore>,
        state.registry.clone(),
        state.config.heartbeat_interval(),
    );

    tracing::debug!(user_id = %user_id, conn_id = %session.conn_id(), "upgrading connection");

    Ok(ws.on_upgrade(move |socket| session.run(socket)))
}
