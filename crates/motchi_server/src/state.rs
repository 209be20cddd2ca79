//! Application state

use std::sync::Arc;

use motchi_core::db::SurrealStore;

use crate::{
    auth::JwtIdentityResolver, config::ServerConfig, error::ServerResult,
    registry::ConnectionRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub store: Arc<SurrealStore>,
    pub registry: Arc<ConnectionRegistry>,
    pub resolver: JwtIdentityResolver,
    pub jwt_encoding_key: jsonwebtoken::EncodingKey,
    pub jwt_decoding_key: jsonwebtoken::DecodingKey,
}

impl AppState {
    pub async fn new(config: ServerConfig) -> ServerResult<Self> {
        let store = Arc::new(SurrealStore::connect(&config.database_url).await?);

        let jwt_encoding_key = jsonwebtoken::EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let jwt_decoding_key = jsonwebtoken::DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let resolver = JwtIdentityResolver::new(jwt_decoding_key.clone());

        Ok(Self {
            config,
            store,
            registry: Arc::new(ConnectionRegistry::new()),
            resolver,
            jwt_encoding_key,
            jwt_decoding_key,
        })
    }
}
