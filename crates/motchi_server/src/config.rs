//! Server configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address (e.g., "127.0.0.1:8080")
    pub bind_address: String,

    /// Database URL
    pub database_url: String,

    /// JWT secret for signing tokens
    pub jwt_secret: String,

    /// Token expiration times
    pub access_token_ttl: u64, // seconds
    pub refresh_token_ttl: u64, // seconds

    /// Seconds between server heartbeat pings on live connections
    pub heartbeat_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            database_url: "mem://".to_string(),
            jwt_secret: "change-me-in-production".to_string(),
            access_token_ttl: 3600,       // 1 hour
            refresh_token_ttl: 604800,    // 7 days
            heartbeat_interval_secs: 60,
        }
    }
}

impl ServerConfig {
    /// Load configuration: `motchi.toml` if present, then `MOTCHI_*`
    /// environment overrides on top.
    pub fn load() -> ServerResult<Self> {
        let mut config = match std::fs::read_to_string("motchi.toml") {
            Ok(contents) => toml::from_str(&contents)
                .map_err(|e| ServerError::Config(format!("invalid motchi.toml: {e}")))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => return Err(e.into()),
        };

        if let Ok(addr) = std::env::var("MOTCHI_BIND_ADDRESS") {
            config.bind_address = addr;
        }
        if let Ok(url) = std::env::var("MOTCHI_DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(secret) = std::env::var("MOTCHI_JWT_SECRET") {
            config.jwt_secret = secret;
        }
        if let Ok(secs) = std::env::var("MOTCHI_HEARTBEAT_INTERVAL_SECS") {
            config.heartbeat_interval_secs = secs
                .parse()
                .map_err(|_| ServerError::Config(format!("bad heartbeat interval: {secs}")))?;
        }

        Ok(config)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }
}
