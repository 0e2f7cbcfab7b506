//! Process settings from the environment. Binaries load `.env` before calling `from_env`.

use crate::error::ConfigError;
use std::net::SocketAddr;

pub const DEFAULT_CONFIG_PATH: &str = "crud.json";
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Settings {
    /// When unset the in-memory store is used.
    pub database_url: Option<String>,
    pub config_path: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub body_limit: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = env_or("BIND_ADDR", "127.0.0.1:3000")
            .parse()
            .map_err(|e| ConfigError::Load(format!("BIND_ADDR: {}", e)))?;
        let max_connections = env_or("DB_MAX_CONNECTIONS", "5")
            .parse()
            .map_err(|e| ConfigError::Load(format!("DB_MAX_CONNECTIONS: {}", e)))?;
        let body_limit = match std::env::var("BODY_LIMIT_BYTES") {
            Ok(v) => v
                .parse()
                .map_err(|e| ConfigError::Load(format!("BODY_LIMIT_BYTES: {}", e)))?,
            Err(_) => DEFAULT_BODY_LIMIT,
        };
        Ok(Settings {
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            config_path: env_or("CRUD_CONFIG_PATH", DEFAULT_CONFIG_PATH),
            bind_addr,
            max_connections,
            body_limit,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
