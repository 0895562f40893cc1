//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use resume_shared::constants::{DEFAULT_HTTP_PORT, DEFAULT_TOKEN_TTL_HOURS};

/// Development-only signing secret. A warning is logged when it is in use.
const DEV_JWT_SECRET: &str = "jwt-secret-key-change-in-production";

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:5000`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: unset, meaning the platform data directory.
    pub database_path: Option<PathBuf>,

    /// HMAC secret used to sign access tokens.
    /// Env: `JWT_SECRET_KEY`
    pub jwt_secret: String,

    /// Access token lifetime in hours.
    /// Env: `JWT_EXPIRES_HOURS`
    /// Default: `8`
    pub token_ttl_hours: i64,

    /// Allowed CORS origins; `*` allows any origin.
    /// Env: `CORS_ORIGINS` (comma-separated)
    /// Default: `http://localhost:5173`
    pub cors_origins: Vec<String>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("database_path", &self.database_path)
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            cors_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = lookup("DATABASE_PATH").filter(|p| !p.is_empty()) {
            config.database_path = Some(PathBuf::from(path));
        }

        match lookup("JWT_SECRET_KEY").filter(|s| !s.is_empty()) {
            Some(secret) => config.jwt_secret = secret,
            None => tracing::warn!("JWT_SECRET_KEY not set, using development secret"),
        }

        if let Some(val) = lookup("JWT_EXPIRES_HOURS") {
            match val.parse::<i64>() {
                Ok(hours) if hours > 0 => config.token_ttl_hours = hours,
                _ => tracing::warn!(value = %val, "Invalid JWT_EXPIRES_HOURS, using default"),
            }
        }

        if let Some(origins) = lookup("CORS_ORIGINS") {
            let origins: Vec<String> = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
            if !origins.is_empty() {
                config.cors_origins = origins;
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}
