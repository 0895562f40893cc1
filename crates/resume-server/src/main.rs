//! # resume-server
//!
//! HTTP backend for weekly church service reports.
//!
//! This binary provides:
//! - **Account management** with argon2 password hashes and signed bearer
//!   tokens (admin, section and viewer roles)
//! - **Report submission** with lenient input normalization and full field
//!   validation
//! - **Weekly aggregates** per section, re-derived from the reports on every
//!   change
//! - **PDF export** of single reports and report summaries
//! - **REST API** (axum) for all of the above

mod api;
mod auth;
mod config;
mod error;
mod pdf;
mod reports;
mod users;

#[cfg(test)]
mod test_support;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use resume_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,resume_server=debug,resume_store=debug")
            }),
        )
        .init();

    info!("Starting ResumeSection server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the database (runs pending migrations)
    // -----------------------------------------------------------------------
    let db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    info!(path = ?db.path(), "Database ready");

    if db.count_users()? == 0 {
        warn!("No users yet: the first POST /register creates an administrator without a token");
    }

    let http_addr = config.http_addr;
    let app_state = AppState::new(db, config);

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
