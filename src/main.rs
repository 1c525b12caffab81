//! Conjuego · Spanish Conjugation Problem Backend
//!
//! - Axum HTTP API: `GET /api/v1/problem/:id`
//! - Problem store: bundled dataset in memory, or a SQLite collection
//! - Optional bearer authentication against an identity provider
//!
//! Important env variables:
//!   HOST / PORT            : listen address (default 0.0.0.0:3000)
//!   APP_ENV                : "development" (default) or "production"
//!   CONJUEGO_CONFIG_PATH   : path to TOML config ([server], [store], [auth])
//!   PROBLEM_STORE          : "memory" (default) or "sqlite"
//!   PROBLEMS_DATASET_PATH  : JSON dataset; bundled dataset when unset
//!   DATABASE_PATH          : SQLite database file (sqlite backend)
//!   SEED_DATABASE          : "true" to upsert the dataset into the database at startup
//!   STORE_TIMEOUT_MS       : store query timeout (default 5000)
//!   AUTH_ISSUER_URL        : enables bearer auth via the issuer's userinfo endpoint
//!   LOG_LEVEL              : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT             : "pretty" (default) or "json"

mod auth;
mod config;
mod domain;
mod error;
mod logic;
mod protocol;
mod routes;
mod seeds;
mod state;
mod store;
mod telemetry;

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::load_config_from_env;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let cfg = load_config_from_env();
  let addr = cfg.listen_addr()?;

  // Shared application state (problem store, token verifier).
  let state = Arc::new(AppState::from_config(&cfg).await?);
  let store = state.store.clone();

  let app = build_router(state, !cfg.is_production());

  let listener = TcpListener::bind(addr).await?;
  info!(target: "conjuego_backend", %addr, environment = ?cfg.server.environment, store = store.name(), "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  info!(target: "conjuego_backend", "Server stopped; closing problem store");
  if let Err(e) = store.close().await {
    error!(target: "conjuego_backend", error = %e, "Failed to close problem store");
  }
  Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      error!(target: "conjuego_backend", error = %e, "Failed to listen for Ctrl-C");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
      }
      Err(e) => {
        error!(target: "conjuego_backend", error = %e, "Failed to listen for SIGTERM");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
  info!(target: "conjuego_backend", "Shutdown signal received");
}
