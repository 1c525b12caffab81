//! Application state: the active problem store, the optional token verifier, and the
//! store query timeout.
//!
//! The store is built once from config and shared read-only; handlers never learn
//! which backend is behind the trait object.

use std::{sync::Arc, time::Duration};

use tracing::{info, instrument, warn};

use crate::auth::{AuthError, TokenVerifier, UserInfoVerifier};
use crate::config::{AppConfig, StoreBackend};
use crate::seeds::{load_dataset, DatasetError};
use crate::store::{MemoryProblemStore, ProblemStore, SqliteProblemStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
  #[error(transparent)]
  Dataset(#[from] DatasetError),
  #[error(transparent)]
  Store(#[from] StoreError),
  #[error(transparent)]
  Auth(#[from] AuthError),
}

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn ProblemStore>,
  pub verifier: Option<Arc<dyn TokenVerifier>>,
  pub query_timeout: Duration,
}

impl AppState {
  pub fn new(store: Arc<dyn ProblemStore>, verifier: Option<Arc<dyn TokenVerifier>>, query_timeout: Duration) -> Self {
    Self { store, verifier, query_timeout }
  }

  /// Build state from config: open the configured store, log its inventory, init auth.
  #[instrument(level = "info", skip_all)]
  pub async fn from_config(cfg: &AppConfig) -> Result<Self, StartupError> {
    let store = build_store(cfg).await?;

    // Inventory summary by problem type.
    let inventory = store.inventory().await?;
    for (kind, count) in &inventory {
      info!(target: "problem", backend = store.name(), kind = kind.as_str(), count, "Startup problem inventory");
    }
    if inventory.is_empty() {
      warn!(target: "problem", backend = store.name(), "Problem store is empty; every lookup will be 404");
    }

    let verifier: Option<Arc<dyn TokenVerifier>> = match &cfg.auth.issuer_url {
      Some(issuer) => {
        let v = UserInfoVerifier::new(issuer, &cfg.auth.userinfo_path)?;
        info!(target: "conjuego_backend", userinfo_url = %v.userinfo_url, "Bearer authentication enabled.");
        Some(Arc::new(v))
      }
      None if cfg.is_production() => {
        warn!(target: "conjuego_backend", "AUTH_ISSUER_URL not set in production; problem routes are unauthenticated.");
        None
      }
      None => {
        info!(target: "conjuego_backend", "Bearer authentication disabled (no AUTH_ISSUER_URL).");
        None
      }
    };

    Ok(Self::new(store, verifier, cfg.query_timeout()))
  }
}

async fn build_store(cfg: &AppConfig) -> Result<Arc<dyn ProblemStore>, StartupError> {
  match cfg.store.backend {
    StoreBackend::Memory => {
      let problems = load_dataset(cfg.store.dataset_path.as_deref())?;
      Ok(Arc::new(MemoryProblemStore::new(problems)))
    }
    StoreBackend::Sqlite => {
      let store = SqliteProblemStore::open(&cfg.store.database_path)?;
      store.init().await?;
      if cfg.store.seed_database {
        let problems = load_dataset(cfg.store.dataset_path.as_deref())?;
        let written = store.upsert_many(problems).await?;
        info!(target: "conjuego_backend", written, "Seeded problem database");
      }
      Ok(Arc::new(store))
    }
  }
}
