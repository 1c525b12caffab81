//! Problem stores: one async lookup contract, two interchangeable backends.
//!
//! - `MemoryProblemStore`: immutable index built once from a dataset.
//! - `SqliteProblemStore`: persisted collection of JSON documents keyed by id.
//!
//! Absence is `Ok(None)`; `Err` is reserved for a store that could not be queried.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;

use crate::domain::{Problem, ProblemType};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryProblemStore;
pub use sqlite::SqliteProblemStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("store is closed or unreachable")]
  Unavailable,
  #[error("query failed: {0}")]
  Query(#[from] rusqlite::Error),
  #[error("stored document `{id}` is corrupt: {reason}")]
  Corrupt { id: String, reason: String },
  #[error("query timed out after {0:?}")]
  Timeout(Duration),
  #[error("blocking query task failed: {0}")]
  Join(String),
}

#[async_trait]
pub trait ProblemStore: Send + Sync {
  /// Exactly one problem whose id equals `id`, or None.
  async fn get_by_id(&self, id: &str) -> Result<Option<Problem>, StoreError>;

  /// Number of problems per type; used for the startup inventory log.
  async fn inventory(&self) -> Result<HashMap<ProblemType, usize>, StoreError>;

  /// Backend name for logs.
  fn name(&self) -> &'static str;

  /// Release the backing resources. Lookups after close fail with `Unavailable`.
  async fn close(&self) -> Result<(), StoreError> {
    Ok(())
  }
}
