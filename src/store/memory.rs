//! In-memory problem store built once at startup.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{instrument, warn};

use super::{ProblemStore, StoreError};
use crate::domain::{Problem, ProblemType};

/// Immutable id index. Shared read-only across requests, so no lock is needed.
pub struct MemoryProblemStore {
  by_id: HashMap<String, Problem>,
}

impl MemoryProblemStore {
  /// Build the index. On a repeated id the first record wins.
  pub fn new(problems: Vec<Problem>) -> Self {
    let mut by_id = HashMap::with_capacity(problems.len());
    for p in problems {
      if by_id.contains_key(&p.id) {
        warn!(target: "problem", id = %p.id, "Ignoring repeated problem id");
        continue;
      }
      by_id.insert(p.id.clone(), p);
    }
    Self { by_id }
  }
}

#[async_trait]
impl ProblemStore for MemoryProblemStore {
  #[instrument(level = "debug", skip(self), fields(%id))]
  async fn get_by_id(&self, id: &str) -> Result<Option<Problem>, StoreError> {
    Ok(self.by_id.get(id).cloned())
  }

  async fn inventory(&self) -> Result<HashMap<ProblemType, usize>, StoreError> {
    let mut counts = HashMap::new();
    for p in self.by_id.values() {
      *counts.entry(p.kind).or_insert(0) += 1;
    }
    Ok(counts)
  }

  fn name(&self) -> &'static str {
    "memory"
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::tests::hable;

  #[tokio::test]
  async fn first_record_wins_on_repeated_id() {
    let mut shadow = hable();
    shadow.elo = 9999.0;
    let store = MemoryProblemStore::new(vec![hable(), shadow]);

    assert_eq!(store.inventory().await.unwrap().get(&ProblemType::Cloze), Some(&1));
    let found = store.get_by_id("p1").await.unwrap().unwrap();
    assert_eq!(found.elo, 1200.0);
  }

  #[tokio::test]
  async fn empty_store_finds_nothing() {
    let store = MemoryProblemStore::new(Vec::new());
    assert!(store.get_by_id("p1").await.unwrap().is_none());
    assert!(store.inventory().await.unwrap().is_empty());
  }
}
