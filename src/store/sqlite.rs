//! Persisted problem collection on SQLite.
//!
//! Each problem is one JSON document in `problems(id, doc)`. Lookups are an equality
//! filter on `id`. rusqlite is blocking, so every query runs on the tokio blocking pool.
//!
//! A caller that stops waiting (e.g. its timeout fires) interrupts the running statement,
//! so an abandoned query releases the connection instead of holding the lock.

use std::{
  collections::HashMap,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
  },
  time::Duration,
};

use async_trait::async_trait;
use rusqlite::{params, Connection, InterruptHandle, OptionalExtension};
use tracing::{info, instrument};

use super::{ProblemStore, StoreError};
use crate::domain::{Problem, ProblemType};

/// How long a statement waits on a database file locked by another process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Owned connection handle. `None` once the store has been closed.
pub struct SqliteProblemStore {
  conn: Arc<Mutex<Option<Connection>>>,
  interrupt: Arc<InterruptHandle>,
  path: String,
}

/// Dropped while armed means the awaiting future was cancelled. The connection is only
/// interrupted if our closure holds it, so a query queued behind another caller is not hit.
struct InterruptOnDrop {
  handle: Option<Arc<InterruptHandle>>,
  running: Arc<AtomicBool>,
}

impl InterruptOnDrop {
  fn disarm(mut self) {
    self.handle = None;
  }
}

impl Drop for InterruptOnDrop {
  fn drop(&mut self) {
    if let Some(handle) = self.handle.take() {
      if self.running.load(Ordering::SeqCst) {
        handle.interrupt();
      }
    }
  }
}

impl SqliteProblemStore {
  /// Open (or create) the database at `path`. `":memory:"` gives a private in-memory database.
  pub fn open(path: &str) -> Result<Self, StoreError> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    let interrupt = Arc::new(conn.get_interrupt_handle());
    info!(target: "conjuego_backend", %path, "Opened problem database");
    Ok(Self { conn: Arc::new(Mutex::new(Some(conn))), interrupt, path: path.to_string() })
  }

  pub async fn init(&self) -> Result<(), StoreError> {
    self
      .with_conn(|conn| {
        conn.execute_batch(
          r#"
          CREATE TABLE IF NOT EXISTS problems (
              id TEXT PRIMARY KEY NOT NULL,
              doc TEXT NOT NULL
          );
          "#,
        )?;
        Ok(())
      })
      .await
  }

  /// Insert or replace documents by id in a single transaction.
  #[instrument(level = "info", skip(self, problems), fields(count = problems.len()))]
  pub async fn upsert_many(&self, problems: Vec<Problem>) -> Result<usize, StoreError> {
    self
      .with_conn(move |conn| {
        let tx = conn.unchecked_transaction()?;
        {
          let mut stmt =
            tx.prepare("INSERT INTO problems (id, doc) VALUES (?1, ?2) ON CONFLICT(id) DO UPDATE SET doc = excluded.doc")?;
          for p in &problems {
            let doc = serde_json::to_string(p)
              .map_err(|e| StoreError::Corrupt { id: p.id.clone(), reason: e.to_string() })?;
            stmt.execute(params![p.id, doc])?;
          }
        }
        tx.commit()?;
        Ok(problems.len())
      })
      .await
  }

  /// Run `f` against the live connection on the blocking pool.
  async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
  where
    F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
  {
    let conn = self.conn.clone();
    let running = Arc::new(AtomicBool::new(false));
    let cancel = InterruptOnDrop { handle: Some(self.interrupt.clone()), running: running.clone() };
    let result = tokio::task::spawn_blocking(move || {
      let guard = conn.lock().map_err(|_| StoreError::Unavailable)?;
      let conn = guard.as_ref().ok_or(StoreError::Unavailable)?;
      running.store(true, Ordering::SeqCst);
      let out = f(conn);
      running.store(false, Ordering::SeqCst);
      out
    })
    .await;
    cancel.disarm();
    result.map_err(|e| StoreError::Join(e.to_string()))?
  }
}

#[async_trait]
impl ProblemStore for SqliteProblemStore {
  #[instrument(level = "debug", skip(self), fields(%id))]
  async fn get_by_id(&self, id: &str) -> Result<Option<Problem>, StoreError> {
    let id = id.to_string();
    self
      .with_conn(move |conn| {
        let doc: Option<String> = conn
          .query_row("SELECT doc FROM problems WHERE id = ?1", params![id], |row| row.get(0))
          .optional()?;
        let Some(doc) = doc else { return Ok(None) };

        let problem: Problem = serde_json::from_str(&doc)
          .map_err(|e| StoreError::Corrupt { id: id.clone(), reason: e.to_string() })?;
        if problem.id != id {
          return Err(StoreError::Corrupt { id, reason: format!("document carries id `{}`", problem.id) });
        }
        Ok(Some(problem))
      })
      .await
  }

  async fn inventory(&self) -> Result<HashMap<ProblemType, usize>, StoreError> {
    self
      .with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT id, doc FROM problems")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut counts = HashMap::new();
        for row in rows {
          let (id, doc) = row?;
          let problem: Problem = serde_json::from_str(&doc)
            .map_err(|e| StoreError::Corrupt { id, reason: e.to_string() })?;
          *counts.entry(problem.kind).or_insert(0) += 1;
        }
        Ok(counts)
      })
      .await
  }

  fn name(&self) -> &'static str {
    "sqlite"
  }

  async fn close(&self) -> Result<(), StoreError> {
    let conn = self.conn.clone();
    let path = self.path.clone();
    tokio::task::spawn_blocking(move || {
      let mut guard = conn.lock().map_err(|_| StoreError::Unavailable)?;
      match guard.take() {
        Some(c) => c.close().map_err(|(_, e)| StoreError::Query(e)),
        None => Ok(()),
      }
    })
    .await
    .map_err(|e| StoreError::Join(e.to_string()))??;
    info!(target: "conjuego_backend", %path, "Closed problem database");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::tests::hable;

  async fn seeded() -> SqliteProblemStore {
    let store = SqliteProblemStore::open(":memory:").unwrap();
    store.init().await.unwrap();
    store.upsert_many(vec![hable()]).await.unwrap();
    store
  }

  #[tokio::test]
  async fn finds_by_id_and_reports_absence() {
    let store = seeded().await;
    assert_eq!(store.get_by_id("p1").await.unwrap(), Some(hable()));
    assert_eq!(store.get_by_id("p2").await.unwrap(), None);
  }

  #[tokio::test]
  async fn upsert_replaces_existing_document() {
    let store = seeded().await;
    let mut changed = hable();
    changed.elo = 1333.0;
    store.upsert_many(vec![changed.clone()]).await.unwrap();

    assert_eq!(store.get_by_id("p1").await.unwrap(), Some(changed));
    let inventory = store.inventory().await.unwrap();
    assert_eq!(inventory.get(&ProblemType::Cloze), Some(&1));
  }

  #[tokio::test]
  async fn missing_table_is_a_failure_not_absence() {
    let store = SqliteProblemStore::open(":memory:").unwrap();
    assert!(matches!(store.get_by_id("p1").await, Err(StoreError::Query(_))));
  }

  #[tokio::test]
  async fn closed_store_is_unavailable() {
    let store = seeded().await;
    store.close().await.unwrap();
    assert!(matches!(store.get_by_id("p1").await, Err(StoreError::Unavailable)));
    // closing twice is harmless
    store.close().await.unwrap();
  }

  #[tokio::test]
  async fn corrupt_document_is_a_failure() {
    let store = seeded().await;
    store
      .with_conn(|conn| {
        conn.execute(
          "INSERT INTO problems (id, doc) VALUES ('broken', '{\"id\":\"broken\",\"type\":\"essay\"}')",
          [],
        )?;
        conn.execute("INSERT INTO problems (id, doc) VALUES ('alias', ?1)", params![serde_json::to_string(&hable()).unwrap()])?;
        Ok(())
      })
      .await
      .unwrap();

    assert!(matches!(store.get_by_id("broken").await, Err(StoreError::Corrupt { .. })));
    assert!(matches!(store.get_by_id("alias").await, Err(StoreError::Corrupt { .. })));
  }

  #[tokio::test]
  async fn abandoned_query_is_interrupted_and_releases_the_connection() {
    let store = seeded().await;

    // Endless recursive CTE: only an interrupt ends it.
    let (started_tx, started_rx) = tokio::sync::oneshot::channel();
    let mut endless = Box::pin(store.with_conn(move |conn| {
      let _ = started_tx.send(());
      let n: i64 = conn.query_row(
        "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT count(*) FROM c",
        [],
        |row| row.get(0),
      )?;
      Ok(n)
    }));
    tokio::select! {
      _ = &mut endless => panic!("endless query returned"),
      _ = started_rx => {}
    }
    // Same as a lookup timeout firing: the caller stops waiting.
    drop(endless);

    let next = tokio::time::timeout(Duration::from_secs(5), store.get_by_id("p1")).await;
    assert_eq!(next.expect("connection was released").unwrap(), Some(hable()));
  }

  #[tokio::test]
  async fn persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("problems.db");
    let path = path.to_str().unwrap();

    let store = SqliteProblemStore::open(path).unwrap();
    store.init().await.unwrap();
    store.upsert_many(vec![hable()]).await.unwrap();
    store.close().await.unwrap();

    let reopened = SqliteProblemStore::open(path).unwrap();
    assert_eq!(reopened.get_by_id("p1").await.unwrap(), Some(hable()));
    reopened.close().await.unwrap();
  }
}
