//! Problem lookup: the transport-independent core behind the HTTP handlers.
//!
//! One bounded store query per call, no retries and no caching. Absence and failure
//! stay distinct all the way up; only the HTTP layer picks status codes.

use std::time::Duration;

use tracing::{debug, error, instrument};

use crate::domain::Problem;
use crate::store::{ProblemStore, StoreError};

/// Result of `fetch_problem`.
#[derive(Debug, PartialEq)]
pub enum Outcome {
  Found(Problem),
  NotFound,
  /// The store could not be queried. The reason is for logs only.
  Failure(String),
  /// The id was rejected before reaching the store.
  Invalid(&'static str),
}

#[instrument(level = "info", skip_all, fields(%id, store = store.name()))]
pub async fn fetch_problem(store: &dyn ProblemStore, id: &str, timeout: Duration) -> Outcome {
  if id.trim().is_empty() {
    debug!(target: "problem", "Rejected empty problem id");
    return Outcome::Invalid("Problem id must not be empty");
  }

  let result = match tokio::time::timeout(timeout, store.get_by_id(id)).await {
    Ok(r) => r,
    Err(_) => Err(StoreError::Timeout(timeout)),
  };

  match result {
    Ok(Some(problem)) => {
      debug!(target: "problem", %id, kind = problem.kind.as_str(), "Problem found");
      Outcome::Found(problem)
    }
    Ok(None) => {
      debug!(target: "problem", %id, "Problem not found");
      Outcome::NotFound
    }
    Err(e) => {
      error!(target: "problem", %id, error = %e, "Problem store query failed");
      Outcome::Failure(e.to_string())
    }
  }
}
