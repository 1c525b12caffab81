//! Seed data: the bundled problem dataset and loading of external datasets.
//!
//! Every record goes through `Problem::validate` before it can reach a store.
//! Invalid records are skipped with a warning; duplicate ids reject the whole dataset.

use std::{collections::HashSet, path::{Path, PathBuf}};

use tracing::{info, warn};

use crate::domain::Problem;

/// Dataset compiled into the binary; used when no dataset path is configured.
const BUNDLED_PROBLEMS: &str = include_str!("../data/problems.json");

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
  #[error("failed to read dataset {path}: {source}")]
  Read { path: PathBuf, source: std::io::Error },
  #[error("failed to parse dataset: {0}")]
  Parse(#[from] serde_json::Error),
  #[error("duplicate problem id `{0}`")]
  DuplicateId(String),
}

/// Built-in problems that guarantee the app is useful without any external data.
pub fn seed_problems() -> Result<Vec<Problem>, DatasetError> {
  parse_problems(BUNDLED_PROBLEMS)
}

/// Load the dataset at `path`, or the bundled one when `path` is None.
pub fn load_dataset(path: Option<&Path>) -> Result<Vec<Problem>, DatasetError> {
  let Some(path) = path else {
    let problems = seed_problems()?;
    info!(target: "conjuego_backend", count = problems.len(), "Loaded bundled problem dataset");
    return Ok(problems);
  };

  let raw = std::fs::read_to_string(path)
    .map_err(|source| DatasetError::Read { path: path.to_path_buf(), source })?;
  let problems = parse_problems(&raw)?;
  info!(target: "conjuego_backend", path = %path.display(), count = problems.len(), "Loaded problem dataset");
  Ok(problems)
}

/// Decode a JSON array of problems, dropping records that fail validation.
pub fn parse_problems(raw: &str) -> Result<Vec<Problem>, DatasetError> {
  let decoded: Vec<Problem> = serde_json::from_str(raw)?;

  let mut seen = HashSet::new();
  let mut accepted = Vec::with_capacity(decoded.len());
  for problem in decoded {
    if !seen.insert(problem.id.clone()) {
      return Err(DatasetError::DuplicateId(problem.id));
    }
    match problem.validate() {
      Ok(()) => accepted.push(problem),
      Err(e) => {
        warn!(target: "problem", id = %problem.id, error = %e, "Skipping invalid problem record");
      }
    }
  }
  Ok(accepted)
}
