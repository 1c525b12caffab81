//! HTTP endpoint handlers. These are thin wrappers that forward to core logic
//! and map its outcome onto status codes.

use std::sync::Arc;
use axum::{extract::{Path, State}, Json, response::{IntoResponse, Response}};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::logic::{fetch_problem, Outcome};
use crate::protocol::HealthOut;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_problem(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Response {
  match fetch_problem(state.store.as_ref(), &id, state.query_timeout).await {
    Outcome::Found(problem) => {
      info!(target: "problem", %id, "HTTP problem served");
      Json(problem).into_response()
    }
    Outcome::NotFound => ApiError::NotFound("Problem not found").into_response(),
    Outcome::Invalid(reason) => ApiError::BadRequest(reason).into_response(),
    // Reason was logged by the lookup; the client only gets a generic message.
    Outcome::Failure(_) => ApiError::Internal.into_response(),
  }
}

/// `/problem/` with no id segment.
#[instrument(level = "info")]
pub async fn http_get_problem_without_id() -> Response {
  ApiError::BadRequest("Problem id must not be empty").into_response()
}
