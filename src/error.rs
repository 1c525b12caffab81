//! HTTP-facing error type. Internal detail is logged where it happens, never sent.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};

use crate::protocol::ErrorOut;

#[derive(Debug, PartialEq)]
pub enum ApiError {
  BadRequest(&'static str),
  Unauthorized,
  NotFound(&'static str),
  Internal,
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn message(&self) -> &'static str {
    match self {
      ApiError::BadRequest(m) | ApiError::NotFound(m) => *m,
      ApiError::Unauthorized => "Unauthorized",
      ApiError::Internal => "Internal server error",
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let body = ErrorOut { error: self.message().to_string() };
    (self.status(), Json(body)).into_response()
  }
}
