//! Bearer-token boundary in front of the problem routes.
//!
//! Token validation is delegated to the identity provider: the token is presented to
//! its userinfo endpoint and accepted when that call succeeds. We never log tokens.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
  extract::{Request, State},
  http::{header::AUTHORIZATION, HeaderMap},
  middleware::Next,
  response::{IntoResponse, Response},
};
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated principal, inserted into request extensions.
#[derive(Clone, Debug, PartialEq)]
pub struct Subject(pub String);

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
  #[error("missing Authorization header")]
  Missing,
  #[error("Authorization header is not a bearer token")]
  Malformed,
  #[error("token rejected by identity provider (status {0})")]
  Rejected(u16),
  #[error("identity provider request failed: {0}")]
  Provider(String),
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
  async fn verify(&self, token: &str) -> Result<Subject, AuthError>;
}

/// Verifies tokens against `{issuer}{userinfo_path}` (Auth0 style).
#[derive(Clone)]
pub struct UserInfoVerifier {
  client: reqwest::Client,
  pub userinfo_url: String,
}

#[derive(Deserialize)]
struct UserInfo {
  sub: String,
}

impl UserInfoVerifier {
  pub fn new(issuer_url: &str, userinfo_path: &str) -> Result<Self, AuthError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(10))
      .build()
      .map_err(|e| AuthError::Provider(e.to_string()))?;
    let userinfo_url = format!(
      "{}/{}",
      issuer_url.trim_end_matches('/'),
      userinfo_path.trim_start_matches('/')
    );
    Ok(Self { client, userinfo_url })
  }
}

#[async_trait]
impl TokenVerifier for UserInfoVerifier {
  #[instrument(level = "debug", skip_all, fields(url = %self.userinfo_url))]
  async fn verify(&self, token: &str) -> Result<Subject, AuthError> {
    let resp = self
      .client
      .get(&self.userinfo_url)
      .bearer_auth(token)
      .header(USER_AGENT, "conjuego-backend")
      .send()
      .await
      .map_err(|e| AuthError::Provider(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
      return Err(AuthError::Rejected(status.as_u16()));
    }
    let info: UserInfo = resp.json().await.map_err(|e| AuthError::Provider(e.to_string()))?;
    Ok(Subject(info.sub))
  }
}

/// Extract the token from `Authorization: Bearer <token>`. The scheme is case-insensitive.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
  let value = headers.get(AUTHORIZATION).ok_or(AuthError::Missing)?;
  let value = value.to_str().map_err(|_| AuthError::Malformed)?;
  let (scheme, token) = value.split_once(' ').ok_or(AuthError::Malformed)?;
  let token = token.trim();
  if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
    return Err(AuthError::Malformed);
  }
  Ok(token)
}

/// Middleware: reject with 401 before the handler runs. A no-op when auth is disabled.
pub async fn require_bearer(State(state): State<Arc<AppState>>, mut req: Request, next: Next) -> Response {
  let Some(verifier) = state.verifier.as_ref() else {
    return next.run(req).await;
  };

  let token = match bearer_token(req.headers()) {
    Ok(t) => t.to_string(),
    Err(e) => {
      info!(target: "auth", path = %req.uri().path(), reason = %e, "Rejected unauthenticated request");
      return ApiError::Unauthorized.into_response();
    }
  };

  match verifier.verify(&token).await {
    Ok(subject) => {
      debug!(target: "auth", sub = %subject.0, "Request authenticated");
      req.extensions_mut().insert(subject);
      next.run(req).await
    }
    Err(e @ AuthError::Provider(_)) => {
      warn!(target: "auth", error = %e, "Identity provider unavailable; rejecting request");
      ApiError::Unauthorized.into_response()
    }
    Err(e) => {
      info!(target: "auth", reason = %e, "Rejected token");
      ApiError::Unauthorized.into_response()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::{http::StatusCode, routing::get, Json, Router};
  use tokio::net::TcpListener;

  fn headers(value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(AUTHORIZATION, value.parse().unwrap());
    h
  }

  #[test]
  fn parses_bearer_header() {
    assert_eq!(bearer_token(&headers("Bearer abc.def")).unwrap(), "abc.def");
    assert_eq!(bearer_token(&headers("bearer  abc")).unwrap(), "abc");
    assert!(matches!(bearer_token(&HeaderMap::new()), Err(AuthError::Missing)));
    assert!(matches!(bearer_token(&headers("Basic dXNlcjpwdw==")), Err(AuthError::Malformed)));
    assert!(matches!(bearer_token(&headers("Bearer")), Err(AuthError::Malformed)));
    assert!(matches!(bearer_token(&headers("Bearer   ")), Err(AuthError::Malformed)));
  }

  #[test]
  fn joins_issuer_and_userinfo_path() {
    let v = UserInfoVerifier::new("https://tenant.auth0.com/", "/userinfo").unwrap();
    assert_eq!(v.userinfo_url, "https://tenant.auth0.com/userinfo");
    let v = UserInfoVerifier::new("https://idp.example", "oauth/userinfo").unwrap();
    assert_eq!(v.userinfo_url, "https://idp.example/oauth/userinfo");
  }

  /// Local stand-in for the identity provider: accepts only "good-token".
  async fn spawn_identity_provider() -> String {
    async fn userinfo(headers: HeaderMap) -> Response {
      match bearer_token(&headers) {
        Ok("good-token") => Json(serde_json::json!({ "sub": "auth0|learner-1" })).into_response(),
        _ => StatusCode::UNAUTHORIZED.into_response(),
      }
    }
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, Router::new().route("/userinfo", get(userinfo))).await.unwrap();
    });
    format!("http://{addr}")
  }

  #[tokio::test]
  async fn userinfo_verifier_accepts_and_rejects() {
    let issuer = spawn_identity_provider().await;
    let verifier = UserInfoVerifier::new(&issuer, "/userinfo").unwrap();

    let subject = verifier.verify("good-token").await.unwrap();
    assert_eq!(subject, Subject("auth0|learner-1".into()));

    assert!(matches!(verifier.verify("stolen").await, Err(AuthError::Rejected(401))));
  }

  #[tokio::test]
  async fn unreachable_provider_is_a_provider_error() {
    // Bind then drop to get a port with nothing listening.
    let addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
    let verifier = UserInfoVerifier::new(&format!("http://{addr}"), "/userinfo").unwrap();
    assert!(matches!(verifier.verify("good-token").await, Err(AuthError::Provider(_))));
  }
}
