//! Runtime configuration: optional TOML file plus environment overrides.
//!
//! `CONJUEGO_CONFIG_PATH` points at a TOML file with `[server]`, `[store]` and `[auth]`
//! tables; every key is optional. Environment variables win over the file.

use std::{
  net::{IpAddr, SocketAddr},
  path::{Path, PathBuf},
  time::Duration,
};

use serde::Deserialize;
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("failed to read config file {path}: {source}")]
  Read { path: PathBuf, source: std::io::Error },
  #[error("failed to parse config file {path}: {source}")]
  Parse { path: PathBuf, source: toml::de::Error },
  #[error("invalid listen host `{0}`")]
  InvalidHost(String),
}

#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
  pub server: ServerConfig,
  pub store: StoreConfig,
  pub auth: AuthConfig,
}

#[derive(Clone, Copy, Debug, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
  #[default]
  Development,
  Production,
}

#[derive(Clone, Copy, Debug, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
  /// Bundled or file dataset held in memory.
  #[default]
  Memory,
  /// Persisted collection in a SQLite database.
  Sqlite,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host: String,
  pub port: u16,
  pub environment: Environment,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self { host: "0.0.0.0".into(), port: 3000, environment: Environment::Development }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
  pub backend: StoreBackend,
  /// JSON dataset for the memory backend (and for seeding). None = bundled dataset.
  pub dataset_path: Option<PathBuf>,
  /// Persistence connection string for the sqlite backend.
  pub database_path: String,
  /// Upsert the dataset into the database before serving.
  pub seed_database: bool,
  pub query_timeout_ms: u64,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      backend: StoreBackend::Memory,
      dataset_path: None,
      database_path: "conjuego.db".into(),
      seed_database: false,
      query_timeout_ms: 5000,
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
  /// Identity provider base URL, e.g. "https://tenant.auth0.com". None disables auth.
  pub issuer_url: Option<String>,
  pub userinfo_path: String,
}

impl Default for AuthConfig {
  fn default() -> Self {
    Self { issuer_url: None, userinfo_path: "/userinfo".into() }
  }
}

impl AppConfig {
  pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
    let ip: IpAddr = self
      .server
      .host
      .parse()
      .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;
    Ok(SocketAddr::new(ip, self.server.port))
  }

  pub fn query_timeout(&self) -> Duration {
    Duration::from_millis(self.store.query_timeout_ms)
  }

  pub fn is_production(&self) -> bool {
    self.server.environment == Environment::Production
  }

  /// Apply environment overrides. `var` is injected so tests don't touch the process env.
  pub fn apply_env<F>(&mut self, var: F)
  where
    F: Fn(&str) -> Option<String>,
  {
    if let Some(v) = var("HOST") {
      self.server.host = v;
    }
    if let Some(v) = var("PORT") {
      match v.parse() {
        Ok(port) => self.server.port = port,
        Err(_) => warn!(target: "conjuego_backend", value = %v, "Ignoring invalid PORT"),
      }
    }
    if let Some(v) = var("APP_ENV") {
      match v.to_ascii_lowercase().as_str() {
        "production" | "prod" => self.server.environment = Environment::Production,
        "development" | "dev" => self.server.environment = Environment::Development,
        _ => warn!(target: "conjuego_backend", value = %v, "Ignoring unknown APP_ENV"),
      }
    }
    if let Some(v) = var("PROBLEM_STORE") {
      match v.to_ascii_lowercase().as_str() {
        "memory" => self.store.backend = StoreBackend::Memory,
        "sqlite" => self.store.backend = StoreBackend::Sqlite,
        _ => warn!(target: "conjuego_backend", value = %v, "Ignoring unknown PROBLEM_STORE"),
      }
    }
    if let Some(v) = var("PROBLEMS_DATASET_PATH") {
      self.store.dataset_path = Some(PathBuf::from(v));
    }
    if let Some(v) = var("DATABASE_PATH") {
      self.store.database_path = v;
    }
    if let Some(v) = var("SEED_DATABASE") {
      self.store.seed_database = matches!(v.as_str(), "1" | "true" | "yes");
    }
    if let Some(v) = var("STORE_TIMEOUT_MS") {
      match v.parse() {
        Ok(ms) => self.store.query_timeout_ms = ms,
        Err(_) => warn!(target: "conjuego_backend", value = %v, "Ignoring invalid STORE_TIMEOUT_MS"),
      }
    }
    if let Some(v) = var("AUTH_ISSUER_URL") {
      self.auth.issuer_url = if v.trim().is_empty() { None } else { Some(v) };
    }
  }
}

pub fn load_config_file(path: &Path) -> Result<AppConfig, ConfigError> {
  let raw = std::fs::read_to_string(path)
    .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
  toml::from_str(&raw).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
}

/// Load config from CONJUEGO_CONFIG_PATH (if set) and the environment.
/// A missing or broken file is logged and replaced by defaults.
pub fn load_config_from_env() -> AppConfig {
  let mut cfg = match std::env::var("CONJUEGO_CONFIG_PATH") {
    Ok(path) => match load_config_file(Path::new(&path)) {
      Ok(cfg) => {
        info!(target: "conjuego_backend", %path, "Loaded config (TOML)");
        cfg
      }
      Err(e) => {
        error!(target: "conjuego_backend", error = %e, "Failed to load config; using defaults");
        AppConfig::default()
      }
    },
    Err(_) => AppConfig::default(),
  };
  cfg.apply_env(|key| std::env::var(key).ok());
  cfg
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;
  use std::io::Write;

  fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> =
      pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |key: &str| map.get(key).cloned()
  }

  #[test]
  fn defaults_listen_on_port_3000_in_memory() {
    let cfg = AppConfig::default();
    assert_eq!(cfg.listen_addr().unwrap(), SocketAddr::from(([0, 0, 0, 0], 3000)));
    assert_eq!(cfg.store.backend, StoreBackend::Memory);
    assert_eq!(cfg.query_timeout(), Duration::from_secs(5));
    assert!(!cfg.is_production());
    assert!(cfg.auth.issuer_url.is_none());
  }

  #[test]
  fn partial_toml_keeps_defaults_for_missing_keys() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
      file,
      r#"
      [server]
      port = 8080
      environment = "production"

      [store]
      backend = "sqlite"
      database_path = "/var/lib/conjuego/problems.db"

      [auth]
      issuer_url = "https://conjuego.example.auth0.com"
      "#
    )
    .unwrap();

    let cfg = load_config_file(file.path()).unwrap();
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert!(cfg.is_production());
    assert_eq!(cfg.store.backend, StoreBackend::Sqlite);
    assert_eq!(cfg.store.query_timeout_ms, 5000);
    assert_eq!(cfg.auth.userinfo_path, "/userinfo");
  }

  #[test]
  fn broken_toml_is_a_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[store]\nbackend = \"mongo\"\n").unwrap();
    assert!(matches!(load_config_file(file.path()), Err(ConfigError::Parse { .. })));
  }

  #[test]
  fn env_overrides_file_values() {
    let mut cfg = AppConfig::default();
    cfg.apply_env(env(&[
      ("HOST", "127.0.0.1"),
      ("PORT", "4000"),
      ("APP_ENV", "Production"),
      ("PROBLEM_STORE", "sqlite"),
      ("DATABASE_PATH", ":memory:"),
      ("SEED_DATABASE", "true"),
      ("STORE_TIMEOUT_MS", "250"),
      ("AUTH_ISSUER_URL", "https://idp.example"),
    ]));

    assert_eq!(cfg.listen_addr().unwrap(), SocketAddr::from(([127, 0, 0, 1], 4000)));
    assert!(cfg.is_production());
    assert_eq!(cfg.store.backend, StoreBackend::Sqlite);
    assert_eq!(cfg.store.database_path, ":memory:");
    assert!(cfg.store.seed_database);
    assert_eq!(cfg.query_timeout(), Duration::from_millis(250));
    assert_eq!(cfg.auth.issuer_url.as_deref(), Some("https://idp.example"));
  }

  #[test]
  fn invalid_env_values_are_ignored() {
    let mut cfg = AppConfig::default();
    cfg.apply_env(env(&[("PORT", "http"), ("PROBLEM_STORE", "mongo"), ("AUTH_ISSUER_URL", " ")]));
    assert_eq!(cfg.server.port, 3000);
    assert_eq!(cfg.store.backend, StoreBackend::Memory);
    assert!(cfg.auth.issuer_url.is_none());
  }

  #[test]
  fn bad_host_is_reported() {
    let mut cfg = AppConfig::default();
    cfg.server.host = "localhost:99".into();
    assert!(matches!(cfg.listen_addr(), Err(ConfigError::InvalidHost(_))));
  }
}
