//! Telemetry initialization (tracing/tracing-subscriber).
//!
//! Targets used across the service:
//! - `problem`: lookup outcomes and the startup inventory
//! - `auth`: bearer checks against the identity provider
//! - `conjuego_backend`: startup, store lifecycle, shutdown
//!
//! LOG_LEVEL overrides the filter (e.g. "debug" or "info,problem=debug,auth=warn").
//! An unparsable LOG_LEVEL falls back to the default and is reported once logging is up.
//! LOG_FORMAT selects "pretty" (default) or "json" structured logs.

use tracing::warn;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,problem=debug,auth=debug,conjuego_backend=debug,tower_http=info,axum=info";

/// Filter from `LOG_LEVEL` directives, or the default. The error carries the rejected input.
fn filter_from(directives: Option<&str>) -> (EnvFilter, Option<String>) {
    match directives.map(str::trim).filter(|d| !d.is_empty()) {
        None => (EnvFilter::new(DEFAULT_FILTER), None),
        Some(d) => match EnvFilter::try_new(d) {
            Ok(filter) => (filter, None),
            Err(e) => (EnvFilter::new(DEFAULT_FILTER), Some(format!("{d:?}: {e}"))),
        },
    }
}

pub fn init_tracing() {
    let level = std::env::var("LOG_LEVEL").ok();
    let (filter, rejected) = filter_from(level.as_deref());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // Different layer types per format, so init in each branch.
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }

    if let Some(rejected) = rejected {
        warn!(target: "conjuego_backend", %rejected, default = DEFAULT_FILTER, "Ignoring invalid LOG_LEVEL");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_covers_every_service_target() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
        for target in ["problem=debug", "auth=debug", "conjuego_backend=debug"] {
            assert!(DEFAULT_FILTER.split(',').any(|d| d == target), "{target}");
        }
    }

    #[test]
    fn log_level_overrides_or_falls_back() {
        let (_, rejected) = filter_from(None);
        assert!(rejected.is_none());
        let (_, rejected) = filter_from(Some("  "));
        assert!(rejected.is_none());
        let (_, rejected) = filter_from(Some("warn,auth=trace"));
        assert!(rejected.is_none());

        let (_, rejected) = filter_from(Some("auth=loud"));
        assert!(rejected.unwrap().contains("auth=loud"));
    }
}
