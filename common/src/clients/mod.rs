//! Adapters over third-party systems.
//!
//! Every adapter exposes the same `load / call / close` lifecycle through
//! [`ClientAdapter`] and owns exactly one session handle. Callers receive the
//! adapter explicitly (usually behind an `Arc`); nothing in this module keeps
//! a process-wide active client.

pub mod catalog;
pub mod giphy;
pub mod http;
pub mod slack;
pub mod sql;
pub mod weather;

use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

pub use catalog::CatalogClient;
pub use giphy::GiphyClient;
pub use slack::SlackClient;
pub use sql::SqlClient;
pub use weather::WeatherClient;

/// Secret and connection fields handed to [`ClientAdapter::load`].
///
/// Values never show up in `Debug` output and the type is not `Serialize`.
#[derive(Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Credentials {
    fields: BTreeMap<String, String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Adds `value` unless it is absent or blank.
    pub fn with_optional(mut self, key: &str, value: Option<String>) -> Self {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            self.fields.insert(key.to_string(), v);
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn require(&self, key: &str) -> AppResult<&str> {
        self.get(key).ok_or_else(|| {
            AppError::Configuration(format!("missing required credential field '{}'", key))
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for key in self.fields.keys() {
            map.entry(key, &"***");
        }
        map.finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Credentials {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[async_trait]
pub trait ClientAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Opens the session. Safe to call again after [`ClientAdapter::close`].
    async fn load(&self, credentials: &Credentials) -> AppResult<()>;

    /// Performs exactly one remote operation.
    async fn call(&self, operation: &str, params: Value) -> AppResult<Value>;

    /// Drops the session. A no-op when nothing is loaded.
    async fn close(&self) -> AppResult<()>;

    async fn is_loaded(&self) -> bool;
}

pub(crate) fn not_loaded(name: &str) -> AppError {
    AppError::Configuration(format!("{} client is not loaded", name))
}

pub(crate) fn unknown_operation(name: &str, operation: &str) -> AppError {
    AppError::Validation(format!(
        "{} client does not support operation '{}'",
        name, operation
    ))
}

pub(crate) fn param_str<'a>(params: &'a Value, key: &str) -> AppResult<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Validation(format!("missing string parameter '{}'", key)))
}

pub(crate) fn param_f64(params: &Value, key: &str) -> AppResult<f64> {
    params
        .get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| AppError::Validation(format!("missing numeric parameter '{}'", key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_reports_missing_and_blank_fields() {
        let creds = Credentials::new()
            .with("api_key", "secret")
            .with("token", "   ");

        assert_eq!(creds.require("api_key").unwrap(), "secret");
        assert!(matches!(
            creds.require("token"),
            Err(AppError::Configuration(_))
        ));
        let err = creds.require("host").unwrap_err();
        assert!(err.to_string().contains("'host'"));
    }

    #[test]
    fn debug_output_redacts_values() {
        let creds = Credentials::new()
            .with("api_key", "super-secret")
            .with_optional("token", None)
            .with_optional("host", Some("db.local".to_string()));

        let dbg = format!("{:?}", creds);
        assert!(dbg.contains("api_key"));
        assert!(dbg.contains("host"));
        assert!(!dbg.contains("super-secret"));
        assert!(!dbg.contains("db.local"));
        assert!(!dbg.contains("token"));
    }

    #[test]
    fn credentials_deserialize_from_flat_json_object() {
        let creds: Credentials =
            serde_json::from_value(serde_json::json!({"url": "sqlite::memory:"})).unwrap();
        assert_eq!(creds.get("url"), Some("sqlite::memory:"));
        assert_eq!(creds.keys().collect::<Vec<_>>(), vec!["url"]);
    }
}
