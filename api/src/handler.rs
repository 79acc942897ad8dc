use async_trait::async_trait;
use common::clients::{ClientAdapter, Credentials, SqlClient};
use common::{AppError, AppResult};
use serde_json::{json, Map, Value};

/// Request-time checks an application can expose next to its workflows.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Verifies that the supplied credentials open a session.
    async fn test_auth(&self, payload: Map<String, Value>) -> AppResult<Value>;

    /// Verifies that the session can see what the workflow will need.
    async fn preflight_check(&self, payload: Map<String, Value>) -> AppResult<Value>;
}

/// Reads credentials from `payload.credentials`, or from the payload itself.
pub fn credentials_from(payload: &Map<String, Value>) -> AppResult<Credentials> {
    let fields = match payload.get("credentials") {
        Some(Value::Object(fields)) => fields,
        Some(_) => {
            return Err(AppError::Validation(
                "credentials must be a JSON object".to_string(),
            ))
        }
        None => payload,
    };

    Ok(fields
        .iter()
        .filter_map(|(key, value)| match value {
            Value::String(s) => Some((key.clone(), s.clone())),
            Value::Number(n) => Some((key.clone(), n.to_string())),
            Value::Bool(b) => Some((key.clone(), b.to_string())),
            _ => None,
        })
        .collect())
}

/// Opens a throwaway SQL session per request.
#[derive(Debug, Default)]
pub struct SqlHandler;

impl SqlHandler {
    pub fn new() -> Self {
        Self
    }
}

async fn open_session(payload: &Map<String, Value>) -> AppResult<SqlClient> {
    let client = SqlClient::new();
    client.load(&credentials_from(payload)?).await?;
    Ok(client)
}

async fn close_session(client: &SqlClient) {
    if let Err(e) = client.close().await {
        tracing::warn!(error = %e, "Failed to close SQL session");
    }
}

#[async_trait]
impl Handler for SqlHandler {
    async fn test_auth(&self, payload: Map<String, Value>) -> AppResult<Value> {
        let client = open_session(&payload).await?;
        let result = client.preflight().await;
        close_session(&client).await;
        result.map(|_| json!({ "authenticated": true }))
    }

    async fn preflight_check(&self, payload: Map<String, Value>) -> AppResult<Value> {
        let schema = payload.get("schema").cloned().unwrap_or(Value::Null);
        let client = open_session(&payload).await?;
        let result = client
            .call("list_tables", json!({ "schema": schema }))
            .await;
        close_session(&client).await;

        let listed = result?;
        let count = listed["tables"].as_array().map(Vec::len).unwrap_or(0);
        Ok(json!({ "success": true, "table_count": count }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn credentials_accept_nested_or_flat_payloads() {
        let nested = credentials_from(&object(json!({
            "credentials": {"host": "db", "port": 5432, "extra": {"skip": true}}
        })))
        .unwrap();
        assert_eq!(nested.get("host"), Some("db"));
        assert_eq!(nested.get("port"), Some("5432"));
        assert_eq!(nested.get("extra"), None);

        let flat = credentials_from(&object(json!({"url": "sqlite::memory:"}))).unwrap();
        assert_eq!(flat.get("url"), Some("sqlite::memory:"));

        assert!(matches!(
            credentials_from(&object(json!({"credentials": "nope"}))),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn sqlite_session_authenticates_and_lists_tables() {
        let handler = SqlHandler::new();
        let payload = object(json!({"credentials": {"url": "sqlite::memory:"}}));

        let auth = handler.test_auth(payload.clone()).await.unwrap();
        assert_eq!(auth, json!({"authenticated": true}));

        let check = handler.preflight_check(payload).await.unwrap();
        assert_eq!(check, json!({"success": true, "table_count": 0}));
    }

    #[tokio::test]
    async fn missing_credentials_are_configuration_errors() {
        let err = SqlHandler::new().test_auth(Map::new()).await.unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }
}
