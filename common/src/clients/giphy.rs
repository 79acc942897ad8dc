use super::http::{json_headers, HttpSession};
use super::{not_loaded, param_str, unknown_operation, ClientAdapter, Credentials};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;

pub const DEFAULT_BASE_URL: &str = "https://api.giphy.com/v1";

struct GiphySession {
    http: HttpSession,
    api_key: String,
}

/// GIF search over the Giphy REST API.
pub struct GiphyClient {
    session: RwLock<Option<GiphySession>>,
}

impl Default for GiphyClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GiphyClient {
    pub fn new() -> Self {
        Self {
            session: RwLock::new(None),
        }
    }

    pub async fn search(&self, query: &str, limit: u32) -> AppResult<Vec<String>> {
        let result = self
            .call("search", json!({ "query": query, "limit": limit }))
            .await?;
        Ok(serde_json::from_value(result["urls"].clone())?)
    }
}

fn extract_urls(body: &Value) -> AppResult<Vec<String>> {
    let items = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::remote(None, "giphy response has no 'data' array"))?;

    Ok(items
        .iter()
        .filter_map(|item| item.pointer("/images/original/url").and_then(Value::as_str))
        .map(str::to_string)
        .collect())
}

#[async_trait]
impl ClientAdapter for GiphyClient {
    fn name(&self) -> &'static str {
        "giphy"
    }

    async fn load(&self, credentials: &Credentials) -> AppResult<()> {
        let api_key = credentials.require("api_key")?.to_string();
        let base_url = credentials.get("base_url").unwrap_or(DEFAULT_BASE_URL);
        let http = HttpSession::new(base_url, json_headers())?;

        *self.session.write().await = Some(GiphySession { http, api_key });
        tracing::info!(base_url, "Giphy client loaded");
        Ok(())
    }

    async fn call(&self, operation: &str, params: Value) -> AppResult<Value> {
        let guard = self.session.read().await;
        let session = guard.as_ref().ok_or_else(|| not_loaded(self.name()))?;

        match operation {
            "search" => {
                let query = param_str(&params, "query")?;
                let limit = params.get("limit").and_then(Value::as_u64).unwrap_or(1);
                let body = session
                    .http
                    .get_json(
                        "/gifs/search",
                        &[
                            ("api_key", session.api_key.clone()),
                            ("q", query.to_string()),
                            ("limit", limit.to_string()),
                        ],
                    )
                    .await?;
                Ok(json!({ "urls": extract_urls(&body)? }))
            }
            other => Err(unknown_operation(self.name(), other)),
        }
    }

    async fn close(&self) -> AppResult<()> {
        if self.session.write().await.take().is_some() {
            tracing::info!("Giphy client closed");
        }
        Ok(())
    }

    async fn is_loaded(&self) -> bool {
        self.session.read().await.is_some()
    }
}
