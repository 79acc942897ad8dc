use super::http::{bearer_headers, HttpSession};
use super::{not_loaded, unknown_operation, ClientAdapter, Credentials};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub guid: String,
    pub name: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Asset {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// One page of a catalog search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetPage {
    pub total: u64,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchAssetsRequest {
    pub updated_before: DateTime<Utc>,
    pub from: u64,
    pub size: u64,
}

/// Metadata catalog used by the freshness monitor.
pub struct CatalogClient {
    session: RwLock<Option<HttpSession>>,
}

impl Default for CatalogClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogClient {
    pub fn new() -> Self {
        Self {
            session: RwLock::new(None),
        }
    }

    pub async fn search_assets(&self, request: &SearchAssetsRequest) -> AppResult<AssetPage> {
        let result = self
            .call("search_assets", serde_json::to_value(request)?)
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    pub async fn add_tag(&self, guids: &[String], tag: &str) -> AppResult<u64> {
        let result = self
            .call("add_tag", json!({ "guids": guids, "tag": tag }))
            .await?;
        Ok(result["tagged"].as_u64().unwrap_or(0))
    }
}

#[async_trait]
impl ClientAdapter for CatalogClient {
    fn name(&self) -> &'static str {
        "catalog"
    }

    async fn load(&self, credentials: &Credentials) -> AppResult<()> {
        let base_url = credentials.require("base_url")?;
        let api_key = credentials.require("api_key")?;
        let http = HttpSession::new(base_url, bearer_headers(api_key)?)?;

        *self.session.write().await = Some(http);
        tracing::info!(base_url, "Catalog client loaded");
        Ok(())
    }

    async fn call(&self, operation: &str, params: Value) -> AppResult<Value> {
        let guard = self.session.read().await;
        let http = guard.as_ref().ok_or_else(|| not_loaded(self.name()))?;

        match operation {
            "search_assets" => {
                let request: SearchAssetsRequest = serde_json::from_value(params)?;
                let body = http
                    .post_json("/api/assets/search", &serde_json::to_value(&request)?)
                    .await?;
                let page: AssetPage = serde_json::from_value(body).map_err(|e| {
                    AppError::remote(None, format!("malformed asset page: {}", e))
                })?;
                Ok(serde_json::to_value(page)?)
            }
            "add_tag" => {
                let guids: Vec<String> = serde_json::from_value(
                    params.get("guids").cloned().unwrap_or(Value::Null),
                )?;
                let tag = params
                    .get("tag")
                    .and_then(Value::as_str)
                    .filter(|t| !t.trim().is_empty())
                    .ok_or_else(|| AppError::Validation("tag must not be empty".to_string()))?;
                if guids.is_empty() {
                    return Ok(json!({ "tagged": 0 }));
                }

                let body = http
                    .post_json("/api/assets/tags", &json!({ "guids": guids, "tag": tag }))
                    .await?;
                let tagged = body
                    .get("tagged")
                    .and_then(Value::as_u64)
                    .unwrap_or(guids.len() as u64);
                Ok(json!({ "tagged": tagged }))
            }
            other => Err(unknown_operation(self.name(), other)),
        }
    }

    async fn close(&self) -> AppResult<()> {
        if self.session.write().await.take().is_some() {
            tracing::info!("Catalog client closed");
        }
        Ok(())
    }

    async fn is_loaded(&self) -> bool {
        self.session.read().await.is_some()
    }
}
