use async_trait::async_trait;
use common::clients::catalog::{AssetPage, SearchAssetsRequest};
use common::clients::weather::CurrentWeather;
use common::clients::{CatalogClient, ClientAdapter, GiphyClient, SlackClient, SqlClient, WeatherClient};
use common::AppResult;
#[cfg(test)]
use mockall::automock;
use serde_json::{json, Value};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait GifSearch: Send + Sync {
    async fn search(&self, query: &str, limit: u32) -> AppResult<Vec<String>>;
}

#[async_trait]
impl GifSearch for GiphyClient {
    async fn search(&self, query: &str, limit: u32) -> AppResult<Vec<String>> {
        self.search(query, limit).await
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChatNotifier: Send + Sync {
    async fn post_message(&self, channel: &str, text: &str) -> AppResult<String>;
}

#[async_trait]
impl ChatNotifier for SlackClient {
    async fn post_message(&self, channel: &str, text: &str) -> AppResult<String> {
        self.post_message(channel, text).await
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait WeatherApi: Send + Sync {
    async fn current(&self, latitude: f64, longitude: f64) -> AppResult<CurrentWeather>;
}

#[async_trait]
impl WeatherApi for WeatherClient {
    async fn current(&self, latitude: f64, longitude: f64) -> AppResult<CurrentWeather> {
        self.current(latitude, longitude).await
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait AssetCatalog: Send + Sync {
    async fn search_assets(&self, request: &SearchAssetsRequest) -> AppResult<AssetPage>;
    async fn add_tag(&self, guids: &[String], tag: &str) -> AppResult<u64>;
}

#[async_trait]
impl AssetCatalog for CatalogClient {
    async fn search_assets(&self, request: &SearchAssetsRequest) -> AppResult<AssetPage> {
        self.search_assets(request).await
    }

    async fn add_tag(&self, guids: &[String], tag: &str) -> AppResult<u64> {
        self.add_tag(guids, tag).await
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait SqlSource: Send + Sync {
    async fn preflight(&self) -> AppResult<Value>;
    async fn list_tables(&self, schema: Option<String>) -> AppResult<Vec<String>>;
}

#[async_trait]
impl SqlSource for SqlClient {
    async fn preflight(&self) -> AppResult<Value> {
        SqlClient::preflight(self).await
    }

    async fn list_tables(&self, schema: Option<String>) -> AppResult<Vec<String>> {
        let result = self
            .call("list_tables", json!({ "schema": schema }))
            .await?;
        Ok(serde_json::from_value(result["tables"].clone())?)
    }
}
