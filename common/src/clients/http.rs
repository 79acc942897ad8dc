use crate::error::{AppError, AppResult};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const ERROR_BODY_LIMIT: usize = 512;

/// Shared reqwest session used by the REST adapters.
pub struct HttpSession {
    client: Client,
    base_url: String,
}

impl HttpSession {
    pub fn new(base_url: &str, headers: HeaderMap) -> AppResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(AppError::Configuration(format!(
                "base url '{}' must start with http:// or https://",
                base_url
            )));
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> AppResult<Value> {
        tracing::debug!(path, "GET");
        let resp = self.client.get(self.url(path)).query(query).send().await?;
        Self::into_json(path, resp).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> AppResult<Value> {
        tracing::debug!(path, "POST");
        let resp = self.client.post(self.url(path)).json(body).send().await?;
        Self::into_json(path, resp).await
    }

    async fn into_json(path: &str, resp: Response) -> AppResult<Value> {
        let status = resp.status();
        if !status.is_success() {
            let mut body = resp.text().await.unwrap_or_default();
            if body.len() > ERROR_BODY_LIMIT {
                let mut cut = ERROR_BODY_LIMIT;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(AppError::remote(
                Some(status.as_u16()),
                format!("{} returned {}: {}", path, status, body),
            ));
        }

        resp.json::<Value>().await.map_err(|e| {
            AppError::remote(
                Some(status.as_u16()),
                format!("{} returned an unreadable body: {}", path, e.without_url()),
            )
        })
    }
}

pub fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("appflow/0.1"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

pub fn bearer_headers(token: &str) -> AppResult<HeaderMap> {
    let mut headers = json_headers();
    let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
        AppError::Configuration("token contains characters not allowed in a header".to_string())
    })?;
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}
