use super::http::{bearer_headers, HttpSession};
use super::{not_loaded, param_str, unknown_operation, ClientAdapter, Credentials};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;

pub const DEFAULT_BASE_URL: &str = "https://slack.com/api";

/// Chat delivery through the Slack Web API.
pub struct SlackClient {
    session: RwLock<Option<HttpSession>>,
}

impl Default for SlackClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SlackClient {
    pub fn new() -> Self {
        Self {
            session: RwLock::new(None),
        }
    }

    /// Posts `text` to `channel` and returns the message timestamp.
    pub async fn post_message(&self, channel: &str, text: &str) -> AppResult<String> {
        let result = self
            .call("post_message", json!({ "channel": channel, "text": text }))
            .await?;
        Ok(result["ts"].as_str().unwrap_or_default().to_string())
    }
}

#[async_trait]
impl ClientAdapter for SlackClient {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn load(&self, credentials: &Credentials) -> AppResult<()> {
        let token = credentials.require("token")?;
        let base_url = credentials.get("base_url").unwrap_or(DEFAULT_BASE_URL);
        let http = HttpSession::new(base_url, bearer_headers(token)?)?;

        *self.session.write().await = Some(http);
        tracing::info!(base_url, "Slack client loaded");
        Ok(())
    }

    async fn call(&self, operation: &str, params: Value) -> AppResult<Value> {
        let guard = self.session.read().await;
        let http = guard.as_ref().ok_or_else(|| not_loaded(self.name()))?;

        match operation {
            "post_message" => {
                let channel = param_str(&params, "channel")?;
                let text = param_str(&params, "text")?;
                let body = http
                    .post_json(
                        "/chat.postMessage",
                        &json!({ "channel": channel, "text": text }),
                    )
                    .await?;

                // Slack answers 200 even for rejected messages.
                if body.get("ok").and_then(Value::as_bool) != Some(true) {
                    let reason = body
                        .get("error")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown_error");
                    return Err(AppError::remote(
                        None,
                        format!("slack rejected message to {}: {}", channel, reason),
                    ));
                }

                Ok(json!({ "channel": channel, "ts": body.get("ts").cloned().unwrap_or(Value::Null) }))
            }
            other => Err(unknown_operation(self.name(), other)),
        }
    }

    async fn close(&self) -> AppResult<()> {
        if self.session.write().await.take().is_some() {
            tracing::info!("Slack client closed");
        }
        Ok(())
    }

    async fn is_loaded(&self) -> bool {
        self.session.read().await.is_some()
    }
}
