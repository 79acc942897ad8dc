use super::http::{json_headers, HttpSession};
use super::{not_loaded, param_f64, unknown_operation, ClientAdapter, Credentials};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;

pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com/v1";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub temperature: f64,
    pub windspeed: f64,
}

/// Current conditions from an Open-Meteo compatible forecast API.
pub struct WeatherClient {
    session: RwLock<Option<HttpSession>>,
}

impl Default for WeatherClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherClient {
    pub fn new() -> Self {
        Self {
            session: RwLock::new(None),
        }
    }

    pub async fn current(&self, latitude: f64, longitude: f64) -> AppResult<CurrentWeather> {
        let result = self
            .call(
                "current",
                json!({ "latitude": latitude, "longitude": longitude }),
            )
            .await?;
        Ok(serde_json::from_value(result)?)
    }
}

#[async_trait]
impl ClientAdapter for WeatherClient {
    fn name(&self) -> &'static str {
        "weather"
    }

    async fn load(&self, credentials: &Credentials) -> AppResult<()> {
        let base_url = credentials.require("base_url")?;
        let http = HttpSession::new(base_url, json_headers())?;

        *self.session.write().await = Some(http);
        tracing::info!(base_url, "Weather client loaded");
        Ok(())
    }

    async fn call(&self, operation: &str, params: Value) -> AppResult<Value> {
        let guard = self.session.read().await;
        let http = guard.as_ref().ok_or_else(|| not_loaded(self.name()))?;

        match operation {
            "current" => {
                let latitude = param_f64(&params, "latitude")?;
                let longitude = param_f64(&params, "longitude")?;
                let body = http
                    .get_json(
                        "/forecast",
                        &[
                            ("latitude", latitude.to_string()),
                            ("longitude", longitude.to_string()),
                            ("current_weather", "true".to_string()),
                        ],
                    )
                    .await?;

                let current = body.get("current_weather").ok_or_else(|| {
                    AppError::remote(None, "forecast response has no 'current_weather'")
                })?;
                let weather: CurrentWeather =
                    serde_json::from_value(current.clone()).map_err(|e| {
                        AppError::remote(None, format!("malformed current_weather: {}", e))
                    })?;
                Ok(serde_json::to_value(weather)?)
            }
            other => Err(unknown_operation(self.name(), other)),
        }
    }

    async fn close(&self) -> AppResult<()> {
        self.session.write().await.take();
        Ok(())
    }

    async fn is_loaded(&self) -> bool {
        self.session.read().await.is_some()
    }
}
