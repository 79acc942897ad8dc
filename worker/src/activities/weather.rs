use crate::ports::WeatherApi;
use common::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityWeather {
    pub city: String,
    pub temperature: f64,
    pub windspeed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub cities: usize,
    pub mean_temperature: Option<f64>,
    pub warmest: Option<String>,
    pub readings: Vec<CityWeather>,
}

pub fn summarize(readings: Vec<CityWeather>) -> WeatherReport {
    let mean_temperature = if readings.is_empty() {
        None
    } else {
        Some(readings.iter().map(|r| r.temperature).sum::<f64>() / readings.len() as f64)
    };
    let warmest = readings
        .iter()
        .max_by(|a, b| a.temperature.total_cmp(&b.temperature))
        .map(|r| r.city.clone());

    WeatherReport {
        cities: readings.len(),
        mean_temperature,
        warmest,
        readings,
    }
}

pub struct WeatherActivities {
    weather: Arc<dyn WeatherApi>,
}

impl WeatherActivities {
    pub fn new(weather: Arc<dyn WeatherApi>) -> Self {
        Self { weather }
    }

    pub async fn fetch_current_weather(&self, city: City) -> AppResult<CityWeather> {
        if !(-90.0..=90.0).contains(&city.latitude) || !(-180.0..=180.0).contains(&city.longitude)
        {
            return Err(AppError::Validation(format!(
                "coordinates for '{}' are out of range",
                city.name
            )));
        }

        let current = self.weather.current(city.latitude, city.longitude).await?;
        Ok(CityWeather {
            city: city.name,
            temperature: current.temperature,
            windspeed: current.windspeed,
        })
    }

    pub async fn summarize_weather(&self, readings: Vec<CityWeather>) -> AppResult<WeatherReport> {
        Ok(summarize(readings))
    }
}
