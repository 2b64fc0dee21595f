use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::model::CurrentConditions;

use super::{ForecastProvider, ProviderError};

const GEOCODING_BASE_URL: &str = "https://geocoding-api.open-meteo.com";
const FORECAST_BASE_URL: &str = "https://api.open-meteo.com";

/// Open-Meteo implementation: a free-text geocoding search followed by a
/// current-weather forecast lookup. No API key required.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    http: Client,
    geocoding_base_url: String,
    forecast_base_url: String,
}

impl OpenMeteoProvider {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
            geocoding_base_url: GEOCODING_BASE_URL.to_string(),
            forecast_base_url: FORECAST_BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn new_with_base_urls(geocoding: &str, forecast: &str) -> Self {
        Self {
            http: Client::new(),
            geocoding_base_url: geocoding.to_string(),
            forecast_base_url: forecast.to_string(),
        }
    }

    /// First geocoding result for `city`.
    async fn geocode(&self, city: &str) -> Result<GeoResult, ProviderError> {
        let url = format!("{}/v1/search", self.geocoding_base_url);

        let res = self.http.get(&url).query(&[("name", city)]).send().await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(ProviderError::UnexpectedStatus {
                endpoint: "geocoding",
                status,
                body: truncate_body(&body),
            });
        }

        let parsed: GeoResponse = serde_json::from_str(&body)
            .map_err(|source| ProviderError::Malformed { endpoint: "geocoding", source })?;

        parsed
            .results
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::CityNotFound { city: city.to_string() })
    }

    async fn current_weather(&self, lat: f64, lon: f64) -> Result<CurrentConditions, ProviderError> {
        let url = format!("{}/v1/forecast", self.forecast_base_url);

        let latitude = lat.to_string();
        let longitude = lon.to_string();

        let res = self
            .http
            .get(&url)
            .query(&[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("current_weather", "true"),
                ("timezone", "auto"),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(ProviderError::UnexpectedStatus {
                endpoint: "forecast",
                status,
                body: truncate_body(&body),
            });
        }

        let parsed: ForecastResponse = serde_json::from_str(&body)
            .map_err(|source| ProviderError::Malformed { endpoint: "forecast", source })?;

        Ok(CurrentConditions {
            temperature: parsed.current_weather.temperature,
            wind_speed: parsed.current_weather.windspeed,
        })
    }
}

impl Default for OpenMeteoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    results: Option<Vec<GeoResult>>,
}

#[derive(Debug, Deserialize)]
struct GeoResult {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: CurrentWeatherBody,
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherBody {
    temperature: f64,
    windspeed: f64,
}

#[async_trait]
impl ForecastProvider for OpenMeteoProvider {
    async fn lookup_weather(&self, city: &str) -> Result<CurrentConditions, ProviderError> {
        let place = self.geocode(city).await?;
        self.current_weather(place.latitude, place.longitude).await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        format!("{}...", &body[..MAX])
    } else {
        body.to_string()
    }
}
