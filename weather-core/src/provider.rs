use std::fmt::Debug;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::CurrentConditions;

pub mod open_meteo;

pub use open_meteo::OpenMeteoProvider;

/// Errors from the geocoding/forecast lookups.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The geocoding search returned no results for the requested name.
    /// A missing result list is treated the same as an empty one.
    #[error("No geocoding results for city '{city}'")]
    CityNotFound { city: String },

    #[error("Forecast provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{endpoint} request failed with status {status}: {body}")]
    UnexpectedStatus {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to parse {endpoint} JSON: {source}")]
    Malformed {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Source of current weather readings for a free-text city name.
#[async_trait]
pub trait ForecastProvider: Send + Sync + Debug {
    /// Current temperature and wind speed for `city`.
    ///
    /// No caching and no retry; a miss or malformed upstream reply
    /// propagates to the caller.
    async fn lookup_weather(&self, city: &str) -> Result<CurrentConditions, ProviderError>;
}
