//! Core library for the weather gateway.
//!
//! This crate defines:
//! - Environment configuration
//! - A shared access-token source for the Google Cloud REST APIs
//! - Adapters over the external collaborators: geocoding/forecast lookup,
//!   text generation, and bucket-oriented object storage
//! - Shared domain models
//!
//! It is used by `weather-server`, but can also be reused by other binaries.

pub mod auth;
pub mod config;
pub mod extract;
pub mod generate;
pub mod model;
pub mod provider;
pub mod store;

pub use auth::TokenSource;
pub use config::Config;
pub use extract::extract_json;
pub use generate::{GenerativeModel, VertexModel, generate_weather_text};
pub use model::{CurrentConditions, GeneratedText, StoredRecord, WeatherRecord};
pub use provider::{ForecastProvider, OpenMeteoProvider, ProviderError};
pub use store::{GcsStore, ObjectStore, StoreError, city_from_key, city_key};
