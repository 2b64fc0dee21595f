use serde::{Deserialize, Serialize};

/// Fallback summary used whenever generation or parsing fails.
pub const SUMMARY_FALLBACK: &str = "AI error";
/// Fallback mood used whenever generation or parsing fails.
pub const MOOD_FALLBACK: &str = "unknown";

/// Current conditions returned by the forecast lookup.
///
/// Both readings are passed through verbatim from the forecast source;
/// nothing in this crate computes or rounds them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentConditions {
    pub temperature: f64,
    pub wind_speed: f64,
}

/// Text produced by the generation adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedText {
    pub summary: String,
    pub mood: String,
}

impl GeneratedText {
    /// The fixed fallback pair.
    pub fn fallback() -> Self {
        Self {
            summary: SUMMARY_FALLBACK.to_string(),
            mood: MOOD_FALLBACK.to_string(),
        }
    }
}

/// The unit of persistence: one JSON blob per city.
///
/// The city itself is not stored; it is derived from the blob name on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub temperature: f64,
    pub wind_speed: f64,
    pub summary: String,
    pub mood: String,
}

impl StoredRecord {
    pub fn new(conditions: CurrentConditions, text: GeneratedText) -> Self {
        Self {
            temperature: conditions.temperature,
            wind_speed: conditions.wind_speed,
            summary: text.summary,
            mood: text.mood,
        }
    }

    /// Annotate with a display name, usually derived from the storage key.
    pub fn into_record(self, city: String) -> WeatherRecord {
        WeatherRecord {
            city,
            temperature: self.temperature,
            wind_speed: self.wind_speed,
            summary: self.summary,
            mood: self.mood,
        }
    }
}

/// The unit of API response: a stored record annotated with its city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub city: String,
    pub temperature: f64,
    pub wind_speed: f64,
    pub summary: String,
    pub mood: String,
}
