use std::fmt::Debug;

use async_trait::async_trait;
use serde::Deserialize;

use crate::extract::extract_json;
use crate::model::{GeneratedText, MOOD_FALLBACK, SUMMARY_FALLBACK};

pub mod vertex;

pub use vertex::VertexModel;

/// External text-generation capability.
///
/// The gateway invokes it once per call site; there is no retry.
#[async_trait]
pub trait GenerativeModel: Send + Sync + Debug {
    /// Single completion for `prompt`, returned as raw text.
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Fields the model is asked to produce. Both optional, so a reply missing
/// one field still salvages the other.
#[derive(Debug, Deserialize)]
struct GeneratedFields {
    summary: Option<String>,
    mood: Option<String>,
}

fn build_prompt(city: &str, temperature: f64, wind_speed: f64) -> String {
    format!(
        "You are generating structured weather text.\n\
         \n\
         IMPORTANT RULES:\n\
         - DO NOT modify temperature ({temperature}) or wind ({wind_speed} km/h).\n\
         - DO NOT guess new numeric values.\n\
         - Output MUST be JSON ONLY.\n\
         \n\
         Generate ONLY:\n\
         \n\
         {{\n  \"summary\": \"...\",\n  \"mood\": \"...\"\n}}\n\
         \n\
         City: {city}\n\
         Temperature: {temperature}\n\
         Wind Speed: {wind_speed}"
    )
}

/// Summary and mood for one city's current conditions.
///
/// Every failure along the way — transport error, non-JSON reply, parse
/// error — is logged with the city name and collapsed into the fixed
/// fallback pair. This function never fails; nothing here escalates to the
/// per-city error path of an ingestion run.
pub async fn generate_weather_text(
    model: &dyn GenerativeModel,
    city: &str,
    temperature: f64,
    wind_speed: f64,
) -> GeneratedText {
    let prompt = build_prompt(city, temperature, wind_speed);

    let raw = match model.generate(&prompt).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::error!("AI error ({city}): {e}");
            return GeneratedText::fallback();
        }
    };

    match serde_json::from_str::<GeneratedFields>(extract_json(&raw)) {
        Ok(fields) => GeneratedText {
            summary: fields.summary.unwrap_or_else(|| SUMMARY_FALLBACK.to_string()),
            mood: fields.mood.unwrap_or_else(|| MOOD_FALLBACK.to_string()),
        },
        Err(e) => {
            tracing::error!("AI error ({city}): {e}");
            GeneratedText::fallback()
        }
    }
}
