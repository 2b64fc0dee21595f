//! Request handlers for the gateway's public surface.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use weather_core::{
    StoredRecord, WeatherRecord, city_from_key, city_key, generate_weather_text,
};

use crate::app::AppState;

/// Cities ingested on every `/ingest` run; response ordering follows this list.
const CITIES: [&str; 5] = ["Hyderabad", "London", "New York", "Tokyo", "Sydney"];

const STORED_MARKER: &str = "✔ Stored";

const AI_TEST_PROMPT: &str = "Generate ONLY a JSON object:\n\
    {\n  \"summary\": \"test-summary\",\n  \"mood\": \"test-mood\"\n}";

const AI_DEBUG_PROMPT: &str = "Describe the weather in JSON:\n\
    {\n  \"summary\": \"...\",\n  \"mood\": \"...\"\n}";

/// Propagating error path: any unhandled failure becomes a 500 with a
/// minimal JSON body.
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

pub async fn home() -> Json<Value> {
    Json(json!({ "message": "Weather API running" }))
}

/// CORS preflight acknowledgement; the headers themselves are attached by
/// the response post-processing layers.
pub async fn preflight() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Run the ingestion pipeline over the fixed city list, strictly
/// sequentially. Failures are isolated per city: the city's entry in the
/// status map carries the error text and iteration continues. The endpoint
/// itself always answers 200.
pub async fn ingest(State(state): State<AppState>) -> Json<Value> {
    let mut results = serde_json::Map::new();

    for city in CITIES {
        let status = match ingest_city(&state, city).await {
            Ok(()) => STORED_MARKER.to_string(),
            Err(e) => {
                tracing::error!("Error for {city}: {e}");
                format!("❌ {e}")
            }
        };
        results.insert(city.to_string(), Value::String(status));
    }

    Json(Value::Object(results))
}

/// Per-city pipeline: forecast lookup, text generation, store write.
///
/// Generation never fails (it absorbs its own errors into fallback text);
/// lookup and write errors surface here and are reported for this city only.
async fn ingest_city(state: &AppState, city: &str) -> anyhow::Result<()> {
    let conditions = state.forecast.lookup_weather(city).await?;

    let text = generate_weather_text(
        state.model.as_ref(),
        city,
        conditions.temperature,
        conditions.wind_speed,
    )
    .await;

    let record = StoredRecord::new(conditions, text);
    state.store.write(&city_key(city), &record).await?;

    Ok(())
}

/// All stored records, each annotated with the city derived from its key.
/// Unlike ingestion there is no per-item isolation: the first unreadable
/// record aborts the request.
pub async fn weather_all(State(state): State<AppState>) -> Result<Json<Vec<WeatherRecord>>, AppError> {
    let keys = state.store.list_keys().await?;

    let mut records = Vec::with_capacity(keys.len());
    for key in keys {
        let stored = state.store.read(&key).await?;
        records.push(stored.into_record(city_from_key(&key)));
    }

    Ok(Json(records))
}

/// One record by city name. Existence is checked against the live key
/// listing rather than probing the blob directly.
pub async fn weather_city(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Response, AppError> {
    let key = city_key(&city);

    if !state.store.list_keys().await?.contains(&key) {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "City not found" })),
        )
            .into_response());
    }

    let stored = state.store.read(&key).await?;
    Ok(Json(stored.into_record(city_from_key(&key))).into_response())
}

/// One fixed-prompt model call; confirms the model is reachable and
/// returning text.
pub async fn ai_test(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let raw = state.model.generate(AI_TEST_PROMPT).await?;
    Ok(Json(json!({ "raw_response": raw })))
}

/// Raw model output for prompt inspection; failures propagate.
pub async fn ai_debug(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let raw = state.model.generate(AI_DEBUG_PROMPT).await?;
    Ok(Json(json!({ "full_text": raw })))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use anyhow::anyhow;
    use async_trait::async_trait;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{HeaderMap, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use weather_core::{
        CurrentConditions, ForecastProvider, GenerativeModel, ObjectStore, ProviderError,
        StoreError, StoredRecord, city_key,
    };

    use crate::app::{AppState, build_router};

    /// In-memory object store; `fail_reads` simulates an unreadable blob.
    #[derive(Debug, Default)]
    struct MemStore {
        blobs: Mutex<BTreeMap<String, StoredRecord>>,
        fail_reads: bool,
    }

    fn decode_error() -> serde_json::Error {
        serde_json::from_str::<StoredRecord>("garbage").unwrap_err()
    }

    #[async_trait]
    impl ObjectStore for MemStore {
        async fn list_keys(&self) -> Result<Vec<String>, StoreError> {
            Ok(self.blobs.lock().unwrap().keys().cloned().collect())
        }

        async fn read(&self, key: &str) -> Result<StoredRecord, StoreError> {
            if self.fail_reads {
                return Err(StoreError::Decode {
                    what: format!("stored record '{key}'"),
                    source: decode_error(),
                });
            }

            self.blobs.lock().unwrap().get(key).cloned().ok_or_else(|| StoreError::Decode {
                what: format!("stored record '{key}'"),
                source: decode_error(),
            })
        }

        async fn write(&self, key: &str, record: &StoredRecord) -> Result<(), StoreError> {
            self.blobs.lock().unwrap().insert(key.to_string(), record.clone());
            Ok(())
        }
    }

    #[derive(Debug)]
    struct FakeModel {
        reply: Option<&'static str>,
    }

    #[async_trait]
    impl GenerativeModel for FakeModel {
        async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
            self.reply.map(str::to_string).ok_or_else(|| anyhow!("model unavailable"))
        }
    }

    #[derive(Debug)]
    struct FakeForecast {
        fail_city: Option<&'static str>,
    }

    #[async_trait]
    impl ForecastProvider for FakeForecast {
        async fn lookup_weather(&self, city: &str) -> Result<CurrentConditions, ProviderError> {
            if self.fail_city == Some(city) {
                return Err(ProviderError::CityNotFound { city: city.to_string() });
            }
            Ok(CurrentConditions { temperature: 21.5, wind_speed: 10.0 })
        }
    }

    fn router_with(store: Arc<MemStore>, model: FakeModel, forecast: FakeForecast) -> Router {
        build_router(AppState {
            store,
            model: Arc::new(model),
            forecast: Arc::new(forecast),
        })
    }

    fn healthy_router(store: Arc<MemStore>) -> Router {
        router_with(
            store,
            FakeModel { reply: Some(r#"{"summary": "Mild", "mood": "calm"}"#) },
            FakeForecast { fail_city: None },
        )
    }

    async fn send(router: Router, method: Method, uri: &str) -> (StatusCode, HeaderMap, Value) {
        let response = router
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, headers, body)
    }

    fn assert_cors_headers(headers: &HeaderMap) {
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(headers["access-control-allow-methods"], "GET, OPTIONS");
        assert_eq!(headers["access-control-allow-headers"], "Content-Type");
    }

    #[tokio::test]
    async fn home_reports_liveness() {
        let router = healthy_router(Arc::new(MemStore::default()));
        let (status, headers, body) = send(router, Method::GET, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "message": "Weather API running" }));
        assert_cors_headers(&headers);
    }

    #[tokio::test]
    async fn preflight_acknowledges_with_cors_headers() {
        for uri in ["/ingest", "/weather/all", "/weather/London"] {
            let router = healthy_router(Arc::new(MemStore::default()));
            let (status, headers, body) = send(router, Method::OPTIONS, uri).await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, serde_json::json!({ "status": "ok" }));
            assert_cors_headers(&headers);
        }
    }

    #[tokio::test]
    async fn ingest_stores_every_city() {
        let store = Arc::new(MemStore::default());
        let router = healthy_router(store.clone());

        let (status, _, body) = send(router, Method::GET, "/ingest").await;

        assert_eq!(status, StatusCode::OK);

        let results = body.as_object().expect("status map");
        assert_eq!(results.len(), 5);
        assert!(results.values().all(|v| *v == "✔ Stored"));

        let blobs = store.blobs.lock().unwrap();
        assert_eq!(blobs.len(), 5);
        assert!(blobs.contains_key("weather_New_York.json"));
        assert_eq!(blobs["weather_London.json"].temperature, 21.5);
        assert_eq!(blobs["weather_London.json"].summary, "Mild");
    }

    #[tokio::test]
    async fn ingest_response_follows_city_list_order() {
        let router = healthy_router(Arc::new(MemStore::default()));
        let (_, _, body) = send(router, Method::GET, "/ingest").await;

        let keys: Vec<&str> = body.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["Hyderabad", "London", "New York", "Tokyo", "Sydney"]);
    }

    #[tokio::test]
    async fn ingest_isolates_a_failing_city() {
        let store = Arc::new(MemStore::default());
        let router = router_with(
            store.clone(),
            FakeModel { reply: Some(r#"{"summary": "Mild", "mood": "calm"}"#) },
            FakeForecast { fail_city: Some("London") },
        );

        let (status, _, body) = send(router, Method::GET, "/ingest").await;

        assert_eq!(status, StatusCode::OK);

        let results = body.as_object().expect("status map");
        let london = results["London"].as_str().unwrap();
        assert!(london.starts_with('❌'));
        assert!(london.contains("No geocoding results"));

        for city in ["Hyderabad", "New York", "Tokyo", "Sydney"] {
            assert_eq!(results[city], "✔ Stored");
        }

        // The failing city never reached the store.
        assert_eq!(store.blobs.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn ingest_absorbs_model_failures_as_fallback_text() {
        let store = Arc::new(MemStore::default());
        let router = router_with(
            store.clone(),
            FakeModel { reply: None },
            FakeForecast { fail_city: None },
        );

        let (_, _, body) = send(router, Method::GET, "/ingest").await;

        // Generation failures never become per-city errors.
        assert!(body.as_object().unwrap().values().all(|v| *v == "✔ Stored"));

        let blobs = store.blobs.lock().unwrap();
        assert_eq!(blobs["weather_Tokyo.json"].summary, "AI error");
        assert_eq!(blobs["weather_Tokyo.json"].mood, "unknown");
    }

    #[tokio::test]
    async fn ingesting_twice_overwrites_in_place() {
        let store = Arc::new(MemStore::default());

        let first = router_with(
            store.clone(),
            FakeModel { reply: Some(r#"{"summary": "First pass", "mood": "calm"}"#) },
            FakeForecast { fail_city: None },
        );
        send(first, Method::GET, "/ingest").await;

        let second = router_with(
            store.clone(),
            FakeModel { reply: Some(r#"{"summary": "Second pass", "mood": "breezy"}"#) },
            FakeForecast { fail_city: None },
        );
        send(second, Method::GET, "/ingest").await;

        let blobs = store.blobs.lock().unwrap();
        assert_eq!(blobs.len(), 5);
        assert_eq!(blobs["weather_Sydney.json"].summary, "Second pass");
        assert_eq!(blobs["weather_Sydney.json"].mood, "breezy");
    }

    #[tokio::test]
    async fn weather_all_annotates_each_record_with_its_city() {
        let store = Arc::new(MemStore::default());
        store
            .write(
                &city_key("London"),
                &StoredRecord {
                    temperature: 11.0,
                    wind_speed: 19.0,
                    summary: "Drizzle".to_string(),
                    mood: "soggy".to_string(),
                },
            )
            .await
            .unwrap();
        store
            .write(
                &city_key("New York"),
                &StoredRecord {
                    temperature: 24.0,
                    wind_speed: 8.0,
                    summary: "Bright".to_string(),
                    mood: "upbeat".to_string(),
                },
            )
            .await
            .unwrap();

        let router = healthy_router(store);
        let (status, _, body) = send(router, Method::GET, "/weather/all").await;

        assert_eq!(status, StatusCode::OK);

        let records = body.as_array().expect("record array");
        assert_eq!(records.len(), 2);

        let cities: Vec<&str> =
            records.iter().map(|r| r["city"].as_str().unwrap()).collect();
        assert_eq!(cities, ["London", "New York"]);

        for record in records {
            let object = record.as_object().unwrap();
            assert_eq!(object.len(), 5);
            for field in ["city", "temperature", "wind_speed", "summary", "mood"] {
                assert!(object.contains_key(field), "missing field {field}");
            }
        }
    }

    #[tokio::test]
    async fn weather_all_fails_on_first_unreadable_record() {
        let store = Arc::new(MemStore {
            blobs: Mutex::new(BTreeMap::from([(
                city_key("London"),
                StoredRecord {
                    temperature: 11.0,
                    wind_speed: 19.0,
                    summary: "Drizzle".to_string(),
                    mood: "soggy".to_string(),
                },
            )])),
            fail_reads: true,
        });

        let router = healthy_router(store);
        let (status, headers, body) = send(router, Method::GET, "/weather/all").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("Failed to decode"));
        assert_cors_headers(&headers);
    }

    #[tokio::test]
    async fn weather_city_returns_the_annotated_record() {
        let store = Arc::new(MemStore::default());
        store
            .write(
                &city_key("New York"),
                &StoredRecord {
                    temperature: 24.0,
                    wind_speed: 8.0,
                    summary: "Bright".to_string(),
                    mood: "upbeat".to_string(),
                },
            )
            .await
            .unwrap();

        let router = healthy_router(store);
        let (status, _, body) = send(router, Method::GET, "/weather/New%20York").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["city"], "New York");
        assert_eq!(body["temperature"], 24.0);
        assert_eq!(body["summary"], "Bright");
    }

    #[tokio::test]
    async fn weather_city_answers_404_for_unknown_cities() {
        let router = healthy_router(Arc::new(MemStore::default()));
        let (status, headers, body) = send(router, Method::GET, "/weather/Atlantis").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({ "error": "City not found" }));
        assert_cors_headers(&headers);
    }

    #[tokio::test]
    async fn ai_test_reports_raw_model_output() {
        let router = router_with(
            Arc::new(MemStore::default()),
            FakeModel { reply: Some("{\"summary\": \"test-summary\"}") },
            FakeForecast { fail_city: None },
        );

        let (status, _, body) = send(router, Method::GET, "/ai-test").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["raw_response"], "{\"summary\": \"test-summary\"}");
    }

    #[tokio::test]
    async fn ai_test_surfaces_model_failure_as_500() {
        let router = router_with(
            Arc::new(MemStore::default()),
            FakeModel { reply: None },
            FakeForecast { fail_city: None },
        );

        let (status, _, body) = send(router, Method::GET, "/ai-test").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("model unavailable"));
    }

    #[tokio::test]
    async fn ai_debug_reports_full_model_output() {
        let router = router_with(
            Arc::new(MemStore::default()),
            FakeModel { reply: Some("The weather is nice.") },
            FakeForecast { fail_city: None },
        );

        let (status, _, body) = send(router, Method::GET, "/ai-debug").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["full_text"], "The weather is nice.");
    }
}
