//! Access tokens for the Google Cloud REST APIs.
//!
//! On the deployment target the instance metadata server hands out tokens
//! for the default service account; locally a token can be supplied directly
//! via `GOOGLE_ACCESS_TOKEN` (e.g. from `gcloud auth print-access-token`).

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

const METADATA_BASE_URL: &str = "http://metadata.google.internal";
const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// A cached token is considered expired this long before its real expiry, so
/// it is never handed out moments before the upstream rejects it.
const EXPIRY_SLACK: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

#[derive(Debug)]
enum Source {
    /// Fixed token from the environment; never refreshed.
    Static(String),

    /// Fetched from the metadata server and cached until expiry.
    Metadata {
        http: Client,
        base_url: String,
        cached: Mutex<Option<CachedToken>>,
    },
}

/// Shared source of bearer tokens for the storage and generation clients.
///
/// Cloning is cheap; clones share one token cache.
#[derive(Debug, Clone)]
pub struct TokenSource {
    inner: Arc<Source>,
}

impl TokenSource {
    /// A fixed token that is returned as-is on every call.
    pub fn fixed(token: impl Into<String>) -> Self {
        Self { inner: Arc::new(Source::Static(token.into())) }
    }

    /// A source backed by the GCE/Cloud Run metadata server.
    pub fn metadata() -> Self {
        Self::metadata_with_base_url(METADATA_BASE_URL)
    }

    pub fn metadata_with_base_url(base_url: &str) -> Self {
        Self {
            inner: Arc::new(Source::Metadata {
                http: Client::new(),
                base_url: base_url.to_string(),
                cached: Mutex::new(None),
            }),
        }
    }

    /// Pick a source from the environment: `GOOGLE_ACCESS_TOKEN` when set
    /// and non-empty, the metadata server otherwise.
    pub fn from_env() -> Self {
        match std::env::var("GOOGLE_ACCESS_TOKEN") {
            Ok(token) if !token.is_empty() => Self::fixed(token),
            _ => Self::metadata(),
        }
    }

    /// Current bearer token, fetching or refreshing as needed.
    pub async fn token(&self) -> Result<String> {
        match &*self.inner {
            Source::Static(token) => Ok(token.clone()),
            Source::Metadata { http, base_url, cached } => {
                let mut guard = cached.lock().await;

                if let Some(entry) = guard.as_ref() {
                    if Instant::now() < entry.expires_at {
                        return Ok(entry.token.clone());
                    }
                }

                let fresh = fetch_metadata_token(http, base_url).await?;
                let token = fresh.token.clone();
                *guard = Some(fresh);

                tracing::debug!("Refreshed metadata access token");
                Ok(token)
            }
        }
    }
}

async fn fetch_metadata_token(http: &Client, base_url: &str) -> Result<CachedToken> {
    let url = format!("{base_url}{TOKEN_PATH}");

    let res = http
        .get(&url)
        .header("Metadata-Flavor", "Google")
        .send()
        .await
        .context("Failed to reach the metadata server")?;

    let status = res.status();
    let body = res.text().await.context("Failed to read metadata token response body")?;

    if !status.is_success() {
        return Err(anyhow!("Metadata token request failed with status {status}: {body}"));
    }

    let parsed: MetadataTokenResponse =
        serde_json::from_str(&body).context("Failed to parse metadata token JSON")?;

    let ttl = Duration::from_secs(parsed.expires_in).saturating_sub(EXPIRY_SLACK);

    Ok(CachedToken {
        token: parsed.access_token,
        expires_at: Instant::now() + ttl,
    })
}
