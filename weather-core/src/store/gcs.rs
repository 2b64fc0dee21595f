use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

use crate::auth::TokenSource;
use crate::model::StoredRecord;

use super::{KEY_PREFIX, KEY_SUFFIX, ObjectStore, StoreError};

const GCS_BASE_URL: &str = "https://storage.googleapis.com";

/// Cloud Storage implementation over the JSON API.
#[derive(Debug, Clone)]
pub struct GcsStore {
    http: Client,
    bucket: String,
    base_url: String,
    token: TokenSource,
}

impl GcsStore {
    pub fn new(bucket: String, token: TokenSource) -> Self {
        Self {
            http: Client::new(),
            bucket,
            base_url: GCS_BASE_URL.to_string(),
            token,
        }
    }

    #[cfg(test)]
    fn new_with_base_url(bucket: &str, token: TokenSource, base_url: &str) -> Self {
        Self {
            http: Client::new(),
            bucket: bucket.to_string(),
            base_url: base_url.to_string(),
            token,
        }
    }

    async fn bearer(&self) -> Result<String, StoreError> {
        self.token.token().await.map_err(StoreError::Auth)
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    items: Option<Vec<ListedObject>>,
}

#[derive(Debug, Deserialize)]
struct ListedObject {
    name: String,
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        let url = format!("{}/storage/v1/b/{}/o", self.base_url, self.bucket);

        let res = self
            .http
            .get(&url)
            .query(&[("prefix", KEY_PREFIX)])
            .bearer_auth(self.bearer().await?)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(StoreError::UnexpectedStatus {
                operation: "list",
                status,
                body: truncate_body(&body),
            });
        }

        let parsed: ListResponse = serde_json::from_str(&body).map_err(|source| {
            StoreError::Decode { what: "object listing".to_string(), source }
        })?;

        Ok(parsed
            .items
            .unwrap_or_default()
            .into_iter()
            .map(|object| object.name)
            .filter(|name| name.starts_with(KEY_PREFIX) && name.ends_with(KEY_SUFFIX))
            .collect())
    }

    async fn read(&self, key: &str) -> Result<StoredRecord, StoreError> {
        let url = format!(
            "{}/storage/v1/b/{}/o/{}",
            self.base_url,
            self.bucket,
            urlencoding::encode(key),
        );

        let res = self
            .http
            .get(&url)
            .query(&[("alt", "media")])
            .bearer_auth(self.bearer().await?)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(StoreError::UnexpectedStatus {
                operation: "read",
                status,
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| StoreError::Decode {
            what: format!("stored record '{key}'"),
            source,
        })
    }

    async fn write(&self, key: &str, record: &StoredRecord) -> Result<(), StoreError> {
        let payload = serde_json::to_string_pretty(record).map_err(|source| {
            StoreError::Encode { what: format!("record '{key}'"), source }
        })?;

        let url = format!("{}/upload/storage/v1/b/{}/o", self.base_url, self.bucket);

        let res = self
            .http
            .post(&url)
            .query(&[("uploadType", "media"), ("name", key)])
            .header(CONTENT_TYPE, "application/json")
            .bearer_auth(self.bearer().await?)
            .body(payload)
            .send()
            .await?;

        let status = res.status();

        if !status.is_success() {
            let body = res.text().await?;
            return Err(StoreError::UnexpectedStatus {
                operation: "write",
                status,
                body: truncate_body(&body),
            });
        }

        Ok(())
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
