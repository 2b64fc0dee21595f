use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::auth::TokenSource;

use super::GenerativeModel;

/// Region the model is served from. Fixed, not configurable.
const VERTEX_LOCATION: &str = "us-central1";
const MODEL_NAME: &str = "gemini-2.0-flash";

/// Vertex AI `generateContent` client for the Gemini model family.
#[derive(Debug, Clone)]
pub struct VertexModel {
    http: Client,
    project_id: String,
    base_url: String,
    token: TokenSource,
}

impl VertexModel {
    pub fn new(project_id: String, token: TokenSource) -> Self {
        Self {
            http: Client::new(),
            project_id,
            base_url: format!("https://{VERTEX_LOCATION}-aiplatform.googleapis.com"),
            token,
        }
    }

    #[cfg(test)]
    fn new_with_base_url(project_id: &str, token: TokenSource, base_url: &str) -> Self {
        Self {
            http: Client::new(),
            project_id: project_id.to_string(),
            base_url: base_url.to_string(),
            token,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            self.base_url, self.project_id, VERTEX_LOCATION, MODEL_NAME
        )
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Text of the first candidate part that carries any.
fn first_candidate_text(response: GenerateContentResponse) -> Option<String> {
    response
        .candidates?
        .into_iter()
        .next()?
        .content?
        .parts?
        .into_iter()
        .find_map(|part| part.text)
}

#[async_trait]
impl GenerativeModel for VertexModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let token = self.token.token().await?;

        let request = GenerateContentRequest {
            contents: vec![Content { role: "user", parts: vec![Part { text: prompt }] }],
        };

        let res = self
            .http
            .post(self.endpoint())
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Vertex AI")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read Vertex AI response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Vertex AI request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).context("Failed to parse Vertex AI JSON")?;

        first_candidate_text(parsed)
            .ok_or_else(|| anyhow!("Vertex AI response contained no candidate text"))
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
