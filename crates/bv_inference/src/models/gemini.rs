use async_trait::async_trait;
use bv_core::{Error, InferenceModel, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use crate::Config;
use super::read_json;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const EMBEDDING_MODEL: &str = "models/embedding-001";

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

fn candidate_text(response: GenerateResponse) -> Result<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(Error::Inference("Gemini returned no candidates".into()));
    }
    Ok(text)
}

pub struct GeminiModel {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiModel {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: Arc::new(Client::new()),
            api_key: config.require_api_key()?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: config.model(),
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        let model = model.trim_start_matches("models/");
        format!("{}/models/{}:{}", self.base_url, model, method)
    }
}

impl fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiModel")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl InferenceModel for GeminiModel {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate_text(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: max_tokens,
            },
        };
        debug!("gemini generateContent with {}", self.model);

        let response = self
            .client
            .post(self.endpoint(&self.model, "generateContent"))
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await?;
        candidate_text(read_json(response).await?)
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            model: EMBEDDING_MODEL,
            content: Content {
                parts: vec![Part { text }],
            },
        };
        let response = self
            .client
            .post(self.endpoint(EMBEDDING_MODEL, "embedContent"))
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await?;
        let body: EmbedResponse = read_json(response).await?;
        Ok(body.embedding.values)
    }
}
