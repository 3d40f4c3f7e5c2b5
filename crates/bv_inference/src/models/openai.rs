use async_trait::async_trait;
use bv_core::{Error, InferenceModel, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use crate::{Config, Provider};
use super::{fallback_embedder, read_json};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const EMBEDDING_MODEL: &str = "text-embedding-ada-002";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

fn completion_text(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| Error::Inference("Chat completion returned no content".into()))
}

fn first_embedding(response: EmbeddingResponse) -> Result<Vec<f32>> {
    response
        .data
        .into_iter()
        .next()
        .map(|data| data.embedding)
        .filter(|vector| !vector.is_empty())
        .ok_or_else(|| Error::Inference("Embedding response was empty".into()))
}

fn http_client() -> Result<Arc<Client>> {
    Ok(Arc::new(Client::builder().timeout(REQUEST_TIMEOUT).build()?))
}

/// `/embeddings` client, shared by providers that lack their own endpoint.
#[derive(Clone)]
pub struct OpenAIEmbedder {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
}

impl OpenAIEmbedder {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: Arc::new(Client::new()),
            api_key,
            base_url,
        }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            input: text,
            model: EMBEDDING_MODEL,
        };
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        first_embedding(read_json(response).await?)
    }
}

/// OpenAI chat completions. Groq serves the same API under another base URL.
pub struct OpenAIModel {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
    model: String,
    provider: Provider,
    embedder: Option<OpenAIEmbedder>,
}

impl OpenAIModel {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.require_api_key()?;
        let default_base = match config.provider {
            Provider::Groq => GROQ_BASE_URL,
            _ => OPENAI_BASE_URL,
        };
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base.to_string())
            .trim_end_matches('/')
            .to_string();
        let embedder = match config.provider {
            Provider::Groq => fallback_embedder(config),
            _ => Some(OpenAIEmbedder::new(api_key.clone(), base_url.clone())),
        };
        Ok(Self {
            client: http_client()?,
            api_key,
            base_url,
            model: config.model(),
            provider: config.provider,
            embedder,
        })
    }
}

impl fmt::Debug for OpenAIModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAIModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl InferenceModel for OpenAIModel {
    fn name(&self) -> &str {
        match self.provider {
            Provider::Groq => "groq",
            _ => "openai",
        }
    }

    async fn generate_text(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
        };
        debug!("{} chat completion with {}", self.name(), self.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        completion_text(read_json(response).await?)
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        match &self.embedder {
            Some(embedder) => embedder.embed(text).await,
            None => Err(Error::Inference(format!(
                "{} has no embedding endpoint; set OPENAI_API_KEY to embed with {}",
                self.name(),
                EMBEDDING_MODEL
            ))),
        }
    }
}
