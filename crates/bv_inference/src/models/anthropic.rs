use async_trait::async_trait;
use bv_core::{Error, InferenceModel, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use crate::Config;
use super::{fallback_embedder, read_json, OpenAIEmbedder};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

fn response_text(response: MessagesResponse) -> Result<String> {
    let text: String = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .map(|block| block.text)
        .collect();
    if text.trim().is_empty() {
        return Err(Error::Inference("Anthropic returned no text content".into()));
    }
    Ok(text)
}

pub struct AnthropicModel {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
    model: String,
    embedder: Option<OpenAIEmbedder>,
}

impl AnthropicModel {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: Arc::new(Client::new()),
            api_key: config.require_api_key()?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| ANTHROPIC_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: config.model(),
            embedder: fallback_embedder(config),
        })
    }
}

impl fmt::Debug for AnthropicModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicModel")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl InferenceModel for AnthropicModel {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn generate_text(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };
        debug!("anthropic messages with {}", self.model);

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;
        response_text(read_json(response).await?)
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        match &self.embedder {
            Some(embedder) => embedder.embed(text).await,
            None => Err(Error::Inference(
                "anthropic has no embedding endpoint; set OPENAI_API_KEY".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Provider;

    #[test]
    fn test_response_text_skips_non_text_blocks() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{"id":"msg_1","content":[{"type":"thinking","thinking":"..."},{"type":"text","text":"{\"title\":\"x\"}"}]}"#,
        )
        .unwrap();
        assert_eq!(response_text(response).unwrap(), "{\"title\":\"x\"}");

        let empty: MessagesResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert!(response_text(empty).is_err());
    }

    #[tokio::test]
    async fn test_embeddings_fall_back_to_openai_key() {
        let without = AnthropicModel::new(&Config {
            provider: Provider::Anthropic,
            api_key: Some("sk-ant".into()),
            ..Config::default()
        })
        .unwrap();
        assert!(without.embedder.is_none());
        assert!(matches!(
            without.generate_embedding("Konark").await,
            Err(Error::Inference(_))
        ));

        let with = AnthropicModel::new(&Config {
            provider: Provider::Anthropic,
            api_key: Some("sk-ant".into()),
            embedding_api_key: Some("sk-openai".into()),
            ..Config::default()
        })
        .unwrap();
        assert!(with.embedder.is_some());
    }
}
