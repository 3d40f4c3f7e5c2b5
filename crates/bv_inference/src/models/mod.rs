use bv_core::{InferenceModel, Result};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::info;
use crate::{Config, Provider};

pub mod anthropic;
pub mod dummy;
pub mod gemini;
pub mod openai;

pub use anthropic::AnthropicModel;
pub use dummy::DummyModel;
pub use gemini::GeminiModel;
pub use openai::{OpenAIEmbedder, OpenAIModel};

/// Builds the configured provider. Hosted providers fail here without a key.
pub fn create_model(config: &Config) -> Result<Arc<dyn InferenceModel>> {
    info!("Using {} provider with model {}", config.provider, config.model());
    let model: Arc<dyn InferenceModel> = match config.provider {
        Provider::Gemini => Arc::new(GeminiModel::new(config)?),
        Provider::Anthropic => Arc::new(AnthropicModel::new(config)?),
        Provider::OpenAI | Provider::Groq => Arc::new(OpenAIModel::new(config)?),
        Provider::Dummy => Arc::new(DummyModel::new()),
    };
    Ok(model)
}

/// Fallback embedder for providers that have no embedding endpoint.
pub(crate) fn fallback_embedder(config: &Config) -> Option<OpenAIEmbedder> {
    config
        .embedding_api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(|key| OpenAIEmbedder::new(key.to_string(), openai::OPENAI_BASE_URL.to_string()))
}

pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let response = response.error_for_status()?;
    Ok(response.json::<T>().await?)
}
