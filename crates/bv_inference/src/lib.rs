use bv_core::{Error, Result, RetryPolicy};
use std::fmt;
use std::str::FromStr;

pub mod embeddings;
pub mod generator;
pub mod models;

pub const DEFAULT_MAX_TOKENS: u32 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    #[default]
    Gemini,
    Anthropic,
    OpenAI,
    Groq,
    Dummy,
}

impl Provider {
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-1.5-flash",
            Provider::Anthropic => "claude-3-haiku-20240307",
            Provider::OpenAI => "gpt-3.5-turbo",
            Provider::Groq => "llama-3.1-70b-versatile",
            Provider::Dummy => "dummy",
        }
    }

    /// Environment variable holding this provider's key
    pub fn api_key_var(&self) -> Option<&'static str> {
        match self {
            Provider::Gemini => Some("GEMINI_API_KEY"),
            Provider::Anthropic => Some("ANTHROPIC_API_KEY"),
            Provider::OpenAI => Some("OPENAI_API_KEY"),
            Provider::Groq => Some("GROQ_API_KEY"),
            Provider::Dummy => None,
        }
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "anthropic" => Ok(Provider::Anthropic),
            "openai" => Ok(Provider::OpenAI),
            "groq" => Ok(Provider::Groq),
            "dummy" => Ok(Provider::Dummy),
            other => Err(Error::Inference(format!("Unsupported LLM provider: {}", other))),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::Gemini => "gemini",
            Provider::Anthropic => "anthropic",
            Provider::OpenAI => "openai",
            Provider::Groq => "groq",
            Provider::Dummy => "dummy",
        };
        f.write_str(name)
    }
}

#[derive(Clone)]
pub struct Config {
    pub provider: Provider,
    pub model_name: Option<String>,
    pub api_key: Option<String>,
    /// OpenAI key used for embeddings by providers without an embedding endpoint
    pub embedding_api_key: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model_name: None,
            api_key: None,
            embedding_api_key: None,
            base_url: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    pub fn dummy() -> Self {
        Self {
            provider: Provider::Dummy,
            ..Self::default()
        }
    }

    pub fn model(&self) -> String {
        self.model_name
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    pub(crate) fn require_api_key(&self) -> Result<String> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key.to_string()),
            _ => Err(Error::Inference(format!(
                "{} requires an API key; set {}",
                self.provider,
                self.provider.api_key_var().unwrap_or("an API key")
            ))),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("Config")
            .field("provider", &self.provider)
            .field("model_name", &self.model_name)
            .field("api_key", &redact(&self.api_key))
            .field("embedding_api_key", &redact(&self.embedding_api_key))
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("retry", &self.retry)
            .finish()
    }
}

pub mod prelude {
    pub use super::embeddings::EmbeddingGenerator;
    pub use super::generator::{ArticleDraft, ArticleGenerator};
    pub use super::models::create_model;
    pub use super::{Config, Provider};
    pub use bv_core::{Error, InferenceModel, Result};
}

pub use models::create_model;
