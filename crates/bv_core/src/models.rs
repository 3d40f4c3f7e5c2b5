use async_trait::async_trait;
use crate::Result;

#[async_trait]
pub trait InferenceModel: Send + Sync {
    /// Provider name, for logs
    fn name(&self) -> &str;

    /// Generate a completion for a single user prompt
    async fn generate_text(&self, prompt: &str, max_tokens: u32) -> Result<String>;

    /// Generate an embedding vector for semantic search
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>>;
}
