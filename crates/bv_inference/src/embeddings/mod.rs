use std::sync::Arc;
use bv_core::{Article, ArticleEmbedding, Error, InferenceModel, Result};

/// Embedding input is capped well below provider token limits.
const MAX_EMBEDDING_CHARS: usize = 8000;

pub struct EmbeddingGenerator {
    model: Arc<dyn InferenceModel>,
}

impl EmbeddingGenerator {
    pub fn new(model: Arc<dyn InferenceModel>) -> Self {
        Self { model }
    }

    pub fn article_text(article: &Article) -> String {
        let text = format!("{}\n\n{}\n\n{}", article.title, article.summary, article.content);
        text.chars().take(MAX_EMBEDDING_CHARS).collect()
    }

    pub async fn generate_article_embedding(&self, article: &Article) -> Result<ArticleEmbedding> {
        let vector = self.generate_text_embedding(&Self::article_text(article)).await?;
        Ok(ArticleEmbedding {
            article_id: article.id.clone(),
            model: self.model.name().to_string(),
            vector,
        })
    }

    pub async fn generate_text_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self.model.generate_embedding(text).await?;
        if vector.is_empty() {
            return Err(Error::Inference(format!(
                "{} returned an empty embedding",
                self.model.name()
            )));
        }
        Ok(vector)
    }
}
