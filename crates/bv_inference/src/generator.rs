use bv_core::validation::to_tag;
use bv_core::{
    reading_time_minutes, Article, Citation, Error, InferenceModel, Result, RetryPolicy,
    ScrapedContent, Section, DEFAULT_AUTHOR,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use crate::Config;

/// Characters of each source passed to the model.
const SOURCE_EXCERPT_CHARS: usize = 4000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSection {
    pub heading: String,
    pub content: String,
}

/// What the model is asked to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDraft {
    pub title: String,
    pub summary: String,
    pub sections: Vec<DraftSection>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

pub struct ArticleGenerator {
    model: Arc<dyn InferenceModel>,
    retry: RetryPolicy,
    max_tokens: u32,
}

impl ArticleGenerator {
    pub fn new(model: Arc<dyn InferenceModel>, config: &Config) -> Self {
        Self {
            model,
            retry: config.retry,
            max_tokens: config.max_tokens,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn build_prompt(topic: &str, sources: &[ScrapedContent]) -> String {
        let mut prompt = String::from(
            "You are a historian writing for BharatVerse, a daily reader of Indian history.\n\
             Write an engaging, factual article of 1000 to 2000 words using only the source material below.\n",
        );
        prompt.push_str(&format!("Topic: {}\n\n", topic));

        for (i, source) in sources.iter().enumerate() {
            let excerpt: String = source.raw_text.chars().take(SOURCE_EXCERPT_CHARS).collect();
            prompt.push_str(&format!(
                "Source {} ({}): {}\nURL: {}\n{}\n\n",
                i + 1,
                source.source_name(),
                source.title,
                source.source_url,
                excerpt
            ));
        }

        prompt.push_str(
            "Respond with a single JSON object and nothing else:\n\
             {\"title\": string, \"summary\": string (2-3 sentences), \
             \"sections\": [{\"heading\": string, \"content\": string}] (4 to 6 sections), \
             \"tags\": [string] (lowercase kebab-case), \"image_url\": string or null}\n",
        );
        prompt
    }

    /// Accepts bare JSON, a fenced block, or JSON surrounded by prose.
    pub fn parse_draft(text: &str) -> Result<ArticleDraft> {
        let body = extract_json(text)
            .ok_or_else(|| Error::Inference("Model response contained no JSON object".into()))?;
        let draft: ArticleDraft = serde_json::from_str(body)
            .map_err(|e| Error::Inference(format!("Model returned malformed article JSON: {}", e)))?;
        if draft.sections.is_empty() {
            return Err(Error::Inference("Model returned an article without sections".into()));
        }
        Ok(draft)
    }

    pub fn assemble(
        draft: ArticleDraft,
        sources: &[ScrapedContent],
        id: String,
        date: NaiveDate,
    ) -> Article {
        let sections: Vec<Section> = draft
            .sections
            .into_iter()
            .enumerate()
            .map(|(i, section)| Section {
                heading: section.heading.trim().to_string(),
                content: section.content.trim().to_string(),
                order: i as u32 + 1,
            })
            .collect();

        let content = sections
            .iter()
            .map(|s| format!("## {}\n\n{}", s.heading, s.content))
            .collect::<Vec<_>>()
            .join("\n\n");

        let citations = sources
            .iter()
            .map(|source| Citation {
                text: source.title.clone(),
                source_url: source.source_url.clone(),
                source_name: source.source_name().to_string(),
                accessed_date: source.scraped_at,
            })
            .collect();

        let mut tags: Vec<String> = Vec::new();
        for tag in draft.tags.iter().map(|t| to_tag(t)).filter(|t| !t.is_empty()) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        let image_url = draft
            .image_url
            .filter(|url| url.starts_with("http"))
            .or_else(|| {
                sources
                    .iter()
                    .flat_map(|s| s.images.iter())
                    .map(|image| image.url.clone())
                    .next()
            });

        let words = content.split_whitespace().count();
        let now = Utc::now();
        Article {
            id,
            title: draft.title.trim().to_string(),
            summary: draft.summary.trim().to_string(),
            content,
            sections,
            citations,
            publication_date: date,
            reading_time_minutes: reading_time_minutes(words),
            author: DEFAULT_AUTHOR.to_string(),
            tags,
            image_url,
            created_at: now,
            updated_at: now,
        }
    }

    /// Prompts the model, retrying failed calls and unparseable output.
    pub async fn generate(
        &self,
        topic: &str,
        sources: &[ScrapedContent],
        id: String,
        date: NaiveDate,
    ) -> Result<Article> {
        if sources.is_empty() {
            return Err(Error::Inference(format!(
                "No source material to write about '{}'",
                topic
            )));
        }
        let prompt = Self::build_prompt(topic, sources);
        debug!("Prompt for '{}' is {} chars", topic, prompt.len());

        let prompt = prompt.as_str();
        let draft = self
            .retry
            .run("article generation", || async move {
                let text = self.model.generate_text(prompt, self.max_tokens).await?;
                Self::parse_draft(&text)
            })
            .await?;

        let article = Self::assemble(draft, sources, id, date);
        info!(
            "Generated '{}' ({} words) with {}",
            article.title,
            article.word_count(),
            self.model.name()
        );
        Ok(article)
    }
}

fn extract_json(text: &str) -> Option<&str> {
    let text = text.trim();
    if let Some(start) = text.find("```") {
        let after = &text[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return Some(inner);
            }
        }
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DummyModel;
    use async_trait::async_trait;
    use bv_core::{ArticleValidator, ScrapedImage};
    use serde_json::Value;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn source(title: &str, url: &str) -> ScrapedContent {
        let mut metadata = BTreeMap::new();
        metadata.insert("source".to_string(), Value::from("wikipedia"));
        ScrapedContent {
            source_url: url.to_string(),
            title: title.to_string(),
            raw_text: "Rajaraja Chola I built the Brihadisvara temple at Thanjavur.".to_string(),
            images: vec![ScrapedImage {
                url: "https://upload.wikimedia.org/thanjavur.jpg".to_string(),
                alt_text: "Temple".to_string(),
                caption: None,
            }],
            metadata,
            scraped_at: Utc::now(),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 15).unwrap()
    }

    #[test]
    fn test_parse_fenced_draft() {
        let text = "Here is the article:\n```json\n{\"title\":\"Chola\",\"summary\":\"S\",\"sections\":[{\"heading\":\"H\",\"content\":\"C\"}],\"tags\":[\"Chola Dynasty\"]}\n```\nEnjoy!";
        let draft = ArticleGenerator::parse_draft(text).unwrap();
        assert_eq!(draft.title, "Chola");
        assert_eq!(draft.image_url, None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            ArticleGenerator::parse_draft("I cannot help with that."),
            Err(Error::Inference(_))
        ));
        assert!(ArticleGenerator::parse_draft("{\"title\":\"x\"}").is_err());
        assert!(ArticleGenerator::parse_draft(
            "{\"title\":\"x\",\"summary\":\"y\",\"sections\":[]}"
        )
        .is_err());
    }

    #[test]
    fn test_prompt_carries_topic_and_sources() {
        let prompt = ArticleGenerator::build_prompt(
            "Chola Dynasty",
            &[source("Chola dynasty", "https://en.wikipedia.org/wiki/Chola_dynasty")],
        );
        assert!(prompt.contains("Topic: Chola Dynasty"));
        assert!(prompt.contains("Source 1 (wikipedia): Chola dynasty"));
        assert!(prompt.contains("Brihadisvara"));
    }

    #[test]
    fn test_assemble_builds_article() {
        let draft = ArticleDraft {
            title: " Chola Dynasty ".into(),
            summary: "A maritime empire.".into(),
            sections: vec![
                DraftSection { heading: "Origins".into(), content: "Uraiyur.".into() },
                DraftSection { heading: "Navy".into(), content: "Srivijaya.".into() },
            ],
            tags: vec!["Chola Dynasty".into(), "chola-dynasty".into(), "South India".into()],
            image_url: None,
        };
        let sources = [source("Chola dynasty", "https://en.wikipedia.org/wiki/Chola_dynasty")];
        let article =
            ArticleGenerator::assemble(draft, &sources, "art_20260215_001".into(), date());

        assert_eq!(article.title, "Chola Dynasty");
        assert_eq!(article.content, "## Origins\n\nUraiyur.\n\n## Navy\n\nSrivijaya.");
        assert_eq!(article.sections[1].order, 2);
        assert_eq!(article.tags, vec!["chola-dynasty", "south-india"]);
        assert_eq!(article.citations.len(), 1);
        assert_eq!(article.citations[0].source_name, "wikipedia");
        assert_eq!(article.citations[0].accessed_date, sources[0].scraped_at);
        assert_eq!(
            article.image_url.as_deref(),
            Some("https://upload.wikimedia.org/thanjavur.jpg")
        );
        assert_eq!(article.reading_time_minutes, 1);
        assert_eq!(article.author, DEFAULT_AUTHOR);
    }

    #[tokio::test]
    async fn test_dummy_generation_passes_validation() {
        let generator = ArticleGenerator::new(Arc::new(DummyModel::new()), &Config::dummy());
        let article = generator
            .generate(
                "Chola Dynasty",
                &[source("Chola dynasty", "https://en.wikipedia.org/wiki/Chola_dynasty")],
                "art_20260215_001".into(),
                date(),
            )
            .await
            .unwrap();
        ArticleValidator::default().validate(&article).unwrap();
        assert_eq!(article.title, "Chola Dynasty");
    }

    #[tokio::test]
    async fn test_generate_requires_sources() {
        let generator = ArticleGenerator::new(Arc::new(DummyModel::new()), &Config::dummy());
        let result = generator.generate("Chola", &[], "art_20260215_001".into(), date()).await;
        assert!(matches!(result, Err(Error::Inference(_))));
    }

    struct FlakyModel {
        calls: AtomicU32,
    }

    #[async_trait]
    impl InferenceModel for FlakyModel {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn generate_text(&self, prompt: &str, max_tokens: u32) -> Result<String> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Ok("Sorry, here is some prose instead of JSON.".into());
            }
            DummyModel::new().generate_text(prompt, max_tokens).await
        }

        async fn generate_embedding(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0])
        }
    }

    #[tokio::test]
    async fn test_malformed_output_is_retried() {
        let model = Arc::new(FlakyModel { calls: AtomicU32::new(0) });
        let generator = ArticleGenerator::new(model.clone(), &Config::dummy())
            .with_retry(RetryPolicy::new(2, Duration::from_millis(1)));
        let article = generator
            .generate(
                "Chola Dynasty",
                &[source("Chola dynasty", "https://en.wikipedia.org/wiki/Chola_dynasty")],
                "art_20260215_001".into(),
                date(),
            )
            .await
            .unwrap();
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
        assert!(!article.sections.is_empty());
    }
}
