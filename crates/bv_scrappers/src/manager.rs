use bv_core::validation::to_tag;
use bv_core::{
    article_id, Article, ArticleEmbedding, ArticleStorage, ArticleValidator, Error, Result,
    SearchSuggestion, MAX_DAILY_SEQUENCE,
};
use bv_inference::embeddings::EmbeddingGenerator;
use bv_inference::generator::ArticleGenerator;
use chrono::NaiveDate;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tracing::{info, warn};
use crate::web_scraper::WebScraper;

pub const TITLE_SUGGESTION_WEIGHT: i64 = 10;
pub const TAG_SUGGESTION_WEIGHT: i64 = 5;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_pages_per_source: usize,
    pub sources: Option<Vec<String>>,
    pub respect_robots: bool,
    /// Topics processed at once by `run_many`
    pub concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_pages_per_source: 1,
            sources: None,
            respect_robots: false,
            concurrency: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub topic: String,
    pub article_id: String,
    pub title: String,
    pub sources_used: usize,
    pub word_count: usize,
    pub reading_time_minutes: u32,
    pub suggestions: usize,
    pub embedded: bool,
    pub featured: bool,
}

/// scrape -> generate -> validate -> store.
pub struct Pipeline {
    scraper: Arc<WebScraper>,
    generator: ArticleGenerator,
    embeddings: Option<EmbeddingGenerator>,
    validator: ArticleValidator,
    storage: Arc<dyn ArticleStorage>,
    options: PipelineOptions,
    // Id allocation and the writes that claim it happen under this lock.
    write_lock: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        scraper: Arc<WebScraper>,
        generator: ArticleGenerator,
        storage: Arc<dyn ArticleStorage>,
    ) -> Self {
        Self {
            scraper,
            generator,
            embeddings: None,
            validator: ArticleValidator::default(),
            storage,
            options: PipelineOptions::default(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_embeddings(mut self, embeddings: EmbeddingGenerator) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    pub fn with_validator(mut self, validator: ArticleValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn scraper(&self) -> &WebScraper {
        &self.scraper
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    async fn next_sequence(&self, date: NaiveDate) -> Result<u32> {
        let sequence = self.storage.next_article_sequence(date).await?;
        if sequence > MAX_DAILY_SEQUENCE {
            return Err(Error::Validation(vec![format!(
                "no article ids left for {}: at most {} articles per day",
                date, MAX_DAILY_SEQUENCE
            )]));
        }
        Ok(sequence)
    }

    /// Embedding failures only cost the article its semantic search entry.
    async fn embed(&self, article: &Article) -> Option<ArticleEmbedding> {
        let generator = self.embeddings.as_ref()?;
        match generator.generate_article_embedding(article).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                warn!("Skipping embedding for '{}': {}", article.title, e);
                None
            }
        }
    }

    pub async fn run(&self, topic: &str, date: NaiveDate, featured: bool) -> Result<PipelineReport> {
        info!("Starting pipeline for '{}' ({})", topic, date);
        // Fail fast when the day is full; the number is claimed again under the lock.
        self.next_sequence(date).await?;

        let contents = self
            .scraper
            .search_and_scrape(
                topic,
                self.options.max_pages_per_source,
                self.options.sources.as_deref(),
                self.options.respect_robots,
            )
            .await?;
        if contents.is_empty() {
            return Err(Error::Scraping(format!("No content scraped for '{}'", topic)));
        }

        // The real sequence is claimed once the article is ready to store.
        let mut article = self
            .generator
            .generate(topic, &contents, article_id(date, 0), date)
            .await?;
        let mut embedding = self.embed(&article).await;

        let _guard = self.write_lock.lock().await;
        let sequence = self.next_sequence(date).await?;
        article.id = article_id(date, sequence);
        self.validator.validate(&article)?;

        let suggestions = suggestions_for(&article.id, &article.title, &article.tags);
        self.storage.store_article(&article).await?;
        if let Err(e) = self.index(&article, &suggestions, date, featured).await {
            warn!("Rolling back {}: {}", article.id, e);
            if let Err(cleanup) = self.storage.delete_article(&article.id).await {
                warn!("Failed to roll back {}: {}", article.id, cleanup);
            }
            return Err(e);
        }
        info!("Stored {} '{}'", article.id, article.title);

        let embedded = match embedding.as_mut() {
            Some(embedding) => {
                embedding.article_id = article.id.clone();
                match self.storage.store_embedding(embedding).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Failed to store embedding for {}: {}", article.id, e);
                        false
                    }
                }
            }
            None => false,
        };
        if featured {
            info!("Featured {} for {}", article.id, date);
        }

        Ok(PipelineReport {
            topic: topic.to_string(),
            word_count: article.word_count(),
            reading_time_minutes: article.reading_time_minutes,
            article_id: article.id,
            title: article.title,
            sources_used: contents.len(),
            suggestions: suggestions.len(),
            embedded,
            featured,
        })
    }

    /// Writes an article needs to be reachable. Any failure undoes the article.
    async fn index(
        &self,
        article: &Article,
        suggestions: &[SearchSuggestion],
        date: NaiveDate,
        featured: bool,
    ) -> Result<()> {
        self.storage.add_suggestions(suggestions).await?;
        if featured {
            self.storage.set_daily_article(date, &article.id).await?;
        }
        Ok(())
    }

    /// Runs several topics with bounded concurrency. Failures are reported
    /// per topic; none are featured.
    pub async fn run_many(&self, topics: &[String], date: NaiveDate) -> Vec<(String, Result<PipelineReport>)> {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let futures = topics.iter().map(|topic| {
            let semaphore = semaphore.clone();
            async move {
                let result = match semaphore.acquire().await {
                    Ok(_permit) => self.run(topic, date, false).await,
                    Err(e) => Err(Error::External(e.into())),
                };
                (topic.clone(), result)
            }
        });
        join_all(futures).await
    }
}

/// The title and each tag become autocomplete phrases.
pub fn suggestions_for(article_id: &str, title: &str, tags: &[String]) -> Vec<SearchSuggestion> {
    let mut suggestions = vec![SearchSuggestion {
        phrase: title.to_string(),
        article_id: article_id.to_string(),
        weight: TITLE_SUGGESTION_WEIGHT,
    }];
    for tag in tags {
        let phrase = tag.replace('-', " ");
        if phrase.is_empty() || to_tag(&phrase) == to_tag(title) {
            continue;
        }
        suggestions.push(SearchSuggestion {
            phrase,
            article_id: article_id.to_string(),
            weight: TAG_SUGGESTION_WEIGHT,
        });
    }
    suggestions
}
