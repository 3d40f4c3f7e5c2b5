use async_trait::async_trait;
use bv_core::{Error, Result, ScrapedContent};
use chrono::Utc;
use futures::future::join_all;
use reqwest::Client;
use scraper::Html;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};
use crate::config::ScraperConfig;

pub mod archive_org;
pub mod html;
pub mod wikipedia;

pub use archive_org::ArchiveOrgSource;
pub use wikipedia::WikipediaSource;

/// A search result from a source, before its page is fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub summary: String,
    /// Source-specific fields (`page_id`, `identifier`, `date`...), copied into metadata
    pub extra: BTreeMap<String, Value>,
}

impl SearchHit {
    pub fn new(title: impl Into<String>, url: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            summary: summary.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Unique identifier, also recorded as `metadata.source`
    fn name(&self) -> &str;

    async fn search_topic(&self, topic: &str, max_results: usize) -> Result<Vec<SearchHit>>;

    async fn fetch(&self, hit: &SearchHit) -> Result<ScrapedContent>;

    /// Search, then fetch every hit concurrently. Pages that fail are logged
    /// and skipped.
    async fn extract(&self, topic: &str, max_pages: usize) -> Result<Vec<ScrapedContent>> {
        let hits = self.search_topic(topic, max_pages).await?;
        extract_hits(self, topic, hits).await
    }
}

pub async fn extract_hits<S: ContentSource + ?Sized>(
    source: &S,
    topic: &str,
    hits: Vec<SearchHit>,
) -> Result<Vec<ScrapedContent>> {
    if hits.is_empty() {
        return Err(Error::Scraping(format!(
            "No results found for topic '{}' on {}",
            topic,
            source.name()
        )));
    }
    info!("Extracting {} page(s) from {}", hits.len(), source.name());

    let results = join_all(hits.iter().map(|hit| source.fetch(hit))).await;
    let mut contents = Vec::with_capacity(results.len());
    for (hit, result) in hits.iter().zip(results) {
        match result {
            Ok(content) => contents.push(content),
            Err(e) => error!("Failed to extract {} from {}: {}", hit.title, source.name(), e),
        }
    }
    info!("Extracted {} page(s) from {}", contents.len(), source.name());
    Ok(contents)
}

/// Fetches a page and turns it into `ScrapedContent`.
#[derive(Clone)]
pub struct PageFetcher {
    client: Client,
    max_images: usize,
}

impl PageFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.page_timeout)
            .build()?;
        Ok(Self {
            client,
            max_images: config.max_images,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn fetch(
        &self,
        source: &str,
        hit: &SearchHit,
        root: Option<&str>,
    ) -> Result<ScrapedContent> {
        debug!("Fetching {} page {}", source, hit.url);
        let body = self
            .client
            .get(&hit.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        self.parse(source, hit, &body, root)
    }

    pub fn parse(
        &self,
        source: &str,
        hit: &SearchHit,
        body: &str,
        root: Option<&str>,
    ) -> Result<ScrapedContent> {
        let base = html::parse_url(&hit.url)?;
        let document = Html::parse_document(body);
        let raw_text = html::html_to_text(&document, root)?;
        if raw_text.trim().is_empty() {
            return Err(Error::Scraping(format!("No readable text at {}", hit.url)));
        }
        let images = html::extract_images(&document, root, &base, self.max_images)?;
        let page_title = html::extract_text(&document, "title").ok();

        let mut metadata = hit.extra.clone();
        metadata.insert("title".into(), Value::from(hit.title.clone()));
        metadata.insert("url".into(), Value::from(hit.url.clone()));
        metadata.insert("summary".into(), Value::from(hit.summary.clone()));
        if let Some(page_title) = &page_title {
            metadata.insert("page_title".into(), Value::from(page_title.clone()));
        }
        metadata.insert("source".into(), Value::from(source));
        metadata.insert("word_count".into(), Value::from(raw_text.split_whitespace().count()));

        let title = if hit.title.trim().is_empty() {
            page_title.unwrap_or_else(|| "Untitled".to_string())
        } else {
            hit.title.clone()
        };

        Ok(ScrapedContent {
            source_url: hit.url.clone(),
            title,
            raw_text,
            images,
            metadata,
            scraped_at: Utc::now(),
        })
    }
}

/// Named sources, listed in registration order.
#[derive(Default, Clone)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn ContentSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wikipedia and Archive.org.
    pub fn with_defaults(config: &ScraperConfig) -> Result<Self> {
        let fetcher = PageFetcher::new(config)?;
        let mut registry = Self::new();
        registry.register(Arc::new(WikipediaSource::new(fetcher.clone())));
        registry.register(Arc::new(ArchiveOrgSource::new(fetcher)));
        Ok(registry)
    }

    /// Re-registering a name replaces the earlier source in place.
    pub fn register(&mut self, source: Arc<dyn ContentSource>) {
        info!("Registered source: {}", source.name());
        match self.sources.iter().position(|s| s.name() == source.name()) {
            Some(i) => self.sources[i] = source,
            None => self.sources.push(source),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ContentSource>> {
        self.sources.iter().find(|s| s.name() == name).cloned()
    }

    pub fn list(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }
}
