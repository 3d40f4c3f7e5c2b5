use bv_core::{Error, Result, RetryPolicy, ScrapedContent};
use futures::future::join_all;
use reqwest::Client;
use std::sync::Arc;
use tracing::{error, info, warn};
use crate::config::ScraperConfig;
use crate::rate_limit::RateLimiter;
use crate::robots::RobotsCache;
use crate::scrapers::{extract_hits, ContentSource, SourceRegistry};

/// Rate-limited, retrying front end over the registered sources.
pub struct WebScraper {
    registry: SourceRegistry,
    rate_limiter: RateLimiter,
    robots: RobotsCache,
    retry: RetryPolicy,
}

impl WebScraper {
    pub fn new(registry: SourceRegistry, config: &ScraperConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.page_timeout)
            .build()?;
        Ok(Self {
            registry,
            rate_limiter: RateLimiter::new(config.requests_per_second),
            robots: RobotsCache::new(client, config.user_agent.clone()),
            retry: config.retry,
        })
    }

    /// Wikipedia and Archive.org with the given settings.
    pub fn with_defaults(config: &ScraperConfig) -> Result<Self> {
        Self::new(SourceRegistry::with_defaults(config)?, config)
    }

    pub fn list_sources(&self) -> Vec<String> {
        self.registry.list()
    }

    fn source(&self, name: &str) -> Result<Arc<dyn ContentSource>> {
        self.registry.get(name).ok_or_else(|| {
            Error::Scraping(format!(
                "Source '{}' not found. Available sources: {}",
                name,
                self.list_sources().join(", ")
            ))
        })
    }

    pub async fn check_robots_txt(&self, url: &str) -> Result<bool> {
        self.robots.is_allowed(url).await
    }

    pub async fn scrape(
        &self,
        source_name: &str,
        topic: &str,
        max_pages: usize,
        respect_robots: bool,
    ) -> Result<Vec<ScrapedContent>> {
        let source = self.source(source_name)?;
        self.rate_limiter.wait().await;

        info!("Scraping '{}' from {} (max {} pages)", topic, source_name, max_pages);
        let what = format!("{} search", source_name);
        let mut hits = self
            .retry
            .run(&what, || source.search_topic(topic, max_pages))
            .await?;

        if respect_robots {
            let mut allowed = Vec::with_capacity(hits.len());
            for hit in hits {
                match self.robots.is_allowed(&hit.url).await {
                    Ok(true) => allowed.push(hit),
                    Ok(false) => warn!("robots.txt disallows {}, skipping", hit.url),
                    Err(e) => warn!("Skipping hit '{}': {}", hit.title, e),
                }
            }
            hits = allowed;
        }

        let contents = extract_hits(source.as_ref(), topic, hits).await?;
        let total_chars: usize = contents.iter().map(|c| c.raw_text.len()).sum();
        info!(
            "Scraped {} page(s) ({} characters) from {}",
            contents.len(),
            total_chars,
            source_name
        );
        Ok(contents)
    }

    /// Scrapes every named source (all registered when `sources` is `None`).
    /// Failed sources are logged and skipped unless `fail_fast` is set.
    pub async fn scrape_all(
        &self,
        topic: &str,
        max_pages: usize,
        respect_robots: bool,
        fail_fast: bool,
        sources: Option<&[String]>,
    ) -> Result<Vec<ScrapedContent>> {
        let names: Vec<String> = match sources {
            Some(names) if !names.is_empty() => names.to_vec(),
            _ => self.list_sources(),
        };
        info!("Scraping '{}' from sources: {}", topic, names.join(", "));

        let results = join_all(
            names
                .iter()
                .map(|name| self.scrape(name, topic, max_pages, respect_robots)),
        )
        .await;

        let mut contents = Vec::new();
        for (name, result) in names.iter().zip(results) {
            match result {
                Ok(mut scraped) => contents.append(&mut scraped),
                Err(e) if fail_fast => return Err(e),
                Err(e) => error!("Failed to scrape from {}: {}", name, e),
            }
        }
        info!(
            "Scraped {} page(s) from {} source(s)",
            contents.len(),
            names.len()
        );
        Ok(contents)
    }

    pub async fn search_and_scrape(
        &self,
        topic: &str,
        max_pages_per_source: usize,
        sources: Option<&[String]>,
        respect_robots: bool,
    ) -> Result<Vec<ScrapedContent>> {
        self.scrape_all(topic, max_pages_per_source, respect_robots, false, sources)
            .await
    }
}
