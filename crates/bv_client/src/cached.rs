use bv_core::{Article, Result};
use chrono::NaiveDate;
use tracing::{info, warn};
use crate::api::ApiClient;
use crate::cache::OfflineCache;

/// Where an article came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Network,
    Cache,
}

/// Fetch-through reader: fresh articles are cached, and the cache answers
/// when the API cannot be reached.
pub struct CachedArticleClient {
    api: ApiClient,
    cache: OfflineCache,
}

impl CachedArticleClient {
    pub fn new(api: ApiClient, cache: OfflineCache) -> Self {
        Self { api, cache }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &OfflineCache {
        &self.cache
    }

    pub async fn get_article(&self, id: &str) -> Result<(Article, Origin)> {
        match self.api.get_article(id).await {
            Ok(article) => {
                self.remember(&article).await;
                Ok((article, Origin::Network))
            }
            Err(e) if e.is_transport() => match self.cache.get(id).await? {
                Some(article) => {
                    info!("Offline, serving {} from cache", id);
                    Ok((article, Origin::Cache))
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// The daily article is cached once fetched so it can be reread offline by id.
    pub async fn daily_article(&self, date: Option<NaiveDate>) -> Result<Article> {
        let article = self.api.daily_article(date).await?;
        self.remember(&article).await;
        Ok(article)
    }

    // A cache write failure never hides a successful fetch.
    async fn remember(&self, article: &Article) {
        if let Err(e) = self.cache.put(article).await {
            warn!("Failed to cache {}: {}", article.id, e);
        }
    }
}
