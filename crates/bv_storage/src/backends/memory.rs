use async_trait::async_trait;
use bv_core::{
    cosine_similarity, Article, ArticleEmbedding, ArticleStorage, Error, Like, Result,
    ScoredArticle, SearchSuggestion, User,
};
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use crate::{query_terms, StorageBackend};

const TITLE_WEIGHT: f64 = 3.0;
const SUMMARY_WEIGHT: f64 = 2.0;
const TAG_WEIGHT: f64 = 2.0;
const CONTENT_WEIGHT: f64 = 1.0;

#[derive(Default)]
pub struct MemoryStore {
    articles: HashMap<String, Article>,
    users: HashMap<String, User>,
    likes: BTreeMap<(String, String), Like>,
    suggestions: Vec<SearchSuggestion>,
    embeddings: HashMap<String, ArticleEmbedding>,
    daily: BTreeMap<NaiveDate, String>,
}

impl MemoryStore {
    fn require_article(&self, id: &str) -> Result<()> {
        if self.articles.contains_key(id) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("article {}", id)))
        }
    }

    fn require_user(&self, id: &str) -> Result<()> {
        if self.users.contains_key(id) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("user {}", id)))
        }
    }

    fn fulltext_score(article: &Article, terms: &[String]) -> Option<f64> {
        let title = article.title.to_lowercase();
        let summary = article.summary.to_lowercase();
        let content = article.content.to_lowercase();
        let tags = article.tags.join(" ").to_lowercase();

        let mut total = 0.0;
        for term in terms {
            let score = TITLE_WEIGHT * count_term(&title, term) as f64
                + SUMMARY_WEIGHT * count_term(&summary, term) as f64
                + TAG_WEIGHT * count_term(&tags, term) as f64
                + CONTENT_WEIGHT * count_term(&content, term) as f64;
            // every term has to appear somewhere, like an FTS AND query
            if score == 0.0 {
                return None;
            }
            total += score;
        }
        Some(total)
    }
}

fn count_term(haystack: &str, term: &str) -> usize {
    query_terms(haystack).iter().filter(|t| *t == term).count()
}

pub struct InMemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore::default())),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    fn get_error_message() -> &'static str {
        "Memory storage should be available"
    }

    async fn new() -> Result<Self> {
        Ok(InMemoryStorage::new())
    }
}

#[async_trait]
impl ArticleStorage for InMemoryStorage {
    async fn store_article(&self, article: &Article) -> Result<()> {
        let mut store = self.store.write().await;
        store.articles.insert(article.id.clone(), article.clone());
        Ok(())
    }

    async fn get_article(&self, id: &str) -> Result<Option<Article>> {
        Ok(self.store.read().await.articles.get(id).cloned())
    }

    async fn list_articles(&self, limit: usize, offset: usize) -> Result<Vec<Article>> {
        let store = self.store.read().await;
        let mut articles: Vec<&Article> = store.articles.values().collect();
        articles.sort_by(|a, b| {
            b.publication_date
                .cmp(&a.publication_date)
                .then(b.id.cmp(&a.id))
        });
        Ok(articles.into_iter().skip(offset).take(limit).cloned().collect())
    }

    async fn delete_article(&self, id: &str) -> Result<()> {
        let mut store = self.store.write().await;
        if store.articles.remove(id).is_none() {
            return Err(Error::NotFound(format!("article {}", id)));
        }
        store.likes.retain(|key, _| key.1 != id);
        store.suggestions.retain(|s| s.article_id != id);
        store.embeddings.remove(id);
        store.daily.retain(|_, article_id| *article_id != id);
        Ok(())
    }

    async fn next_article_sequence(&self, date: NaiveDate) -> Result<u32> {
        let prefix = format!("art_{}_", date.format("%Y%m%d"));
        let store = self.store.read().await;
        let highest = store
            .articles
            .keys()
            .filter_map(|id| id.strip_prefix(&prefix))
            .filter_map(|seq| seq.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        Ok(highest + 1)
    }

    async fn set_daily_article(&self, date: NaiveDate, article_id: &str) -> Result<()> {
        let mut store = self.store.write().await;
        store.require_article(article_id)?;
        store.daily.insert(date, article_id.to_string());
        Ok(())
    }

    async fn get_daily_article(&self, date: NaiveDate) -> Result<Option<Article>> {
        let store = self.store.read().await;
        Ok(store
            .daily
            .get(&date)
            .and_then(|id| store.articles.get(id))
            .cloned())
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        let mut store = self.store.write().await;
        if store.users.contains_key(&user.id) {
            return Err(Error::Conflict(format!("user {} already exists", user.id)));
        }
        if store.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(Error::Conflict(format!("email {} is already registered", user.email)));
        }
        store.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.store.read().await.users.get(id).cloned())
    }

    async fn like_article(&self, user_id: &str, article_id: &str) -> Result<Like> {
        let mut store = self.store.write().await;
        store.require_user(user_id)?;
        store.require_article(article_id)?;
        let key = (user_id.to_string(), article_id.to_string());
        if store.likes.contains_key(&key) {
            return Err(Error::Conflict(format!(
                "user {} already likes {}",
                user_id, article_id
            )));
        }
        let like = Like {
            user_id: user_id.to_string(),
            article_id: article_id.to_string(),
            created_at: Utc::now(),
        };
        store.likes.insert(key, like.clone());
        Ok(like)
    }

    async fn unlike_article(&self, user_id: &str, article_id: &str) -> Result<()> {
        let mut store = self.store.write().await;
        let key = (user_id.to_string(), article_id.to_string());
        match store.likes.remove(&key) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(format!(
                "like from {} on {}",
                user_id, article_id
            ))),
        }
    }

    async fn list_likes(&self, user_id: &str) -> Result<Vec<Like>> {
        let store = self.store.read().await;
        let mut likes: Vec<Like> = store
            .likes
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        likes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(likes)
    }

    async fn like_count(&self, article_id: &str) -> Result<u64> {
        let store = self.store.read().await;
        Ok(store.likes.keys().filter(|key| key.1 == article_id).count() as u64)
    }

    async fn add_suggestions(&self, suggestions: &[SearchSuggestion]) -> Result<()> {
        let mut store = self.store.write().await;
        for suggestion in suggestions {
            store.require_article(&suggestion.article_id)?;
        }
        for suggestion in suggestions {
            let existing = store.suggestions.iter().position(|s| {
                s.article_id == suggestion.article_id && s.phrase == suggestion.phrase
            });
            match existing {
                Some(i) => store.suggestions[i].weight = suggestion.weight,
                None => store.suggestions.push(suggestion.clone()),
            }
        }
        Ok(())
    }

    async fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<SearchSuggestion>> {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() {
            return Ok(Vec::new());
        }
        let store = self.store.read().await;
        let mut hits: Vec<SearchSuggestion> = store
            .suggestions
            .iter()
            .filter(|s| s.phrase.to_lowercase().starts_with(&prefix))
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.weight.cmp(&a.weight).then(a.phrase.cmp(&b.phrase)));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn search_fulltext(&self, query: &str, limit: usize) -> Result<Vec<ScoredArticle>> {
        let terms = query_terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let store = self.store.read().await;
        let mut hits: Vec<ScoredArticle> = store
            .articles
            .values()
            .filter_map(|article| {
                MemoryStore::fulltext_score(article, &terms).map(|score| ScoredArticle {
                    article_id: article.id.clone(),
                    score,
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.article_id.cmp(&b.article_id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn store_embedding(&self, embedding: &ArticleEmbedding) -> Result<()> {
        let mut store = self.store.write().await;
        store.require_article(&embedding.article_id)?;
        store
            .embeddings
            .insert(embedding.article_id.clone(), embedding.clone());
        Ok(())
    }

    async fn search_similar(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredArticle>> {
        let store = self.store.read().await;
        let mut hits: Vec<ScoredArticle> = store
            .embeddings
            .values()
            .filter(|e| e.vector.len() == vector.len())
            .map(|e| ScoredArticle {
                article_id: e.article_id.clone(),
                score: cosine_similarity(vector, &e.vector) as f64,
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.article_id.cmp(&b.article_id))
        });
        hits.truncate(limit);
        Ok(hits)
    }
}
