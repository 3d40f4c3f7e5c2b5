use async_trait::async_trait;
use chrono::NaiveDate;
use crate::types::{Article, ArticleEmbedding, Like, ScoredArticle, SearchSuggestion, User};
use crate::Result;

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Insert or replace an article
    async fn store_article(&self, article: &Article) -> Result<()>;

    async fn get_article(&self, id: &str) -> Result<Option<Article>>;

    /// Newest publication date first
    async fn list_articles(&self, limit: usize, offset: usize) -> Result<Vec<Article>>;

    /// Remove an article together with its likes, suggestions and embedding
    async fn delete_article(&self, id: &str) -> Result<()>;

    /// Next free `NNN` for article ids published on `date`
    async fn next_article_sequence(&self, date: NaiveDate) -> Result<u32>;

    /// Feature an article for a date, replacing any previous choice
    async fn set_daily_article(&self, date: NaiveDate, article_id: &str) -> Result<()>;

    async fn get_daily_article(&self, date: NaiveDate) -> Result<Option<Article>>;

    /// Insert a user; a duplicate email is a conflict
    async fn create_user(&self, user: &User) -> Result<()>;

    async fn get_user(&self, id: &str) -> Result<Option<User>>;

    /// A user may like an article at most once
    async fn like_article(&self, user_id: &str, article_id: &str) -> Result<Like>;

    async fn unlike_article(&self, user_id: &str, article_id: &str) -> Result<()>;

    async fn list_likes(&self, user_id: &str) -> Result<Vec<Like>>;

    async fn like_count(&self, article_id: &str) -> Result<u64>;

    async fn add_suggestions(&self, suggestions: &[SearchSuggestion]) -> Result<()>;

    /// Suggestions whose phrase starts with `prefix`, heaviest first
    async fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<SearchSuggestion>>;

    /// Full-text ranked matches, best first
    async fn search_fulltext(&self, query: &str, limit: usize) -> Result<Vec<ScoredArticle>>;

    async fn store_embedding(&self, embedding: &ArticleEmbedding) -> Result<()>;

    /// Nearest articles by cosine similarity, best first
    async fn search_similar(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredArticle>>;
}
