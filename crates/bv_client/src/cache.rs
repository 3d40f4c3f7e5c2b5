//! Bounded on-device cache of recently viewed articles.
//!
//! Entries live in a single SQLite table keyed by article id. Every read or
//! write stamps the entry with the next value of a table-wide access
//! sequence; once the table holds more than `capacity` rows, the rows with
//! the lowest sequence go first. The sequence is strictly increasing, so
//! two entries never tie. `cached_at` is wall-clock time kept for display
//! only.

use bv_core::{Article, Error, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

pub const DEFAULT_CAPACITY: usize = 50;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS cached_articles (
        article_id TEXT PRIMARY KEY,
        payload TEXT NOT NULL,
        cached_at TEXT NOT NULL,
        access_seq INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_cached_articles_access ON cached_articles (access_seq)",
];

const NEXT_SEQ: &str = "(SELECT COALESCE(MAX(access_seq), 0) + 1 FROM cached_articles)";

fn sql_count(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> Error {
    move |e| Error::Database(format!("{}: {}", context, e))
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedArticle {
    pub article: Article,
    pub cached_at: DateTime<Utc>,
}

pub struct OfflineCache {
    pool: SqlitePool,
    capacity: usize,
}

impl OfflineCache {
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(db_error("Failed to open offline cache"))?;
        Self::init(pool).await
    }

    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(db_error("Invalid cache URL"))?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(db_error("Failed to open offline cache"))?;
        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> Result<Self> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(db_error("Failed to create cache table"))?;
        }
        Ok(Self {
            pool,
            capacity: DEFAULT_CAPACITY,
        })
    }

    /// Capacity below one is treated as one.
    pub async fn with_capacity(mut self, capacity: usize) -> Result<Self> {
        self.capacity = capacity.max(1);
        self.evict().await?;
        Ok(self)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the article and marks it most recently used.
    pub async fn get(&self, article_id: &str) -> Result<Option<Article>> {
        let sql = format!(
            "UPDATE cached_articles SET access_seq = {} WHERE article_id = ? RETURNING payload",
            NEXT_SEQ
        );
        let payload: Option<String> = sqlx::query_scalar(&sql)
            .bind(article_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to read cached article"))?;
        payload
            .map(|p| serde_json::from_str(&p).map_err(Error::from))
            .transpose()
    }

    /// Inserts or refreshes an entry, then evicts down to capacity.
    /// Returns how many entries were evicted.
    pub async fn put(&self, article: &Article) -> Result<u64> {
        let sql = format!(
            "INSERT INTO cached_articles (article_id, payload, cached_at, access_seq) \
             VALUES (?, ?, ?, {}) \
             ON CONFLICT(article_id) DO UPDATE SET \
                payload = excluded.payload, \
                cached_at = excluded.cached_at, \
                access_seq = excluded.access_seq",
            NEXT_SEQ
        );
        sqlx::query(&sql)
            .bind(&article.id)
            .bind(serde_json::to_string(article)?)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to cache article"))?;
        self.evict().await
    }

    async fn evict(&self) -> Result<u64> {
        let evicted = sqlx::query(
            "DELETE FROM cached_articles WHERE article_id NOT IN \
             (SELECT article_id FROM cached_articles ORDER BY access_seq DESC LIMIT ?)",
        )
        .bind(sql_count(self.capacity))
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to evict cached articles"))?
        .rows_affected();
        if evicted > 0 {
            debug!("Evicted {} cached article(s)", evicted);
        }
        Ok(evicted)
    }

    pub async fn remove(&self, article_id: &str) -> Result<bool> {
        let removed = sqlx::query("DELETE FROM cached_articles WHERE article_id = ?")
            .bind(article_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to remove cached article"))?
            .rows_affected();
        Ok(removed > 0)
    }

    pub async fn len(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cached_articles")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count cached articles"))?;
        Ok(count as usize)
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM cached_articles")
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to clear offline cache"))?;
        Ok(())
    }

    /// Most recently used first. Does not change recency.
    pub async fn recent(&self, limit: usize) -> Result<Vec<CachedArticle>> {
        let rows = sqlx::query(
            "SELECT payload, cached_at FROM cached_articles ORDER BY access_seq DESC LIMIT ?",
        )
        .bind(sql_count(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list cached articles"))?;
        rows.iter().map(cached_from_row).collect()
    }
}

fn cached_from_row(row: &SqliteRow) -> Result<CachedArticle> {
    let payload: String = row.try_get("payload").map_err(db_error("Failed to read payload"))?;
    let cached_at: String = row
        .try_get("cached_at")
        .map_err(db_error("Failed to read cached_at"))?;
    Ok(CachedArticle {
        article: serde_json::from_str(&payload)?,
        cached_at: DateTime::parse_from_rfc3339(&cached_at)
            .map_err(|e| Error::Database(format!("Invalid cached_at '{}': {}", cached_at, e)))?
            .with_timezone(&Utc),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::article;

    fn ids(entries: &[CachedArticle]) -> Vec<&str> {
        entries.iter().map(|e| e.article.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let cache = OfflineCache::in_memory().await.unwrap();
        let chola = article("art_20260215_001", "Chola Dynasty");
        cache.put(&chola).await.unwrap();

        assert_eq!(cache.get("art_20260215_001").await.unwrap(), Some(chola));
        assert_eq!(cache.get("art_20260215_009").await.unwrap(), None);
        assert_eq!(cache.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_evicts_least_recently_used() {
        let cache = OfflineCache::in_memory()
            .await
            .unwrap()
            .with_capacity(2)
            .await
            .unwrap();
        cache.put(&article("art_20260215_001", "One")).await.unwrap();
        cache.put(&article("art_20260215_002", "Two")).await.unwrap();

        // Reading the first entry makes the second the oldest.
        cache.get("art_20260215_001").await.unwrap();
        let evicted = cache.put(&article("art_20260215_003", "Three")).await.unwrap();

        assert_eq!(evicted, 1);
        assert_eq!(cache.len().await.unwrap(), 2);
        assert!(cache.get("art_20260215_002").await.unwrap().is_none());
        let recent = cache.recent(10).await.unwrap();
        assert_eq!(ids(&recent), vec!["art_20260215_001", "art_20260215_003"]);
    }

    #[tokio::test]
    async fn test_put_refreshes_existing_entry() {
        let cache = OfflineCache::in_memory()
            .await
            .unwrap()
            .with_capacity(2)
            .await
            .unwrap();
        cache.put(&article("art_20260215_001", "One")).await.unwrap();
        cache.put(&article("art_20260215_002", "Two")).await.unwrap();
        cache.put(&article("art_20260215_001", "One, revised")).await.unwrap();
        cache.put(&article("art_20260215_003", "Three")).await.unwrap();

        let recent = cache.recent(10).await.unwrap();
        assert_eq!(ids(&recent), vec!["art_20260215_003", "art_20260215_001"]);
        assert_eq!(recent[1].article.title, "One, revised");
    }

    #[tokio::test]
    async fn test_recent_does_not_touch_recency() {
        let cache = OfflineCache::in_memory()
            .await
            .unwrap()
            .with_capacity(2)
            .await
            .unwrap();
        cache.put(&article("art_20260215_001", "One")).await.unwrap();
        cache.put(&article("art_20260215_002", "Two")).await.unwrap();
        cache.recent(1).await.unwrap();
        cache.put(&article("art_20260215_003", "Three")).await.unwrap();
        assert!(cache.get("art_20260215_001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recent_with_unbounded_limit() {
        let cache = OfflineCache::in_memory().await.unwrap();
        cache.put(&article("art_20260215_001", "One")).await.unwrap();
        cache.put(&article("art_20260215_002", "Two")).await.unwrap();
        let all = cache.recent(usize::MAX).await.unwrap();
        assert_eq!(ids(&all), vec!["art_20260215_002", "art_20260215_001"]);

        let cache = cache.with_capacity(usize::MAX).await.unwrap();
        assert_eq!(cache.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let cache = OfflineCache::in_memory().await.unwrap();
        cache.put(&article("art_20260215_001", "One")).await.unwrap();
        cache.put(&article("art_20260215_002", "Two")).await.unwrap();

        assert!(cache.remove("art_20260215_001").await.unwrap());
        assert!(!cache.remove("art_20260215_001").await.unwrap());
        assert_eq!(cache.len().await.unwrap(), 1);

        cache.clear().await.unwrap();
        assert!(cache.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_shrinking_capacity_evicts() {
        let cache = OfflineCache::in_memory().await.unwrap();
        for i in 1..=5 {
            cache
                .put(&article(&format!("art_20260215_00{}", i), "Entry"))
                .await
                .unwrap();
        }
        let cache = cache.with_capacity(0).await.unwrap();
        assert_eq!(cache.capacity(), 1);
        assert_eq!(ids(&cache.recent(10).await.unwrap()), vec!["art_20260215_005"]);
    }

    #[tokio::test]
    async fn test_file_backed_cache_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("offline.db");
        {
            let cache = OfflineCache::open(&path).await.unwrap();
            cache.put(&article("art_20260215_001", "One")).await.unwrap();
        }
        let reopened = OfflineCache::open(&path).await.unwrap();
        assert_eq!(reopened.len().await.unwrap(), 1);
    }
}
