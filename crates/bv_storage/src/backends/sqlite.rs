use async_trait::async_trait;
use bv_core::{
    cosine_similarity, Article, ArticleEmbedding, ArticleStorage, Error, Like, Result,
    ScoredArticle, SearchSuggestion, User,
};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;
use crate::{query_terms, StorageBackend};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://bharatverse.db";

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        summary TEXT NOT NULL,
        content TEXT NOT NULL,
        sections TEXT NOT NULL DEFAULT '[]',
        citations TEXT NOT NULL DEFAULT '[]',
        publication_date TEXT NOT NULL,
        reading_time_minutes INTEGER NOT NULL CHECK (reading_time_minutes > 0),
        author TEXT NOT NULL,
        tags TEXT NOT NULL DEFAULT '[]',
        image_url TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        display_name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE COLLATE NOCASE,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS likes (
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        article_id TEXT NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
        created_at TEXT NOT NULL,
        PRIMARY KEY (user_id, article_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS search_suggestions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        phrase TEXT NOT NULL,
        phrase_folded TEXT NOT NULL,
        article_id TEXT NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
        weight INTEGER NOT NULL DEFAULT 1,
        UNIQUE (phrase, article_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS article_embeddings (
        article_id TEXT PRIMARY KEY REFERENCES articles(id) ON DELETE CASCADE,
        model TEXT NOT NULL,
        vector BLOB NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS daily_articles (
        date TEXT PRIMARY KEY,
        article_id TEXT NOT NULL REFERENCES articles(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE VIRTUAL TABLE IF NOT EXISTS articles_fts USING fts5(
        article_id UNINDEXED,
        title,
        summary,
        content,
        tags
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_articles_publication_date ON articles(publication_date DESC)",
    "CREATE INDEX IF NOT EXISTS idx_likes_article_id ON likes(article_id)",
    "CREATE INDEX IF NOT EXISTS idx_suggestions_folded ON search_suggestions(phrase_folded)",
    // Add future migrations here
];

const ARTICLE_COLUMNS: &str = "id, title, summary, content, sections, citations, publication_date, \
     reading_time_minutes, author, tags, image_url, created_at, updated_at";

pub struct SQLiteStorage {
    pool: SqlitePool,
    db_path: Option<PathBuf>,
}

#[async_trait]
impl StorageBackend for SQLiteStorage {
    fn get_error_message() -> &'static str {
        "SQLite database should be available at ./bharatverse.db"
    }

    async fn new() -> Result<Self> {
        Self::connect(DEFAULT_DATABASE_URL).await
    }
}

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> Error {
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Error::Conflict(format!("{}: {}", context, db.message()))
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            Error::NotFound(format!("{}: {}", context, db.message()))
        }
        _ => Error::Database(format!("{}: {}", context, e)),
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Database(format!("Failed to parse timestamp '{}': {}", value, e)))
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| Error::Database(format!("Failed to parse date '{}': {}", value, e)))
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Little-endian f32 bytes.
fn vec_to_blob(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Quoted terms, implicitly ANDed. Quoting keeps user input out of FTS5 syntax.
fn fts_query(query: &str) -> Option<String> {
    let terms = query_terms(query);
    if terms.is_empty() {
        return None;
    }
    Some(
        terms
            .iter()
            .map(|t| format!("\"{}\"", t))
            .collect::<Vec<_>>()
            .join(" "),
    )
}

/// SQLite bounds are signed; anything past `i64::MAX` saturates.
fn sql_count(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// SQLite's `LIKE` folds ASCII only, so suggestion phrases are folded here
/// with full Unicode lowercasing and matched against a folded column.
fn fold_phrase(phrase: &str) -> String {
    phrase.to_lowercase()
}

fn like_prefix(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn article_from_row(row: &SqliteRow) -> Result<Article> {
    let get = |column: &str| -> Result<String> {
        row.try_get::<String, _>(column)
            .map_err(|e| Error::Database(format!("Failed to read column {}: {}", column, e)))
    };
    let reading_time: i64 = row
        .try_get("reading_time_minutes")
        .map_err(db_error("Failed to read reading time"))?;
    let image_url: Option<String> = row
        .try_get("image_url")
        .map_err(db_error("Failed to read image url"))?;

    Ok(Article {
        id: get("id")?,
        title: get("title")?,
        summary: get("summary")?,
        content: get("content")?,
        sections: serde_json::from_str(&get("sections")?)?,
        citations: serde_json::from_str(&get("citations")?)?,
        publication_date: parse_date(&get("publication_date")?)?,
        reading_time_minutes: reading_time as u32,
        author: get("author")?,
        tags: serde_json::from_str(&get("tags")?)?,
        image_url,
        created_at: parse_timestamp(&get("created_at")?)?,
        updated_at: parse_timestamp(&get("updated_at")?)?,
    })
}

fn like_from_row(row: &SqliteRow) -> Result<Like> {
    let created_at: String = row.try_get("created_at").map_err(db_error("Failed to read like"))?;
    Ok(Like {
        user_id: row.try_get("user_id").map_err(db_error("Failed to read like"))?,
        article_id: row.try_get("article_id").map_err(db_error("Failed to read like"))?,
        created_at: parse_timestamp(&created_at)?,
    })
}

impl SQLiteStorage {
    /// Connects to a `sqlite:` URL, creating the file if needed.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_error("Invalid database URL"))?
            .create_if_missing(true)
            .foreign_keys(true);
        let in_memory = url.contains(":memory:");
        Self::with_options(options, in_memory, None).await
    }

    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true);
        Self::with_options(options, false, Some(db_path.to_path_buf())).await
    }

    /// Private in-memory database; a single pinned connection keeps it alive.
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    async fn with_options(
        options: SqliteConnectOptions,
        in_memory: bool,
        db_path: Option<PathBuf>,
    ) -> Result<Self> {
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(db_error("Failed to connect to database"))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Database(format!("Failed to run migration {}: {}", i, e)))?;
        }
        debug!("Applied {} migrations", MIGRATIONS.len());

        Ok(Self { pool, db_path })
    }

    pub fn get_db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    async fn exists(&self, sql: &str, id: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to check existence"))?;
        Ok(found.is_some())
    }

    async fn require_article(&self, id: &str) -> Result<()> {
        if self.exists("SELECT 1 FROM articles WHERE id = ?", id).await? {
            Ok(())
        } else {
            Err(Error::NotFound(format!("article {}", id)))
        }
    }

    async fn require_user(&self, id: &str) -> Result<()> {
        if self.exists("SELECT 1 FROM users WHERE id = ?", id).await? {
            Ok(())
        } else {
            Err(Error::NotFound(format!("user {}", id)))
        }
    }
}

#[async_trait]
impl ArticleStorage for SQLiteStorage {
    async fn store_article(&self, article: &Article) -> Result<()> {
        let sections = serde_json::to_string(&article.sections)?;
        let citations = serde_json::to_string(&article.citations)?;
        let tags = serde_json::to_string(&article.tags)?;

        let mut tx = self.pool.begin().await.map_err(db_error("Failed to begin transaction"))?;

        // An upsert rather than INSERT OR REPLACE, which would cascade-delete likes.
        sqlx::query(
            r#"
            INSERT INTO articles
            (id, title, summary, content, sections, citations, publication_date,
             reading_time_minutes, author, tags, image_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                summary = excluded.summary,
                content = excluded.content,
                sections = excluded.sections,
                citations = excluded.citations,
                publication_date = excluded.publication_date,
                reading_time_minutes = excluded.reading_time_minutes,
                author = excluded.author,
                tags = excluded.tags,
                image_url = excluded.image_url,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&article.id)
        .bind(&article.title)
        .bind(&article.summary)
        .bind(&article.content)
        .bind(sections)
        .bind(citations)
        .bind(format_date(article.publication_date))
        .bind(article.reading_time_minutes as i64)
        .bind(&article.author)
        .bind(tags)
        .bind(article.image_url.as_deref())
        .bind(article.created_at.to_rfc3339())
        .bind(article.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to store article"))?;

        sqlx::query("DELETE FROM articles_fts WHERE article_id = ?")
            .bind(&article.id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to refresh search index"))?;

        sqlx::query(
            "INSERT INTO articles_fts (article_id, title, summary, content, tags) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&article.id)
        .bind(&article.title)
        .bind(&article.summary)
        .bind(&article.content)
        .bind(article.tags.join(" "))
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to index article"))?;

        tx.commit().await.map_err(db_error("Failed to commit article"))?;
        Ok(())
    }

    async fn get_article(&self, id: &str) -> Result<Option<Article>> {
        let row = sqlx::query(&format!("SELECT {} FROM articles WHERE id = ?", ARTICLE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get article"))?;
        row.as_ref().map(article_from_row).transpose()
    }

    async fn list_articles(&self, limit: usize, offset: usize) -> Result<Vec<Article>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM articles ORDER BY publication_date DESC, id DESC LIMIT ? OFFSET ?",
            ARTICLE_COLUMNS
        ))
        .bind(sql_count(limit))
        .bind(sql_count(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list articles"))?;
        rows.iter().map(article_from_row).collect()
    }

    async fn delete_article(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error("Failed to begin transaction"))?;
        sqlx::query("DELETE FROM articles_fts WHERE article_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to unindex article"))?;
        let deleted = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete article"))?;
        if deleted.rows_affected() == 0 {
            return Err(Error::NotFound(format!("article {}", id)));
        }
        tx.commit().await.map_err(db_error("Failed to commit delete"))?;
        Ok(())
    }

    async fn next_article_sequence(&self, date: NaiveDate) -> Result<u32> {
        let prefix = format!("art_{}_", date.format("%Y%m%d"));
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM articles WHERE id LIKE ?")
            .bind(format!("{}%", prefix))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to read article ids"))?;
        let highest = ids
            .iter()
            .filter_map(|id| id.strip_prefix(&prefix))
            .filter_map(|seq| seq.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        Ok(highest + 1)
    }

    async fn set_daily_article(&self, date: NaiveDate, article_id: &str) -> Result<()> {
        self.require_article(article_id).await?;
        sqlx::query(
            r#"
            INSERT INTO daily_articles (date, article_id) VALUES (?, ?)
            ON CONFLICT(date) DO UPDATE SET article_id = excluded.article_id
            "#,
        )
        .bind(format_date(date))
        .bind(article_id)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to set daily article"))?;
        Ok(())
    }

    async fn get_daily_article(&self, date: NaiveDate) -> Result<Option<Article>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM articles WHERE id = (SELECT article_id FROM daily_articles WHERE date = ?)",
            ARTICLE_COLUMNS
        ))
        .bind(format_date(date))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to get daily article"))?;
        row.as_ref().map(article_from_row).transpose()
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        let email_taken: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM users WHERE email = ? COLLATE NOCASE")
                .bind(&user.email)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("Failed to check email"))?;
        if email_taken.is_some() {
            return Err(Error::Conflict(format!("email {} is already registered", user.email)));
        }
        sqlx::query("INSERT INTO users (id, display_name, email, created_at) VALUES (?, ?, ?, ?)")
            .bind(&user.id)
            .bind(&user.display_name)
            .bind(&user.email)
            .bind(user.created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to create user"))?;
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, display_name, email, created_at FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get user"))?;
        match row {
            Some(row) => {
                let created_at: String =
                    row.try_get("created_at").map_err(db_error("Failed to read user"))?;
                Ok(Some(User {
                    id: row.try_get("id").map_err(db_error("Failed to read user"))?,
                    display_name: row
                        .try_get("display_name")
                        .map_err(db_error("Failed to read user"))?,
                    email: row.try_get("email").map_err(db_error("Failed to read user"))?,
                    created_at: parse_timestamp(&created_at)?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn like_article(&self, user_id: &str, article_id: &str) -> Result<Like> {
        self.require_user(user_id).await?;
        self.require_article(article_id).await?;
        let like = Like {
            user_id: user_id.to_string(),
            article_id: article_id.to_string(),
            created_at: Utc::now(),
        };
        let inserted = sqlx::query(
            "INSERT INTO likes (user_id, article_id, created_at) VALUES (?, ?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(&like.user_id)
        .bind(&like.article_id)
        .bind(like.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to like article"))?;
        if inserted.rows_affected() == 0 {
            return Err(Error::Conflict(format!(
                "user {} already likes {}",
                user_id, article_id
            )));
        }
        Ok(like)
    }

    async fn unlike_article(&self, user_id: &str, article_id: &str) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM likes WHERE user_id = ? AND article_id = ?")
            .bind(user_id)
            .bind(article_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to unlike article"))?;
        if deleted.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "like from {} on {}",
                user_id, article_id
            )));
        }
        Ok(())
    }

    async fn list_likes(&self, user_id: &str) -> Result<Vec<Like>> {
        let rows = sqlx::query(
            "SELECT user_id, article_id, created_at FROM likes WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list likes"))?;
        rows.iter().map(like_from_row).collect()
    }

    async fn like_count(&self, article_id: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE article_id = ?")
            .bind(article_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count likes"))?;
        Ok(count as u64)
    }

    async fn add_suggestions(&self, suggestions: &[SearchSuggestion]) -> Result<()> {
        for suggestion in suggestions {
            self.require_article(&suggestion.article_id).await?;
        }
        let mut tx = self.pool.begin().await.map_err(db_error("Failed to begin transaction"))?;
        for suggestion in suggestions {
            sqlx::query(
                r#"
                INSERT INTO search_suggestions (phrase, phrase_folded, article_id, weight)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(phrase, article_id) DO UPDATE SET weight = excluded.weight
                "#,
            )
            .bind(&suggestion.phrase)
            .bind(fold_phrase(&suggestion.phrase))
            .bind(&suggestion.article_id)
            .bind(suggestion.weight)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to add suggestion"))?;
        }
        tx.commit().await.map_err(db_error("Failed to commit suggestions"))?;
        Ok(())
    }

    async fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<SearchSuggestion>> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            r#"
            SELECT phrase, article_id, weight FROM search_suggestions
            WHERE phrase_folded LIKE ? ESCAPE '\'
            ORDER BY weight DESC, phrase ASC
            LIMIT ?
            "#,
        )
        .bind(like_prefix(&fold_phrase(prefix)))
        .bind(sql_count(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to query suggestions"))?;

        rows.iter()
            .map(|row| {
                Ok(SearchSuggestion {
                    phrase: row.try_get("phrase").map_err(db_error("Failed to read suggestion"))?,
                    article_id: row
                        .try_get("article_id")
                        .map_err(db_error("Failed to read suggestion"))?,
                    weight: row.try_get("weight").map_err(db_error("Failed to read suggestion"))?,
                })
            })
            .collect()
    }

    async fn search_fulltext(&self, query: &str, limit: usize) -> Result<Vec<ScoredArticle>> {
        let fts = match fts_query(query) {
            Some(fts) => fts,
            None => return Ok(Vec::new()),
        };
        // bm25 is lower-is-better; weights follow column order, article_id first.
        let rows = sqlx::query(
            r#"
            SELECT article_id, bm25(articles_fts, 0.0, 3.0, 2.0, 1.0, 2.0) AS rank
            FROM articles_fts
            WHERE articles_fts MATCH ?
            ORDER BY rank ASC, article_id ASC
            LIMIT ?
            "#,
        )
        .bind(fts)
        .bind(sql_count(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to run full-text search"))?;

        rows.iter()
            .map(|row| {
                let rank: f64 = row.try_get("rank").map_err(db_error("Failed to read rank"))?;
                Ok(ScoredArticle {
                    article_id: row
                        .try_get("article_id")
                        .map_err(db_error("Failed to read search hit"))?,
                    score: -rank,
                })
            })
            .collect()
    }

    async fn store_embedding(&self, embedding: &ArticleEmbedding) -> Result<()> {
        self.require_article(&embedding.article_id).await?;
        sqlx::query(
            r#"
            INSERT INTO article_embeddings (article_id, model, vector) VALUES (?, ?, ?)
            ON CONFLICT(article_id) DO UPDATE SET
                model = excluded.model,
                vector = excluded.vector
            "#,
        )
        .bind(&embedding.article_id)
        .bind(&embedding.model)
        .bind(vec_to_blob(&embedding.vector))
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to store embedding"))?;
        Ok(())
    }

    async fn search_similar(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredArticle>> {
        let rows = sqlx::query("SELECT article_id, vector FROM article_embeddings")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to read embeddings"))?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.try_get("vector").map_err(db_error("Failed to read vector"))?;
            let candidate = blob_to_vec(&blob);
            if candidate.len() != vector.len() {
                continue;
            }
            hits.push(ScoredArticle {
                article_id: row
                    .try_get("article_id")
                    .map_err(db_error("Failed to read embedding"))?,
                score: cosine_similarity(vector, &candidate) as f64,
            });
        }
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
