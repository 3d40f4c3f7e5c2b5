use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const DEFAULT_AUTHOR: &str = "BharatVerse AI";
pub const WORDS_PER_MINUTE: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub citations: Vec<Citation>,
    pub publication_date: NaiveDate,
    pub reading_time_minutes: u32,
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_author() -> String {
    DEFAULT_AUTHOR.to_string()
}

impl Article {
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }

    pub fn preview(&self) -> ArticlePreview {
        ArticlePreview {
            id: self.id.clone(),
            title: self.title.clone(),
            summary: self.summary.clone(),
            publication_date: self.publication_date,
            reading_time_minutes: self.reading_time_minutes,
            tags: self.tags.clone(),
            image_url: self.image_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub content: String,
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub text: String,
    pub source_url: String,
    pub source_name: String,
    pub accessed_date: DateTime<Utc>,
}

/// Listing shape: everything but the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticlePreview {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub publication_date: NaiveDate,
    pub reading_time_minutes: u32,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedImage {
    pub url: String,
    pub alt_text: String,
    pub caption: Option<String>,
}

/// Raw content pulled from a source, before the LLM sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedContent {
    pub source_url: String,
    pub title: String,
    pub raw_text: String,
    #[serde(default)]
    pub images: Vec<ScrapedImage>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    pub scraped_at: DateTime<Utc>,
}

impl ScrapedContent {
    pub fn source_name(&self) -> &str {
        self.metadata
            .get("source")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    pub user_id: String,
    pub article_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSuggestion {
    pub phrase: String,
    pub article_id: String,
    pub weight: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleEmbedding {
    pub article_id: String,
    pub model: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyArticle {
    pub date: NaiveDate,
    pub article_id: String,
}

/// A ranked hit from one of the storage-native search primitives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredArticle {
    pub article_id: String,
    pub score: f64,
}

/// Builds the `art_YYYYMMDD_NNN` identifier.
/// Ids carry a three-digit sequence, so one day holds at most this many articles.
pub const MAX_DAILY_SEQUENCE: u32 = 999;

pub fn article_id(date: NaiveDate, sequence: u32) -> String {
    format!("art_{}_{:03}", date.format("%Y%m%d"), sequence)
}

pub fn is_valid_article_id(id: &str) -> bool {
    let parts: Vec<&str> = id.split('_').collect();
    match parts.as_slice() {
        ["art", date, seq] => {
            date.len() == 8
                && NaiveDate::parse_from_str(date, "%Y%m%d").is_ok()
                && seq.len() == 3
                && seq.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

pub fn reading_time_minutes(word_count: usize) -> u32 {
    let minutes = (word_count + WORDS_PER_MINUTE - 1) / WORDS_PER_MINUTE;
    minutes.max(1) as u32
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_id_format() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 15).unwrap();
        assert_eq!(article_id(date, 7), "art_20260215_007");
        assert!(is_valid_article_id("art_20260215_007"));
        assert!(!is_valid_article_id("art_20261315_007"));
        assert!(!is_valid_article_id("art_20260215_07"));
        assert!(!is_valid_article_id("article_20260215_007"));
        assert!(is_valid_article_id(&article_id(date, MAX_DAILY_SEQUENCE)));
        assert!(!is_valid_article_id(&article_id(date, MAX_DAILY_SEQUENCE + 1)));
    }

    #[test]
    fn test_reading_time_rounds_up() {
        assert_eq!(reading_time_minutes(0), 1);
        assert_eq!(reading_time_minutes(200), 1);
        assert_eq!(reading_time_minutes(201), 2);
        assert_eq!(reading_time_minutes(2400), 12);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_article_deserializes_with_defaults() {
        let json = r#"{
            "id": "art_20260215_001",
            "title": "Mauryan Empire",
            "summary": "An overview.",
            "content": "Body",
            "publication_date": "2026-02-15",
            "reading_time_minutes": 12,
            "image_url": null,
            "created_at": "2026-02-15T00:00:00Z",
            "updated_at": "2026-02-15T00:00:00Z"
        }"#;
        let article: Article = serde_json::from_str(json).unwrap();
        assert_eq!(article.author, DEFAULT_AUTHOR);
        assert!(article.tags.is_empty());
        assert!(article.citations.is_empty());
    }
}
