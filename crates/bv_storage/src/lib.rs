use async_trait::async_trait;
use bv_core::{ArticleStorage, Error, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

pub mod backends;
pub mod search;

pub use backends::*;
pub use search::{HybridSearch, MatchKind, SearchConfig, SearchResult};

#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn get_error_message() -> &'static str;
    async fn new() -> Result<Self> where Self: Sized;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    Memory,
    #[default]
    Sqlite,
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(Error::Storage(format!(
                "Unknown storage backend '{}', expected memory or sqlite",
                other
            ))),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Lowercased alphanumeric runs. Shared by both backends so ranking agrees.
pub fn query_terms(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub async fn create_storage(kind: StorageKind, url: Option<&str>) -> Result<Arc<dyn ArticleStorage>> {
    info!("Opening {} storage", kind);
    match kind {
        StorageKind::Memory => Ok(Arc::new(InMemoryStorage::new())),
        #[cfg(feature = "sqlite")]
        StorageKind::Sqlite => {
            let storage = match url {
                Some(url) => SQLiteStorage::connect(url).await?,
                None => <SQLiteStorage as StorageBackend>::new().await?,
            };
            Ok(Arc::new(storage))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageKind::Sqlite => {
            let _ = url;
            Err(Error::Storage("bv_storage was built without the sqlite feature".into()))
        }
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::search::*;
    pub use super::{create_storage, StorageBackend, StorageKind};
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_terms() {
        assert_eq!(query_terms("Ashoka's  Edicts!"), vec!["ashoka", "s", "edicts"]);
        assert!(query_terms(" -- ").is_empty());
    }

    #[test]
    fn test_storage_kind_parse() {
        assert_eq!("Memory".parse::<StorageKind>().unwrap(), StorageKind::Memory);
        assert_eq!("sqlite".parse::<StorageKind>().unwrap(), StorageKind::Sqlite);
        assert!("postgres".parse::<StorageKind>().is_err());
    }

    #[tokio::test]
    async fn test_create_memory_storage() {
        let storage = create_storage(StorageKind::Memory, None).await.unwrap();
        assert!(storage.list_articles(10, 0).await.unwrap().is_empty());
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_backends_agree_on_unicode_suggestions() {
        use bv_core::SearchSuggestion;
        use test_support::article;

        let backends: Vec<(&str, Arc<dyn ArticleStorage>)> = vec![
            ("memory", Arc::new(InMemoryStorage::new())),
            ("sqlite", Arc::new(SQLiteStorage::in_memory().await.unwrap())),
        ];
        for (name, storage) in backends {
            storage
                .store_article(&article("art_20260215_001", "Ṛgveda", "The oldest Veda."))
                .await
                .unwrap();
            storage
                .add_suggestions(&[
                    SearchSuggestion { phrase: "Ṛgveda".into(), article_id: "art_20260215_001".into(), weight: 10 },
                    SearchSuggestion { phrase: "Śiva hymns".into(), article_id: "art_20260215_001".into(), weight: 5 },
                ])
                .await
                .unwrap();

            let phrases = |hits: Vec<bv_core::SearchSuggestion>| {
                hits.into_iter().map(|s| s.phrase).collect::<Vec<_>>()
            };
            assert_eq!(phrases(storage.suggest("ṛg", 5).await.unwrap()), vec!["Ṛgveda"], "{}", name);
            assert_eq!(phrases(storage.suggest("ṚG", 5).await.unwrap()), vec!["Ṛgveda"], "{}", name);
            assert_eq!(phrases(storage.suggest("śi", 5).await.unwrap()), vec!["Śiva hymns"], "{}", name);
            assert!(storage.suggest("rg", 5).await.unwrap().is_empty(), "{}", name);

            assert!(storage.list_articles(10, usize::MAX).await.unwrap().is_empty(), "{}", name);
            assert_eq!(storage.list_articles(usize::MAX, 0).await.unwrap().len(), 1, "{}", name);
        }
    }
}
