pub mod api;
pub mod cache;
pub mod cached;

pub use api::ApiClient;
pub use cache::{CachedArticle, OfflineCache, DEFAULT_CAPACITY};
pub use cached::{CachedArticleClient, Origin};

pub mod prelude {
    pub use super::{ApiClient, CachedArticleClient, OfflineCache, Origin};
    pub use bv_core::{Article, Error, Result};
}
