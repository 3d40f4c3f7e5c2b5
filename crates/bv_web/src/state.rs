use bv_core::{ArticleStorage, InferenceModel};
use bv_storage::HybridSearch;
use std::sync::Arc;

pub struct AppState {
    pub storage: Arc<dyn ArticleStorage>,
    pub search: HybridSearch,
}

impl AppState {
    /// Exact-match search only.
    pub fn new(storage: Arc<dyn ArticleStorage>) -> Self {
        Self {
            search: HybridSearch::new(storage.clone()),
            storage,
        }
    }

    /// Adds vector similarity to search results.
    pub fn with_embedder(mut self, embedder: Arc<dyn InferenceModel>) -> Self {
        self.search = HybridSearch::new(self.storage.clone()).with_embedder(embedder);
        self
    }
}
