//! Assistant Retriever - Similarity retrieval over product reviews
//!
//! [`RetrievalService`] builds its vector store handle on first use and
//! reuses it for every later query. Ranking is entirely up to the store;
//! results are passed through unmodified.
//!
//! Author: hephaex@gmail.com

use assistant_core::{AppConfig, AssistantError, Document, Result, VectorStore, VectorStoreFactory};
use std::sync::Arc;
use tokio::sync::OnceCell;

// ============================================================================
// Retriever
// ============================================================================

/// A vector store bound to a fixed result count
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl Retriever {
    pub fn new(store: Arc<dyn VectorStore>, top_k: usize) -> Self {
        Self { store, top_k }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Run `query` verbatim against the store
    pub async fn invoke(&self, query: &str) -> Result<Vec<Document>> {
        self.store
            .similarity_search(query, self.top_k)
            .await
            .map_err(|e| match e {
                AssistantError::RetrievalUnavailable(_) => e,
                other => AssistantError::RetrievalUnavailable(other.to_string()),
            })
    }
}

// ============================================================================
// Retrieval Service
// ============================================================================

/// Lazily initialised retrieval front end
pub struct RetrievalService {
    factory: Arc<dyn VectorStoreFactory>,
    top_k: usize,
    retriever: OnceCell<Retriever>,
}

impl RetrievalService {
    /// Create a service; nothing is built until the first query
    pub fn new(factory: Arc<dyn VectorStoreFactory>, top_k: usize) -> Self {
        Self {
            factory,
            top_k,
            retriever: OnceCell::new(),
        }
    }

    /// Create a service using `retriever.top_k` from config (default 3)
    pub fn from_config(factory: Arc<dyn VectorStoreFactory>, config: &AppConfig) -> Self {
        Self::new(factory, config.top_k())
    }

    /// Whether the store handle has been built
    pub fn is_loaded(&self) -> bool {
        self.retriever.initialized()
    }

    /// Get the retriever, building the store handle on first call.
    ///
    /// A failed build is not cached; the next call tries again.
    pub async fn load_retriever(&self) -> Result<&Retriever> {
        self.retriever
            .get_or_try_init(|| async {
                let store = self.factory.build().await.map_err(|e| {
                    AssistantError::RetrievalUnavailable(format!(
                        "Failed to build vector store: {e}"
                    ))
                })?;

                tracing::info!(store = store.name(), top_k = self.top_k, "Retriever loaded");
                Ok::<_, AssistantError>(Retriever::new(store, self.top_k))
            })
            .await
    }

    /// Return at most `top_k` documents most similar to `query`
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        let retriever = self.load_retriever().await?;
        let results = retriever.invoke(query).await?;

        tracing::debug!(results = results.len(), "Retrieved documents");
        Ok(results)
    }
}

// ============================================================================
// Tests
// ============================================================================
