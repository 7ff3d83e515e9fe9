//! In-memory vector store using cosine similarity.
//!
//! Suitable for local runs and tests. Contents live only as long as the
//! store itself.

use assistant_core::{AssistantError, Document, Result, VectorStore};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::embedding::EmbeddingClient;

struct StoredDocument {
    embedding: Vec<f32>,
    document: Document,
}

/// An in-memory vector store backed by an embedding client
pub struct InMemoryVectorStore {
    embeddings: Arc<dyn EmbeddingClient>,
    documents: RwLock<Vec<StoredDocument>>,
}

impl InMemoryVectorStore {
    pub fn new(embeddings: Arc<dyn EmbeddingClient>) -> Self {
        Self {
            embeddings,
            documents: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored documents
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

/// Cosine similarity; 0.0 if either vector has zero magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add_documents(&self, documents: &[Document]) -> Result<Vec<String>> {
        let contents: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let vectors = self
            .embeddings
            .embed_documents(&contents)
            .await
            .map_err(|e| AssistantError::StoreWrite(e.to_string()))?;

        let mut stored = self.documents.write().await;
        let ids: Vec<String> = documents
            .iter()
            .zip(vectors)
            .map(|(document, embedding)| {
                stored.push(StoredDocument {
                    embedding,
                    document: document.clone(),
                });
                Uuid::new_v4().simple().to_string()
            })
            .collect();

        Ok(ids)
    }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        let query_vector = self
            .embeddings
            .embed_query(query)
            .await
            .map_err(|e| AssistantError::RetrievalUnavailable(e.to_string()))?;

        let stored = self.documents.read().await;
        let mut scored: Vec<(f32, &Document)> = stored
            .iter()
            .map(|s| (cosine_similarity(&s.embedding, &query_vector), &s.document))
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored.into_iter().map(|(_, doc)| doc.clone()).collect())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Embeds text as counts of a few fixed keywords
    struct KeywordEmbedding;

    const KEYWORDS: [&str; 3] = ["battery", "camera", "price"];

    fn keyword_vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        KEYWORDS
            .iter()
            .map(|k| lower.matches(k).count() as f32)
            .collect()
    }

    #[async_trait]
    impl EmbeddingClient for KeywordEmbedding {
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| keyword_vector(t)).collect())
        }

        async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            Ok(keyword_vector(text))
        }

        fn dimension(&self) -> usize {
            KEYWORDS.len()
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_add_returns_one_id_per_document() {
        let store = InMemoryVectorStore::new(Arc::new(KeywordEmbedding));
        let docs = vec![
            Document::new("battery is great"),
            Document::new("camera is sharp"),
        ];

        let ids = store.add_documents(&docs).await.unwrap();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_search_ranks_and_truncates() {
        let store = InMemoryVectorStore::new(Arc::new(KeywordEmbedding));
        store
            .add_documents(&[
                Document::new("camera is sharp"),
                Document::new("battery battery lasts"),
                Document::new("good price"),
            ])
            .await
            .unwrap();

        let results = store.similarity_search("how is the battery", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, "battery battery lasts");
    }

    #[tokio::test]
    async fn test_search_empty_store() {
        let store = InMemoryVectorStore::new(Arc::new(KeywordEmbedding));
        assert!(store.is_empty().await);
        let results = store.similarity_search("anything", 3).await.unwrap();
        assert!(results.is_empty());
    }
}
