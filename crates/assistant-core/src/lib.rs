//! Assistant Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the product assistant:
//! - Review rows and the documents derived from them
//! - Common error types
//! - The vector store capability interface and its factory
//! - Configuration and credential management

pub mod config;

pub use config::{
    AppConfig, AstraDbConfig, ConfigError, Credentials, DataConfig, EmbeddingModelConfig,
    EmbeddingProvider, LoggingConfig, RetrieverConfig, DEFAULT_TOP_K, REQUIRED_ENV_VARS,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for assistant operations
#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Review source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Missing columns in review data: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("Malformed review row {row}: {message}")]
    MalformedRow { row: u64, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store write failed: {0}")]
    StoreWrite(String),

    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for AssistantError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AssistantError>;

// ============================================================================
// Review Data
// ============================================================================

/// Columns every review source must provide, in canonical order
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "product_id",
    "product_title",
    "rating",
    "total_reviews",
    "price",
    "top_reviews",
];

/// Metadata keys copied from a review row onto its document
pub const METADATA_KEYS: [&str; 5] = [
    "product_id",
    "product_title",
    "rating",
    "total_reviews",
    "price",
];

/// One product's scraped review record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRow {
    /// Marketplace product identifier
    pub product_id: String,

    /// Product title as listed
    pub product_title: String,

    /// Average star rating
    pub rating: f64,

    /// Number of reviews on the listing
    pub total_reviews: u64,

    /// Listed price
    pub price: f64,

    /// Top reviews, possibly several concatenated
    pub top_reviews: String,
}

// ============================================================================
// Documents
// ============================================================================

/// A text passage with metadata, as stored in and returned by a vector store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Text that gets embedded
    pub content: String,

    /// Arbitrary key-value metadata
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    /// Create a document with empty metadata
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Add a metadata value
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Capability interface of a vector database
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed and store documents, returning one id per document in input order
    async fn add_documents(&self, documents: &[Document]) -> Result<Vec<String>>;

    /// Return at most `k` documents ranked by similarity to `query`
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Builds a vector store handle on demand
#[async_trait]
pub trait VectorStoreFactory: Send + Sync {
    async fn build(&self) -> Result<Arc<dyn VectorStore>>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_builder() {
        let doc = Document::new("Great value for money")
            .with_metadata("product_id", "P1")
            .with_metadata("rating", 4.2);

        assert_eq!(doc.content, "Great value for money");
        assert_eq!(doc.metadata.get("product_id"), Some(&serde_json::json!("P1")));
        assert_eq!(doc.metadata.get("rating"), Some(&serde_json::json!(4.2)));
    }

    #[test]
    fn test_schema_error_lists_missing_columns() {
        let err = AssistantError::Schema {
            missing: vec!["price".to_string(), "top_reviews".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Missing columns in review data: price, top_reviews"
        );
    }

    #[test]
    fn test_metadata_keys_exclude_content_column() {
        assert!(!METADATA_KEYS.contains(&"top_reviews"));
        assert!(METADATA_KEYS
            .iter()
            .all(|key| REQUIRED_COLUMNS.contains(key)));
    }

    #[test]
    fn test_config_error_converts_to_configuration() {
        let err: AssistantError =
            ConfigError::MissingRequired("astra_db.collection_name".to_string()).into();
        assert!(matches!(err, AssistantError::Configuration(_)));
        assert!(err.to_string().contains("astra_db.collection_name"));
    }
}
