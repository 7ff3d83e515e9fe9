//! Assistant Vector - Embeddings and vector database backends
//!
//! Provides the embedding clients and the [`VectorStore`] implementations
//! used to store product review documents and search them by similarity.
//!
//! [`VectorStore`]: assistant_core::VectorStore

pub mod astra_store;
pub mod embedding;
pub mod memory_store;

pub use astra_store::{AstraStore, AstraStoreFactory};
pub use embedding::{
    create_embedding_client, EmbeddingClient, GoogleEmbedding, OllamaEmbedding, TaskType,
};
pub use memory_store::InMemoryVectorStore;
