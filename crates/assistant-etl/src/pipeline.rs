//! Ingestion pipeline
//!
//! Loads review rows, turns them into documents and stores them in one
//! batch. An optional sample query afterwards is advisory only.

use std::sync::Arc;

use assistant_core::{Document, Result, VectorStore};

use crate::source::ReviewSource;
use crate::transform::transform_rows;

/// Outcome of one ingestion run
#[derive(Debug, Clone, Default)]
pub struct IngestionResult {
    /// Store-assigned ids, in document order
    pub inserted_ids: Vec<String>,

    /// Results of the sample query (empty if none ran or it failed)
    pub sample_results: Vec<Document>,
}

impl IngestionResult {
    pub fn len(&self) -> usize {
        self.inserted_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inserted_ids.is_empty()
    }
}

/// Advisory query issued after a successful store
#[derive(Debug, Clone)]
struct SampleQuery {
    query: String,
    k: usize,
}

/// Source -> transform -> store
pub struct IngestionPipeline {
    store: Arc<dyn VectorStore>,
    sample: Option<SampleQuery>,
}

impl IngestionPipeline {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self {
            store,
            sample: None,
        }
    }

    /// Run `query` against the freshly populated store after ingestion
    pub fn with_sample_query(mut self, query: impl Into<String>, k: usize) -> Self {
        self.sample = Some(SampleQuery {
            query: query.into(),
            k,
        });
        self
    }

    /// Ingest every row of `source`. Errors are returned as-is; nothing is retried.
    pub async fn run(&self, source: &dyn ReviewSource) -> Result<IngestionResult> {
        tracing::info!(
            source = %source.describe(),
            store = self.store.name(),
            "Starting ingestion"
        );

        let rows = source.load()?;
        let documents = transform_rows(&rows);
        tracing::info!(documents = documents.len(), "Transformed review rows");

        if documents.is_empty() {
            tracing::info!("No documents to ingest");
            return Ok(IngestionResult::default());
        }

        let inserted_ids = self.store.add_documents(&documents).await?;

        if inserted_ids.len() != documents.len() {
            tracing::warn!(
                inserted = inserted_ids.len(),
                expected = documents.len(),
                "Store returned a different number of ids than documents submitted"
            );
        }
        tracing::info!(inserted = inserted_ids.len(), "Stored documents");

        let sample_results = match &self.sample {
            Some(sample) => self.run_sample(sample).await,
            None => Vec::new(),
        };

        Ok(IngestionResult {
            inserted_ids,
            sample_results,
        })
    }

    async fn run_sample(&self, sample: &SampleQuery) -> Vec<Document> {
        match self.store.similarity_search(&sample.query, sample.k).await {
            Ok(results) => {
                for (idx, doc) in results.iter().enumerate() {
                    tracing::info!(
                        rank = idx + 1,
                        product_id = ?doc.metadata.get("product_id"),
                        "Sample query hit"
                    );
                }
                results
            }
            Err(e) => {
                tracing::warn!(query = %sample.query, error = %e, "Sample query failed");
                Vec::new()
            }
        }
    }
}
