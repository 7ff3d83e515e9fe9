//! Ingestion integration tests
//!
//! Run the pipeline end to end from CSV files into the in-memory vector store.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use assistant_core::{
    AssistantError, Credentials, Document, Result, ReviewRow, VectorStore, METADATA_KEYS,
};
use assistant_etl::{transform_rows, CsvReviewSource, IngestionPipeline};
use assistant_vector::{AstraStore, EmbeddingClient, InMemoryVectorStore};
use async_trait::async_trait;
use proptest::prelude::*;

const HEADER: &str = "product_id,product_title,rating,total_reviews,price,top_reviews\n";

/// Deterministic embedding: counts of a few review keywords
struct KeywordEmbedding;

fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    ["budget", "camera", "battery", "display"]
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
        4
    }
}

/// Counts calls without storing anything
#[derive(Default)]
struct CountingStore {
    writes: AtomicUsize,
}

#[async_trait]
impl VectorStore for CountingStore {
    async fn add_documents(&self, documents: &[Document]) -> Result<Vec<String>> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(documents.iter().map(|_| "id".to_string()).collect())
    }

    async fn similarity_search(&self, _query: &str, _k: usize) -> Result<Vec<Document>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// AstraDB store whose endpoint refuses connections
fn unreachable_astra_store() -> AstraStore {
    let credentials = Credentials {
        google_api_key: "test-key".to_string(),
        astra_db_api_endpoint: "http://127.0.0.1:9".to_string(),
        astra_db_application_token: "AstraCS:test".to_string(),
        astra_db_keyspace: "default_keyspace".to_string(),
    };
    AstraStore::new(&credentials, "product_reviews", Arc::new(KeywordEmbedding)).unwrap()
}

fn csv_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

// =============================================================================
// End-to-end
// =============================================================================

#[tokio::test]
async fn test_csv_to_store_with_sample_query() {
    let file = csv_file(&format!(
        "{HEADER}\
         P1,Phone X,4.2,150,199.99,Great budget phone with decent battery\n\
         P2,Phone Pro,4.7,980,999.00,Stunning camera and display\n\
         P3,Phone Lite,3.8,75,149.50,Budget pick but battery drains\n"
    ));

    let store = Arc::new(InMemoryVectorStore::new(Arc::new(KeywordEmbedding)));
    let pipeline =
        IngestionPipeline::new(store.clone()).with_sample_query("best camera phone", 1);

    let result = pipeline
        .run(&CsvReviewSource::new(file.path()))
        .await
        .unwrap();

    assert_eq!(result.len(), 3);
    assert_eq!(store.len().await, 3);
    assert_eq!(result.sample_results.len(), 1);
    assert_eq!(result.sample_results[0].metadata["product_id"], "P2");
}

#[tokio::test]
async fn test_missing_price_column_fails_before_store() {
    let file = csv_file(
        "product_id,product_title,rating,total_reviews,top_reviews\n\
         P1,Phone X,4.2,150,Great value for money\n",
    );

    let store = Arc::new(CountingStore::default());
    let pipeline = IngestionPipeline::new(store.clone());

    let err = pipeline
        .run(&CsvReviewSource::new(file.path()))
        .await
        .unwrap_err();

    match err {
        AssistantError::Schema { missing } => assert_eq!(missing, vec!["price"]),
        other => panic!("expected schema error, got {other:?}"),
    }
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_header_only_csv_yields_empty_result() {
    let file = csv_file(HEADER);
    let store = Arc::new(CountingStore::default());
    let pipeline = IngestionPipeline::new(store.clone());

    let result = pipeline
        .run(&CsvReviewSource::new(file.path()))
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_file_is_source_unavailable() {
    let store = Arc::new(CountingStore::default());
    let pipeline = IngestionPipeline::new(store.clone());

    let err = pipeline
        .run(&CsvReviewSource::new("/nonexistent/data/product_reviews.csv"))
        .await
        .unwrap_err();

    assert!(matches!(err, AssistantError::SourceUnavailable(_)));
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
}

// =============================================================================
// AstraDB collection setup
// =============================================================================

#[tokio::test]
async fn test_missing_file_never_reaches_astra() {
    let pipeline = IngestionPipeline::new(Arc::new(unreachable_astra_store()));

    let err = pipeline
        .run(&CsvReviewSource::new("/nonexistent/data/product_reviews.csv"))
        .await
        .unwrap_err();

    // A store call would have surfaced as StoreWrite
    assert!(matches!(err, AssistantError::SourceUnavailable(_)), "{err:?}");
}

#[tokio::test]
async fn test_header_only_csv_never_creates_collection() {
    let file = csv_file(HEADER);
    let pipeline = IngestionPipeline::new(Arc::new(unreachable_astra_store()));

    let result = pipeline
        .run(&CsvReviewSource::new(file.path()))
        .await
        .unwrap();

    assert!(result.is_empty());
}

#[tokio::test]
async fn test_collection_created_on_first_write() {
    let file = csv_file(&format!("{HEADER}P1,Phone X,4.2,150,199.99,Great budget phone\n"));
    let pipeline = IngestionPipeline::new(Arc::new(unreachable_astra_store()));

    let err = pipeline
        .run(&CsvReviewSource::new(file.path()))
        .await
        .unwrap_err();

    match err {
        AssistantError::StoreWrite(message) => {
            assert!(message.contains("collection"), "{message}")
        }
        other => panic!("expected store write error, got {other:?}"),
    }
}

// =============================================================================
// Properties
// =============================================================================

fn arb_row() -> impl Strategy<Value = ReviewRow> {
    (
        "[A-Z][0-9]{1,6}",
        "[a-zA-Z ]{1,30}",
        0.0f64..5.0,
        0u64..100_000,
        1.0f64..5000.0,
        ".{0,80}",
    )
        .prop_map(
            |(product_id, product_title, rating, total_reviews, price, top_reviews)| ReviewRow {
                product_id,
                product_title,
                rating,
                total_reviews,
                price,
                top_reviews,
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_transform_is_one_to_one_and_ordered(
        rows in proptest::collection::vec(arb_row(), 0..40)
    ) {
        let documents = transform_rows(&rows);

        prop_assert_eq!(documents.len(), rows.len());
        for (row, doc) in rows.iter().zip(&documents) {
            prop_assert_eq!(&doc.content, &row.top_reviews);
            prop_assert_eq!(doc.metadata.len(), METADATA_KEYS.len());
            prop_assert_eq!(&doc.metadata["product_id"], &serde_json::json!(row.product_id));
            prop_assert!(METADATA_KEYS.iter().all(|k| doc.metadata.contains_key(*k)));
        }
    }

    #[test]
    fn prop_pipeline_returns_one_id_per_row(rows in proptest::collection::vec(arb_row(), 0..20)) {
        let store = Arc::new(InMemoryVectorStore::new(Arc::new(KeywordEmbedding)));
        let pipeline = IngestionPipeline::new(store.clone());

        let result = tokio_test::block_on(pipeline.run(&rows)).unwrap();

        prop_assert_eq!(result.len(), rows.len());
        prop_assert_eq!(tokio_test::block_on(store.len()), rows.len());
    }
}
