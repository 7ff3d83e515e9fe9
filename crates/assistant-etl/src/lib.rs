//! Assistant ETL - Review ingestion
//!
//! Reads product reviews from a [`ReviewSource`], converts each row into a
//! document and stores the whole set in a vector store:
//!
//! ```text
//! ReviewSource -> transform_rows -> VectorStore::add_documents
//! ```

pub mod pipeline;
pub mod source;
pub mod transform;

pub use pipeline::{IngestionPipeline, IngestionResult};
pub use source::{validate_columns, write_reviews_csv, CsvReviewSource, ReviewSource};
pub use transform::{row_to_document, transform_rows};
