//! Review row to document transformation
//!
//! Each row becomes exactly one [`Document`]: the reviews are the content,
//! everything else about the product becomes metadata.

use assistant_core::{Document, ReviewRow};
use serde_json::json;

/// Convert one review row into a document
pub fn row_to_document(row: &ReviewRow) -> Document {
    Document::new(row.top_reviews.clone())
        .with_metadata("product_id", row.product_id.clone())
        .with_metadata("product_title", row.product_title.clone())
        .with_metadata("rating", json!(row.rating))
        .with_metadata("total_reviews", row.total_reviews)
        .with_metadata("price", json!(row.price))
}

/// Convert rows 1:1, keeping their order
pub fn transform_rows(rows: &[ReviewRow]) -> Vec<Document> {
    rows.iter().map(row_to_document).collect()
}
