//! Review sources
//!
//! Loads [`ReviewRow`]s from tabular data. The column set is validated once
//! against the header, before any row is read.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use assistant_core::{AssistantError, Result, ReviewRow, REQUIRED_COLUMNS};

/// Supplies the full set of review rows for one ingestion run
pub trait ReviewSource: Send + Sync {
    /// Read every row; fails if the source is unreadable or incomplete
    fn load(&self) -> Result<Vec<ReviewRow>>;

    /// Human-readable description for logging
    fn describe(&self) -> String;
}

impl ReviewSource for Vec<ReviewRow> {
    fn load(&self) -> Result<Vec<ReviewRow>> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        format!("{} in-memory rows", self.len())
    }
}

/// Check a header row against the required column set.
///
/// Extra columns are accepted. Missing ones are reported in canonical order.
pub fn validate_columns<I, S>(headers: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let present: Vec<String> = headers
        .into_iter()
        .map(|h| h.as_ref().trim().to_string())
        .collect();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !present.iter().any(|p| p == *column))
        .map(|column| column.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AssistantError::Schema { missing })
    }
}

// ============================================================================
// CSV
// ============================================================================

/// Reads review rows from a CSV file with a header row
#[derive(Debug, Clone)]
pub struct CsvReviewSource {
    path: PathBuf,
}

impl CsvReviewSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn unavailable(&self, err: impl std::fmt::Display) -> AssistantError {
        AssistantError::SourceUnavailable(format!("{}: {err}", self.path.display()))
    }
}

impl ReviewSource for CsvReviewSource {
    fn load(&self) -> Result<Vec<ReviewRow>> {
        let file = File::open(&self.path).map_err(|e| self.unavailable(e))?;
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(file);

        let headers = reader.headers().map_err(|e| self.unavailable(e))?.clone();
        validate_columns(headers.iter())?;

        let mut rows = Vec::new();
        for (index, record) in reader.deserialize::<ReviewRow>().enumerate() {
            // Conversion failures are row errors; ragged records and bad
            // encoding fail the whole source
            let row = record.map_err(|e| match e.kind() {
                csv::ErrorKind::Deserialize { .. } => AssistantError::MalformedRow {
                    // Header is line 1
                    row: e
                        .position()
                        .map(|p| p.line())
                        .unwrap_or(index as u64 + 2),
                    message: e.to_string(),
                },
                _ => self.unavailable(&e),
            })?;
            rows.push(row);
        }

        tracing::debug!(path = %self.path.display(), rows = rows.len(), "Loaded review rows");
        Ok(rows)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Write review rows as CSV with the canonical header, creating the parent
/// directory if needed. The output is readable by [`CsvReviewSource`].
pub fn write_reviews_csv(path: impl AsRef<Path>, rows: &[ReviewRow]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer
        .write_record(REQUIRED_COLUMNS)
        .context("Failed to write CSV header")?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write review for {}", row.product_id))?;
    }
    writer.flush().context("Failed to flush CSV writer")?;

    tracing::info!(path = %path.display(), rows = rows.len(), "Saved review rows");
    Ok(())
}
