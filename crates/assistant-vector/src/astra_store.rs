//! AstraDB implementation for vector storage
//!
//! Talks to the AstraDB Data API (JSON over HTTPS). Documents are stored
//! as `{_id, content, metadata, $vector}` records in a vector-enabled
//! collection.
//!
//! Author: hephaex@gmail.com

use assistant_core::{
    AppConfig, AssistantError, Credentials, Document, Result, VectorStore, VectorStoreFactory,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::embedding::{create_embedding_client, EmbeddingClient};

/// Maximum number of documents per `insertMany` command
const INSERT_BATCH_SIZE: usize = 20;

/// AstraDB vector store implementation
pub struct AstraStore {
    client: Client,
    keyspace_url: String,
    token: String,
    collection: String,
    embeddings: Arc<dyn EmbeddingClient>,
    collection_ready: OnceCell<()>,
}

/// Envelope of every Data API response
#[derive(Debug, Default, Deserialize)]
struct DataApiResponse {
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    data: Option<FindData>,
    #[serde(default)]
    errors: Vec<DataApiError>,
}

#[derive(Debug, Default, Deserialize)]
struct FindData {
    #[serde(default)]
    documents: Vec<StoredRecord>,
}

#[derive(Debug, Deserialize)]
struct StoredRecord {
    #[serde(default)]
    content: String,
    #[serde(default)]
    metadata: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    error_code: Option<String>,
}

impl DataApiResponse {
    /// Collapse the `errors` array into a single message, if any
    fn error_message(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }

        Some(
            self.errors
                .iter()
                .map(|e| match &e.error_code {
                    Some(code) => format!("{code}: {}", e.message),
                    None => e.message.clone(),
                })
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    fn inserted_ids(&self) -> Vec<String> {
        self.status
            .as_ref()
            .and_then(|s| s.get("insertedIds"))
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .map(|id| match id {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn create_collection_command(name: &str, dimension: usize) -> Value {
    json!({
        "createCollection": {
            "name": name,
            "options": {
                "vector": {
                    "dimension": dimension,
                    "metric": "cosine"
                }
            }
        }
    })
}

fn insert_many_command(records: &[Value]) -> Value {
    json!({
        "insertMany": {
            "documents": records,
            "options": { "ordered": true }
        }
    })
}

/// Split records into `insertMany` bodies of at most [`INSERT_BATCH_SIZE`],
/// keeping record order across bodies
fn plan_insert_batches(records: &[Value]) -> Vec<Value> {
    records
        .chunks(INSERT_BATCH_SIZE)
        .map(insert_many_command)
        .collect()
}

fn find_command(vector: &[f32], limit: usize) -> Value {
    json!({
        "find": {
            "sort": { "$vector": vector },
            "projection": { "content": 1, "metadata": 1 },
            "options": { "limit": limit }
        }
    })
}

fn to_record(id: &str, document: &Document, vector: Vec<f32>) -> Value {
    json!({
        "_id": id,
        "content": document.content,
        "metadata": document.metadata,
        "$vector": vector,
    })
}

impl AstraStore {
    /// Create a new AstraDB handle. No network I/O happens here.
    pub fn new(
        credentials: &Credentials,
        collection: impl Into<String>,
        embeddings: Arc<dyn EmbeddingClient>,
    ) -> Result<Self> {
        let endpoint = credentials.astra_db_api_endpoint.trim_end_matches('/');
        reqwest::Url::parse(endpoint).map_err(|e| {
            AssistantError::Configuration(format!(
                "Invalid ASTRA_DB_API_ENDPOINT '{endpoint}': {e}"
            ))
        })?;

        Ok(Self {
            client: Client::new(),
            keyspace_url: format!(
                "{endpoint}/api/json/v1/{}",
                credentials.astra_db_keyspace
            ),
            token: credentials.astra_db_application_token.clone(),
            collection: collection.into(),
            embeddings,
            collection_ready: OnceCell::new(),
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.keyspace_url, self.collection)
    }

    async fn command(
        &self,
        url: &str,
        body: &Value,
    ) -> std::result::Result<DataApiResponse, String> {
        let response = self
            .client
            .post(url)
            .header("Token", &self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("HTTP {status}: {error_text}"));
        }

        let parsed: DataApiResponse = response
            .json()
            .await
            .map_err(|e| format!("failed to parse response: {e}"))?;

        match parsed.error_message() {
            Some(message) => Err(message),
            None => Ok(parsed),
        }
    }

    /// Create the collection on first write; later calls are no-ops
    async fn ensure_collection(&self) -> Result<()> {
        self.collection_ready
            .get_or_try_init(|| self.init_collection())
            .await?;
        Ok(())
    }

    async fn init_collection(&self) -> Result<()> {
        let body = create_collection_command(&self.collection, self.embeddings.dimension());

        self.command(&self.keyspace_url, &body)
            .await
            .map_err(|e| {
                AssistantError::StoreWrite(format!(
                    "Failed to create collection {}: {e}",
                    self.collection
                ))
            })?;

        tracing::info!(
            collection = %self.collection,
            dimension = self.embeddings.dimension(),
            "AstraDB collection ready"
        );
        Ok(())
    }
}

#[async_trait]
impl VectorStore for AstraStore {
    async fn add_documents(&self, documents: &[Document]) -> Result<Vec<String>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        self.ensure_collection().await?;

        let contents: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let vectors = self
            .embeddings
            .embed_documents(&contents)
            .await
            .map_err(|e| AssistantError::StoreWrite(e.to_string()))?;

        if vectors.len() != documents.len() {
            return Err(AssistantError::StoreWrite(format!(
                "Embedding count {} does not match document count {}",
                vectors.len(),
                documents.len()
            )));
        }

        let ids: Vec<String> = documents
            .iter()
            .map(|_| Uuid::new_v4().simple().to_string())
            .collect();

        let records: Vec<Value> = documents
            .iter()
            .zip(vectors)
            .zip(&ids)
            .map(|((document, vector), id)| to_record(id, document, vector))
            .collect();

        let url = self.collection_url();
        let mut inserted = Vec::with_capacity(ids.len());

        for body in plan_insert_batches(&records) {
            tracing::debug!(collection = %self.collection, "insertMany");
            let response = self.command(&url, &body).await.map_err(|e| {
                AssistantError::StoreWrite(format!("Failed to insert documents: {e}"))
            })?;
            inserted.extend(response.inserted_ids());
        }

        Ok(inserted)
    }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        let vector = self
            .embeddings
            .embed_query(query)
            .await
            .map_err(|e| AssistantError::RetrievalUnavailable(e.to_string()))?;

        let response = self
            .command(&self.collection_url(), &find_command(&vector, k))
            .await
            .map_err(|e| {
                AssistantError::RetrievalUnavailable(format!("Vector search failed: {e}"))
            })?;

        Ok(response
            .data
            .unwrap_or_default()
            .documents
            .into_iter()
            .map(|record| Document {
                content: record.content,
                metadata: record.metadata,
            })
            .collect())
    }

    fn name(&self) -> &str {
        "astradb"
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Builds [`AstraStore`] handles from application config and credentials
pub struct AstraStoreFactory {
    config: AppConfig,
    credentials: Credentials,
}

impl AstraStoreFactory {
    pub fn new(config: AppConfig, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
        }
    }

    /// Build the concrete store without boxing it
    pub fn build_store(&self) -> Result<AstraStore> {
        let collection = self.config.collection_name()?;
        let embeddings = create_embedding_client(&self.config.embedding_model, &self.credentials);
        AstraStore::new(&self.credentials, collection, embeddings)
    }
}

#[async_trait]
impl VectorStoreFactory for AstraStoreFactory {
    async fn build(&self) -> Result<Arc<dyn VectorStore>> {
        Ok(Arc::new(self.build_store()?))
    }
}
