//! Embedding client for generating vector representations
//!
//! Supports the Google Generative Language and Ollama embedding APIs.
//!
//! Author: hephaex@gmail.com

use assistant_core::{AssistantError, Credentials, EmbeddingModelConfig, EmbeddingProvider, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Embedding Trait
// ============================================================================

/// Trait for embedding generation
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Generate embeddings for documents that will be stored
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Generate the embedding for a search query
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Get embedding dimension
    fn dimension(&self) -> usize;
}

// ============================================================================
// Google Embedding Client
// ============================================================================

const GOOGLE_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Maximum number of texts per `batchEmbedContents` request
const GOOGLE_BATCH_LIMIT: usize = 100;

/// Google Generative Language embedding API client
pub struct GoogleEmbedding {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
}

/// How the embedding will be used, which lets the model specialise it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

#[derive(Debug, Serialize)]
struct GoogleBatchRequest<'a> {
    requests: Vec<GoogleEmbedRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEmbedRequest<'a> {
    model: &'a str,
    content: GoogleContent<'a>,
    task_type: TaskType,
}

#[derive(Debug, Serialize)]
struct GoogleContent<'a> {
    parts: Vec<GooglePart<'a>>,
}

#[derive(Debug, Serialize)]
struct GooglePart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GoogleBatchResponse {
    #[serde(default)]
    embeddings: Vec<GoogleEmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct GoogleEmbeddingValues {
    values: Vec<f32>,
}

/// Prefix bare model ids with `models/` as the REST API expects
pub fn normalize_model_name(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

fn build_batch_request<'a>(
    model: &'a str,
    texts: &'a [String],
    task_type: TaskType,
) -> GoogleBatchRequest<'a> {
    GoogleBatchRequest {
        requests: texts
            .iter()
            .map(|text| GoogleEmbedRequest {
                model,
                content: GoogleContent {
                    parts: vec![GooglePart { text }],
                },
                task_type,
            })
            .collect(),
    }
}

/// One request per [`GOOGLE_BATCH_LIMIT`] texts, in input order
fn plan_batch_requests<'a>(
    model: &'a str,
    texts: &'a [String],
    task_type: TaskType,
) -> Vec<GoogleBatchRequest<'a>> {
    texts
        .chunks(GOOGLE_BATCH_LIMIT)
        .map(|batch| build_batch_request(model, batch, task_type))
        .collect()
}

impl GoogleEmbedding {
    /// Create a new Google embedding client
    pub fn new(api_key: impl Into<String>, model: impl AsRef<str>) -> Self {
        let model = normalize_model_name(model.as_ref());
        let dimension = match model.as_str() {
            "models/text-embedding-004" => 768,
            "models/embedding-001" => 768,
            "models/gemini-embedding-001" => 3072,
            _ => 768, // Default
        };

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: GOOGLE_API_BASE.to_string(),
            model,
            dimension,
        }
    }

    /// Create from config
    pub fn from_config(config: &EmbeddingModelConfig, credentials: &Credentials) -> Self {
        Self::new(credentials.google_api_key.clone(), &config.model_name)
    }

    /// Set custom base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn embed_with_task(
        &self,
        texts: &[String],
        task_type: TaskType,
    ) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for request in plan_batch_requests(&self.model, texts, task_type) {
            let expected = request.requests.len();

            let response = self
                .client
                .post(format!(
                    "{}/{}:batchEmbedContents",
                    self.base_url, self.model
                ))
                .header("x-goog-api-key", &self.api_key)
                .json(&request)
                .send()
                .await
                .map_err(|e| {
                    AssistantError::Embedding(format!("Embedding request failed: {e}"))
                })?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                return Err(AssistantError::Embedding(format!(
                    "Google embedding error ({status}): {error_text}"
                )));
            }

            let result: GoogleBatchResponse = response.json().await.map_err(|e| {
                AssistantError::Embedding(format!("Failed to parse embedding response: {e}"))
            })?;

            if result.embeddings.len() != expected {
                return Err(AssistantError::Embedding(format!(
                    "Expected {} embeddings, received {}",
                    expected,
                    result.embeddings.len()
                )));
            }

            embeddings.extend(result.embeddings.into_iter().map(|e| e.values));
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingClient for GoogleEmbedding {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(count = texts.len(), model = %self.model, "Embedding documents");
        self.embed_with_task(texts, TaskType::RetrievalDocument)
            .await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let results = self
            .embed_with_task(&[text.to_string()], TaskType::RetrievalQuery)
            .await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| AssistantError::Embedding("No embedding returned".to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Ollama Embedding Client
// ============================================================================

/// Ollama embedding API client
pub struct OllamaEmbedding {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedding {
    /// Create a new Ollama embedding client
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        let dimension = match model.as_str() {
            "nomic-embed-text" => 768,
            "mxbai-embed-large" => 1024,
            "all-minilm" => 384,
            _ => 768, // Default for most models
        };

        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model,
            dimension,
        }
    }

    /// Create from config
    pub fn from_config(config: &EmbeddingModelConfig) -> Self {
        Self::new(config.ollama_url.clone(), config.model_name.clone())
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbedding {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // Ollama doesn't have native batch embedding, so we process sequentially
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed_query(text).await?);
        }
        Ok(results)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let request = OllamaEmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AssistantError::Embedding(format!("Ollama embedding request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AssistantError::Embedding(format!(
                "Ollama embedding error: {error_text}"
            )));
        }

        let result: OllamaEmbeddingResponse = response.json().await.map_err(|e| {
            AssistantError::Embedding(format!("Failed to parse embedding response: {e}"))
        })?;

        Ok(result.embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create an embedding client from config
pub fn create_embedding_client(
    config: &EmbeddingModelConfig,
    credentials: &Credentials,
) -> Arc<dyn EmbeddingClient> {
    match config.provider {
        EmbeddingProvider::Google => Arc::new(GoogleEmbedding::from_config(config, credentials)),
        EmbeddingProvider::Ollama => Arc::new(OllamaEmbedding::from_config(config)),
    }
}

// ============================================================================
// Tests
// ============================================================================
