//! Assistant Configuration Management
//!
//! Handles configuration from a TOML file and environment variables,
//! plus the credentials required to reach the embedding provider and
//! the vector store.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of documents returned per query
pub const DEFAULT_TOP_K: usize = 3;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Environment variables that must be set before any store operation
pub const REQUIRED_ENV_VARS: [&str; 4] = [
    "GOOGLE_API_KEY",
    "ASTRA_DB_API_ENDPOINT",
    "ASTRA_DB_APPLICATION_TOKEN",
    "ASTRA_DB_KEYSPACE",
];

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// AstraDB collection settings
    pub astra_db: Option<AstraDbConfig>,

    /// Retriever settings (absent means defaults)
    pub retriever: Option<RetrieverConfig>,

    /// Embedding model selection
    pub embedding_model: EmbeddingModelConfig,

    /// Input data locations
    pub data: DataConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Load from `path` if given, otherwise from the default location when it
    /// exists, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(DEFAULT_CONFIG_PATH)?
            }
            None => Self::default(),
        };

        config.with_env_override()
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("ASTRA_DB_COLLECTION_NAME") {
            self.astra_db = Some(AstraDbConfig {
                collection_name: name,
            });
        }

        if let Some(top_k) = lookup("RETRIEVER_TOP_K") {
            let parsed = top_k
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "RETRIEVER_TOP_K".to_string(),
                    value: top_k.clone(),
                })?;
            self.retriever = Some(RetrieverConfig { top_k: parsed });
        }

        // Embedding model
        if let Some(provider) = lookup("EMBEDDING_PROVIDER") {
            self.embedding_model.provider = provider.parse()?;
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            self.embedding_model.model_name = model;
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            self.embedding_model.ollama_url = url;
        }

        if let Some(path) = lookup("PRODUCT_REVIEWS_CSV") {
            self.data.csv_path = PathBuf::from(path);
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }

        self.validate()?;
        Ok(self)
    }

    /// Replace `retriever.top_k`, rejecting zero
    pub fn with_top_k(mut self, top_k: usize) -> Result<Self, ConfigError> {
        self.retriever = Some(RetrieverConfig { top_k });
        self.validate()?;
        Ok(self)
    }

    /// Check values that parse but cannot be used
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k() == 0 {
            return Err(ConfigError::InvalidValue {
                key: "retriever.top_k".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Collection name, required for every store operation
    pub fn collection_name(&self) -> Result<&str, ConfigError> {
        self.astra_db
            .as_ref()
            .map(|db| db.collection_name.as_str())
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingRequired("astra_db.collection_name".to_string()))
    }

    /// Number of documents a query returns
    pub fn top_k(&self) -> usize {
        self.retriever
            .as_ref()
            .map(|r| r.top_k)
            .unwrap_or(DEFAULT_TOP_K)
    }
}

/// AstraDB collection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstraDbConfig {
    /// Collection holding product review documents
    pub collection_name: String,
}

/// Retriever configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieverConfig {
    /// Maximum number of documents returned per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingModelConfig {
    /// Embedding provider to use
    pub provider: EmbeddingProvider,

    /// Model identifier
    pub model_name: String,

    /// Ollama server URL
    pub ollama_url: String,
}

impl Default for EmbeddingModelConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Google,
            model_name: "models/text-embedding-004".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
        }
    }
}

/// Supported embedding providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Google,
    Ollama,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "ollama" => Ok(Self::Ollama),
            _ => Err(ConfigError::InvalidValue {
                key: "EMBEDDING_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Input data configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Scraped product reviews
    pub csv_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("data/product_reviews.csv"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Secrets and endpoints for the embedding provider and AstraDB
#[derive(Clone)]
pub struct Credentials {
    /// Google Generative Language API key
    pub google_api_key: String,

    /// AstraDB Data API endpoint URL
    pub astra_db_api_endpoint: String,

    /// AstraDB application token
    pub astra_db_application_token: String,

    /// AstraDB keyspace (namespace)
    pub astra_db_keyspace: String,
}

impl Credentials {
    /// Read credentials from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials from an arbitrary variable lookup.
    ///
    /// Every missing or empty variable is reported together.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let values: Vec<Option<String>> = REQUIRED_ENV_VARS
            .iter()
            .map(|key| lookup(key).filter(|v| !v.trim().is_empty()))
            .collect();

        let missing: Vec<String> = REQUIRED_ENV_VARS
            .iter()
            .zip(&values)
            .filter(|(_, value)| value.is_none())
            .map(|(key, _)| key.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(ConfigError::MissingEnvironment(missing));
        }

        let mut values = values.into_iter().flatten();
        let mut next = || values.next().unwrap_or_default();

        Ok(Self {
            google_api_key: next(),
            astra_db_api_endpoint: next(),
            astra_db_application_token: next(),
            astra_db_keyspace: next(),
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("google_api_key", &"<redacted>")
            .field("astra_db_api_endpoint", &self.astra_db_api_endpoint)
            .field("astra_db_application_token", &"<redacted>")
            .field("astra_db_keyspace", &self.astra_db_keyspace)
            .finish()
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingEnvironment(Vec<String>),
}
