//! Product Assistant CLI - Command-line interface
//!
//! Usage:
//!   prod-assistant ingest [--csv <path>] [--sample-query <query>]
//!   prod-assistant retrieve <query> [--top-k <n>]

use std::path::PathBuf;
use std::sync::Arc;

use assistant_core::{AppConfig, Credentials, Document, LoggingConfig};
use assistant_etl::{CsvReviewSource, IngestionPipeline};
use assistant_retriever::RetrievalService;
use assistant_vector::AstraStoreFactory;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "prod-assistant")]
#[command(about = "Product review ingestion and retrieval")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest product reviews into the vector store
    Ingest {
        /// CSV file with product reviews (defaults to data.csv_path)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Query to run against the store once ingestion succeeds
        #[arg(long)]
        sample_query: Option<String>,
    },
    /// Retrieve reviews relevant to a query
    Retrieve {
        /// Question to ask
        query: String,

        /// Override retriever.top_k
        #[arg(long)]
        top_k: Option<usize>,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_documents(documents: &[Document]) {
    for (idx, doc) in documents.iter().enumerate() {
        println!(
            "Result {}: {}\nMetadata: {}\n",
            idx + 1,
            doc.content,
            serde_json::Value::Object(doc.metadata.clone())
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    init_tracing(&config.logging);

    // Fail before any network call if a secret is missing
    let credentials = Credentials::from_env()?;

    match cli.command {
        Commands::Ingest { csv, sample_query } => {
            let path = csv.unwrap_or_else(|| config.data.csv_path.clone());
            let top_k = config.top_k();

            // The collection is created on the first write, after the CSV loads
            let store = AstraStoreFactory::new(config, credentials).build_store()?;
            let mut pipeline = IngestionPipeline::new(Arc::new(store));
            if let Some(query) = sample_query {
                pipeline = pipeline.with_sample_query(query, top_k);
            }

            let result = pipeline.run(&CsvReviewSource::new(&path)).await?;
            println!(
                "Inserted {} documents from {}",
                result.len(),
                path.display()
            );
            print_documents(&result.sample_results);
        }
        Commands::Retrieve { query, top_k } => {
            if let Some(top_k) = top_k {
                config = config.with_top_k(top_k)?;
            }

            let factory = Arc::new(AstraStoreFactory::new(config.clone(), credentials));
            let service = RetrievalService::from_config(factory, &config);

            let results = service.retrieve(&query).await?;
            tracing::info!(results = results.len(), "Query complete");
            print_documents(&results);
        }
    }

    Ok(())
}
