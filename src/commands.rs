use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

use crate::chat::{ChatSession, run_terminal_chat};
use crate::config::{Config, PineconeCredentials, get_config_dir};
use crate::database::{IndexSpec, PineconeClient, VectorIndex};
use crate::embeddings::{DocumentSplitter, OllamaClient};
use crate::indexer::{IngestReport, Ingestor};
use crate::llm::OllamaLlm;
use crate::qa::RetrievalQa;

/// Load `config.toml` from the per-user configuration directory
#[inline]
pub fn load_config() -> Result<Config> {
    Config::load(get_config_dir()?).context("Failed to load configuration")
}

/// Wire the embedder, the existing index and the chat model into a QA chain
#[inline]
pub fn build_chain(
    config: &Config,
    credentials: &PineconeCredentials,
) -> crate::Result<RetrievalQa> {
    let embedder = OllamaClient::new(config)?;
    let llm = OllamaLlm::new(config)?;
    let index =
        PineconeClient::new(&config.pinecone, credentials)?.index(&config.pinecone.index_name)?;

    info!(
        "QA chain ready: {} embeddings, {} answers, index at {}",
        embedder.model(),
        llm.model(),
        index.host()
    );

    Ok(RetrievalQa::new(
        Arc::new(embedder),
        Arc::new(index),
        Arc::new(llm),
        config.retrieval.top_k,
    ))
}

/// Embed every PDF in `data_dir` into the configured index, creating it first if needed
#[inline]
pub fn store_index(
    config: &Config,
    credentials: &PineconeCredentials,
    data_dir: &Path,
) -> Result<IngestReport> {
    let embedder = OllamaClient::new(config).context("Failed to initialize Ollama client")?;
    let splitter = DocumentSplitter::new(&config.chunking)?;
    let pinecone = PineconeClient::new(&config.pinecone, credentials)?;

    let spec = IndexSpec {
        name: config.pinecone.index_name.clone(),
        dimension: config.ollama.embedding_dimension,
        metric: config.pinecone.metric.clone(),
        cloud: config.pinecone.cloud.clone(),
        region: credentials.environment.clone(),
    };

    if pinecone.ensure_index(&spec)? {
        let wait = Duration::from_secs(config.ingestion.index_ready_wait_secs);
        if !wait.is_zero() {
            info!("Waiting {:?} for the new index to come up", wait);
            thread::sleep(wait);
        }
    }

    let index = pinecone.index(&spec.name)?;
    let ingestor = Ingestor::new(Arc::new(embedder), Arc::new(index), &config.ingestion);
    let report = ingestor
        .run(data_dir, &splitter)
        .with_context(|| format!("Failed to ingest {}", data_dir.display()))?;

    println!(
        "{} {} of {} chunks stored in '{}'",
        style("✓").green(),
        report.upserted(),
        report.total_chunks,
        spec.name
    );
    if report.skipped() > 0 {
        println!("  Skipped chunks: {}", style(report.skipped()).yellow());
    }
    if report.failed_batches() > 0 {
        println!("  Failed batches: {}", style(report.failed_batches()).red());
    }
    if let Some(stats) = &report.final_stats {
        println!("  Vectors in index: {}", stats.total_vector_count);
    }

    Ok(report)
}

/// Build the chain once, then answer HTTP requests until shutdown
#[inline]
pub async fn serve(config: Config, host: &str, port: u16) -> Result<()> {
    let credentials = PineconeCredentials::from_env()?;
    let qa = tokio::task::spawn_blocking(move || build_chain(&config, &credentials))
        .await
        .context("chain setup panicked")?
        .context("Failed to set up the QA chain")?;

    let listener = TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind {}:{}", host, port))?;

    crate::web::serve(listener, Arc::new(qa)).await
}

/// Interactive terminal chat; the chain is built by the first question
#[inline]
pub fn chat(config: Config) -> Result<()> {
    let mut session = ChatSession::new(move || {
        let credentials = PineconeCredentials::from_env()?;
        build_chain(&config, &credentials)
    });

    run_terminal_chat(&mut session)
}

/// Print the index description and its vector counts
#[inline]
pub fn show_status(config: &Config, credentials: &PineconeCredentials) -> Result<()> {
    let pinecone = PineconeClient::new(&config.pinecone, credentials)?;
    let name = &config.pinecone.index_name;

    let description = match pinecone.describe_index(name) {
        Ok(description) => description,
        Err(e) => {
            println!("Index '{}' is not available: {}", name, e);
            println!("Run 'medical-bot store-index' to create and fill it.");
            return Ok(());
        }
    };

    println!(
        "{}",
        style(format!("📊 Index '{}'", description.name)).bold().cyan()
    );
    if let Some(dimension) = description.dimension {
        println!("  Dimension: {}", dimension);
    }
    if let Some(metric) = &description.metric {
        println!("  Metric: {}", metric);
    }
    if let Some(status) = &description.status {
        let state = if status.ready {
            style(status.state.as_str()).green()
        } else {
            style(status.state.as_str()).yellow()
        };
        println!("  State: {}", state);
    }
    if let Some(host) = &description.host {
        println!("  Host: {}", host);
    }

    let stats = pinecone.index(name)?.describe_stats()?;
    println!("  Vectors: {}", stats.total_vector_count);
    if let Some(fullness) = stats.index_fullness {
        println!("  Fullness: {:.1}%", fullness * 100.0);
    }

    let mut namespaces: Vec<_> = stats.namespaces.iter().collect();
    namespaces.sort_by(|a, b| a.0.cmp(b.0));
    for (namespace, ns) in namespaces {
        let label = if namespace.is_empty() {
            "(default)"
        } else {
            namespace.as_str()
        };
        println!("    {}: {} vectors", label, ns.vector_count);
    }

    Ok(())
}
