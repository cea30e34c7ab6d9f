// Indexer module
// Turns a directory of PDFs into vectors in the remote index, batch by batch

#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use crate::Result;
use crate::config::IngestionConfig;
use crate::database::{IndexStats, IndexedRecord, RecordMetadata, VectorIndex};
use crate::documents::load_pdf_directory;
use crate::embeddings::{Chunk, DocumentSplitter, Embedder};

/// A chunk that could not be embedded and was left out of its batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedChunk {
    /// Offset of the chunk in the run, which is also its record id
    pub offset: usize,
    pub reason: String,
}

/// Outcome of one embed-and-upsert batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub batch_index: usize,
    /// Offset of the first chunk in the batch
    pub start_offset: usize,
    /// Records the index reported as written
    pub upserted: usize,
    pub skipped: Vec<SkippedChunk>,
    /// Set when the whole batch failed to upsert
    pub upsert_error: Option<String>,
}

impl BatchReport {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.upsert_error.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub total_chunks: usize,
    pub batches: Vec<BatchReport>,
    /// Index statistics polled after the last batch, if that succeeded
    pub final_stats: Option<IndexStats>,
}

impl IngestReport {
    #[inline]
    pub fn upserted(&self) -> usize {
        self.batches.iter().map(|b| b.upserted).sum()
    }

    #[inline]
    pub fn skipped(&self) -> usize {
        self.batches.iter().map(|b| b.skipped.len()).sum()
    }

    #[inline]
    pub fn failed_batches(&self) -> usize {
        self.batches
            .iter()
            .filter(|b| b.upsert_error.is_some())
            .count()
    }
}

/// Sequential embed-and-upsert pipeline.
///
/// Record ids are the chunk offsets within one run, so running it again over
/// the same data overwrites the same records rather than adding new ones.
pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    batch_size: usize,
    batch_pause: Duration,
    stats_every_batches: usize,
}

impl Ingestor {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        config: &IngestionConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            batch_size: config.batch_size.max(1),
            batch_pause: Duration::from_millis(config.batch_pause_ms),
            stats_every_batches: config.stats_every_batches.max(1),
        }
    }

    /// Load every PDF in `data_dir`, split it and ingest the chunks.
    ///
    /// Loading errors abort the run; embedding and upsert errors are recorded
    /// in the report and the run carries on.
    #[inline]
    pub fn run(&self, data_dir: &Path, splitter: &DocumentSplitter) -> Result<IngestReport> {
        let documents = load_pdf_directory(data_dir)?;
        let chunks = splitter.split_documents(&documents);
        info!(
            "Split {} pages into {} chunks",
            documents.len(),
            chunks.len()
        );

        Ok(self.ingest(&chunks))
    }

    #[inline]
    pub fn ingest(&self, chunks: &[Chunk]) -> IngestReport {
        let batch_count = chunks.len().div_ceil(self.batch_size);
        info!(
            "Ingesting {} chunks in {} batches of up to {}",
            chunks.len(),
            batch_count,
            self.batch_size
        );

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(chunks.len() as u64).with_style(
                ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding chunks {msg}")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut report = IngestReport {
            total_chunks: chunks.len(),
            ..Default::default()
        };

        for (batch_index, batch) in chunks.chunks(self.batch_size).enumerate() {
            let start_offset = batch_index * self.batch_size;
            bar.set_message(format!("batch {}/{}", batch_index + 1, batch_count));

            let batch_report = self.process_batch(batch_index, start_offset, batch, &bar);
            let upserted = batch_report.upsert_error.is_none();
            report.batches.push(batch_report);

            if batch_index % self.stats_every_batches == 0 {
                self.log_stats();
            }

            if upserted && batch_index + 1 < batch_count && !self.batch_pause.is_zero() {
                thread::sleep(self.batch_pause);
            }
        }

        bar.finish_and_clear();

        report.final_stats = self.log_stats();
        info!(
            "Ingestion finished: {} upserted, {} skipped, {} failed batches",
            report.upserted(),
            report.skipped(),
            report.failed_batches()
        );
        report
    }

    fn process_batch(
        &self,
        batch_index: usize,
        start_offset: usize,
        batch: &[Chunk],
        bar: &ProgressBar,
    ) -> BatchReport {
        let mut report = BatchReport {
            batch_index,
            start_offset,
            ..Default::default()
        };

        let mut records = Vec::with_capacity(batch.len());
        for (position, chunk) in batch.iter().enumerate() {
            let offset = start_offset + position;
            match self.embedder.embed(&chunk.text) {
                Ok(values) => records.push(IndexedRecord {
                    id: offset.to_string(),
                    values,
                    metadata: RecordMetadata {
                        text: chunk.text.clone(),
                    },
                }),
                Err(e) => {
                    warn!(
                        "Skipping chunk {} ({} page {}): {}",
                        offset,
                        chunk.origin.source.display(),
                        chunk.origin.page,
                        e
                    );
                    report.skipped.push(SkippedChunk {
                        offset,
                        reason: e.to_string(),
                    });
                }
            }
            bar.inc(1);
        }

        match self.index.upsert(&records) {
            Ok(count) => {
                debug!(
                    "Batch {} upserted {} of {} chunks",
                    batch_index,
                    count,
                    batch.len()
                );
                report.upserted = count;
            }
            Err(e) => {
                error!(
                    "Batch {} (chunks {}..{}) failed to upsert: {}",
                    batch_index,
                    start_offset,
                    start_offset + batch.len(),
                    e
                );
                report.upsert_error = Some(e.to_string());
            }
        }

        report
    }

    fn log_stats(&self) -> Option<IndexStats> {
        match self.index.describe_stats() {
            Ok(stats) => {
                info!(
                    "Index holds {} vectors (dimension {})",
                    stats.total_vector_count,
                    stats
                        .dimension
                        .map_or_else(|| "unknown".to_string(), |d| d.to_string())
                );
                Some(stats)
            }
            Err(e) => {
                warn!("Failed to fetch index statistics: {}", e);
                None
            }
        }
    }
}
