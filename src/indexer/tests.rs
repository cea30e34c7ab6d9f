use super::*;
use crate::BotError;
use crate::database::ScoredRecord;
use crate::embeddings::{ChunkOrigin, ChunkingConfig};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

/// Embeds every text except the ones listed in `fail_on`
struct StubEmbedder {
    fail_on: Vec<String>,
}

impl StubEmbedder {
    fn reliable() -> Self {
        Self {
            fail_on: Vec::new(),
        }
    }
}

impl Embedder for StubEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail_on.iter().any(|t| t == text) {
            return Err(BotError::Embedding(format!("cannot embed {}", text)));
        }
        Ok(vec![0.5; 4])
    }
}

/// Keeps records in a map keyed by id, like the remote index does
#[derive(Default)]
struct MemoryIndex {
    records: Mutex<HashMap<String, String>>,
    upsert_sizes: Mutex<Vec<usize>>,
    stats_calls: Mutex<usize>,
    fail_upsert_calls: Vec<usize>,
}

impl MemoryIndex {
    fn failing_on(calls: &[usize]) -> Self {
        Self {
            fail_upsert_calls: calls.to_vec(),
            ..Default::default()
        }
    }

    fn upsert_sizes(&self) -> Vec<usize> {
        self.upsert_sizes
            .lock()
            .expect("lock should not be poisoned")
            .clone()
    }

    fn text(&self, id: &str) -> Option<String> {
        self.records
            .lock()
            .expect("lock should not be poisoned")
            .get(id)
            .cloned()
    }

    fn len(&self) -> usize {
        self.records
            .lock()
            .expect("lock should not be poisoned")
            .len()
    }
}

impl VectorIndex for MemoryIndex {
    fn upsert(&self, records: &[IndexedRecord]) -> Result<usize> {
        let mut sizes = self
            .upsert_sizes
            .lock()
            .expect("lock should not be poisoned");
        let call = sizes.len();
        sizes.push(records.len());
        if self.fail_upsert_calls.contains(&call) {
            return Err(BotError::VectorIndex("503 service unavailable".to_string()));
        }

        let mut stored = self.records.lock().expect("lock should not be poisoned");
        for record in records {
            stored.insert(record.id.clone(), record.metadata.text.clone());
        }
        Ok(records.len())
    }

    fn query(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<ScoredRecord>> {
        Ok(Vec::new())
    }

    fn describe_stats(&self) -> Result<IndexStats> {
        *self.stats_calls.lock().expect("lock should not be poisoned") += 1;
        Ok(IndexStats {
            total_vector_count: self.len() as u64,
            ..Default::default()
        })
    }
}

fn chunks(count: usize) -> Vec<Chunk> {
    (0..count)
        .map(|i| Chunk {
            text: format!("chunk {}", i),
            origin: ChunkOrigin {
                source: PathBuf::from("data/medicine.pdf"),
                page: 1,
            },
        })
        .collect()
}

fn config(batch_size: usize) -> IngestionConfig {
    IngestionConfig {
        batch_size,
        batch_pause_ms: 0,
        ..Default::default()
    }
}

fn ingestor(embedder: StubEmbedder, index: &Arc<MemoryIndex>, batch_size: usize) -> Ingestor {
    Ingestor::new(
        Arc::new(embedder),
        Arc::clone(index) as Arc<dyn VectorIndex>,
        &config(batch_size),
    )
}

#[test]
fn one_upsert_per_batch() {
    let index = Arc::new(MemoryIndex::default());

    let report = ingestor(StubEmbedder::reliable(), &index, 100).ingest(&chunks(250));

    assert_eq!(index.upsert_sizes(), vec![100, 100, 50]);
    assert_eq!(report.batches.len(), 3);
    assert_eq!(report.total_chunks, 250);
    assert_eq!(report.upserted(), 250);
    assert_eq!(report.batches[2].start_offset, 200);
    assert!(report.batches.iter().all(BatchReport::is_clean));
}

#[test]
fn exact_multiple_of_batch_size() {
    let index = Arc::new(MemoryIndex::default());

    ingestor(StubEmbedder::reliable(), &index, 100).ingest(&chunks(200));

    assert_eq!(index.upsert_sizes(), vec![100, 100]);
}

#[test]
fn failed_embedding_skips_only_that_chunk() {
    let index = Arc::new(MemoryIndex::default());
    let embedder = StubEmbedder {
        fail_on: vec!["chunk 5".to_string()],
    };

    let report = ingestor(embedder, &index, 100).ingest(&chunks(10));

    assert_eq!(index.upsert_sizes(), vec![9]);
    assert_eq!(report.upserted(), 9);
    assert_eq!(report.batches[0].skipped.len(), 1);
    assert_eq!(report.batches[0].skipped[0].offset, 5);
    assert!(report.batches[0].skipped[0].reason.contains("chunk 5"));
    assert_eq!(index.text("5"), None);
}

#[test]
fn text_stays_with_its_own_vector_after_a_skip() {
    let index = Arc::new(MemoryIndex::default());
    let embedder = StubEmbedder {
        fail_on: vec!["chunk 2".to_string()],
    };

    ingestor(embedder, &index, 100).ingest(&chunks(5));

    assert_eq!(index.text("3").as_deref(), Some("chunk 3"));
    assert_eq!(index.text("4").as_deref(), Some("chunk 4"));
}

#[test]
fn upsert_failure_moves_on_to_next_batch() {
    let index = Arc::new(MemoryIndex::failing_on(&[0]));

    let report = ingestor(StubEmbedder::reliable(), &index, 3).ingest(&chunks(7));

    assert_eq!(index.upsert_sizes(), vec![3, 3, 1]);
    assert_eq!(report.failed_batches(), 1);
    assert!(report.batches[0].upsert_error.is_some());
    assert_eq!(report.batches[0].upserted, 0);
    assert_eq!(report.upserted(), 4);
    assert_eq!(index.text("0"), None);
    assert_eq!(index.text("3").as_deref(), Some("chunk 3"));
}

#[test]
fn rerun_overwrites_records_at_same_offsets() {
    let index = Arc::new(MemoryIndex::default());

    ingestor(StubEmbedder::reliable(), &index, 100).ingest(&chunks(4));
    let second_run: Vec<Chunk> = (0..2)
        .map(|i| Chunk {
            text: format!("revised {}", i),
            origin: ChunkOrigin {
                source: PathBuf::from("data/other.pdf"),
                page: 1,
            },
        })
        .collect();
    ingestor(StubEmbedder::reliable(), &index, 100).ingest(&second_run);

    assert_eq!(index.len(), 4);
    assert_eq!(index.text("0").as_deref(), Some("revised 0"));
    assert_eq!(index.text("1").as_deref(), Some("revised 1"));
    assert_eq!(index.text("2").as_deref(), Some("chunk 2"));
}

#[test]
fn stats_polled_every_fifth_batch_and_at_the_end() {
    let index = Arc::new(MemoryIndex::default());

    let report = ingestor(StubEmbedder::reliable(), &index, 10).ingest(&chunks(110));

    // batches 0, 5 and 10, then the final poll
    assert_eq!(
        *index.stats_calls.lock().expect("lock should not be poisoned"),
        4
    );
    assert_eq!(
        report.final_stats.map(|stats| stats.total_vector_count),
        Some(110)
    );
}

#[test]
fn empty_input_still_reports_stats() {
    let index = Arc::new(MemoryIndex::default());

    let report = ingestor(StubEmbedder::reliable(), &index, 100).ingest(&[]);

    assert!(report.batches.is_empty());
    assert!(index.upsert_sizes().is_empty());
    assert!(report.final_stats.is_some());
}

#[test]
fn run_fails_when_data_directory_is_missing() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let index = Arc::new(MemoryIndex::default());
    let splitter = DocumentSplitter::new(&ChunkingConfig::default()).expect("valid config");

    let result =
        ingestor(StubEmbedder::reliable(), &index, 100).run(&temp_dir.path().join("data"), &splitter);

    assert!(matches!(result, Err(BotError::Document(_))));
    assert!(index.upsert_sizes().is_empty());
}
