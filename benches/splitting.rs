use criterion::{Criterion, criterion_group, criterion_main};
use medical_bot::documents::Document;
use medical_bot::embeddings::{ChunkingConfig, DocumentSplitter};
use std::hint::black_box;
use std::path::PathBuf;

const PARAGRAPH: &str = "Hypertension is persistently raised arterial blood pressure. \
It is usually asymptomatic and is found on routine screening. Untreated, it raises the \
risk of stroke, myocardial infarction, heart failure and chronic kidney disease. \
Lifestyle changes such as reduced salt intake and regular exercise are first-line measures.";

pub fn criterion_benchmark(c: &mut Criterion) {
    let documents: Vec<Document> = (1..=50)
        .map(|page| Document {
            source: PathBuf::from("data/medical-encyclopedia.pdf"),
            page,
            text: vec![PARAGRAPH; 12].join("\n\n"),
        })
        .collect();
    let splitter =
        DocumentSplitter::new(&ChunkingConfig::default()).expect("default config is valid");

    c.bench_function("split_documents", |b| {
        b.iter(|| splitter.split_documents(black_box(&documents)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
