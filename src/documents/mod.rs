// Document loading
// Reads every PDF in a directory into one text document per page


use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::{BotError, Result};

/// Text of a single PDF page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub source: PathBuf,
    /// 1-based page number within `source`
    pub page: u32,
    pub text: String,
}

/// Load every `*.pdf` directly inside `dir`, in path order.
///
/// A missing directory or a file that cannot be parsed fails the whole load.
/// A page whose text cannot be extracted is logged and skipped.
#[inline]
pub fn load_pdf_directory(dir: &Path) -> Result<Vec<Document>> {
    let entries = fs::read_dir(dir).map_err(|e| {
        BotError::Document(format!(
            "Failed to read document directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && is_pdf(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    info!("Found {} PDF files in {}", paths.len(), dir.display());

    let mut documents = Vec::new();
    for path in &paths {
        documents.extend(load_pdf(path)?);
    }

    info!(
        "Loaded {} pages from {} files",
        documents.len(),
        paths.len()
    );
    Ok(documents)
}

/// Load one PDF file, one `Document` per page
#[inline]
pub fn load_pdf(path: &Path) -> Result<Vec<Document>> {
    let pdf = lopdf::Document::load(path)
        .map_err(|e| BotError::Document(format!("Failed to parse {}: {}", path.display(), e)))?;

    let pages = pdf.get_pages();
    debug!("{} has {} pages", path.display(), pages.len());

    let mut documents = Vec::with_capacity(pages.len());
    for page in pages.keys() {
        match pdf.extract_text(&[*page]) {
            Ok(text) => documents.push(Document {
                source: path.to_path_buf(),
                page: *page,
                text,
            }),
            Err(e) => warn!(
                "Skipping page {} of {}: could not extract text: {}",
                page,
                path.display(),
                e
            ),
        }
    }

    Ok(documents)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}
