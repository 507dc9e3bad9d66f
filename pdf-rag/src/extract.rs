//! PDF text extraction.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pdf_oxide::PdfDocument;
use tracing::{debug, info};

use crate::error::{RagError, Result};

/// Turns a document on disk into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the text of the document at `path`.
    ///
    /// Returns an empty string when the document has no extractable text.
    async fn extract(&self, path: &Path) -> Result<String>;
}

/// Extracts the text layer of a PDF, page by page.
///
/// Non-empty page texts are joined with a newline. Pages without a text layer
/// (scanned images) are skipped; there is no OCR fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    /// Create a new `PdfExtractor`.
    pub fn new() -> Self {
        Self
    }

    fn extract_pages(path: &Path) -> Result<Vec<String>> {
        let path_display = path.display().to_string();
        let mut doc = PdfDocument::open(path)
            .map_err(|e| RagError::extraction(&path_display, format!("failed to parse PDF: {e}")))?;

        let page_count = doc.page_count().map_err(|e| {
            RagError::extraction(&path_display, format!("failed to read page count: {e}"))
        })?;

        let mut pages = Vec::with_capacity(page_count);
        for page_index in 0..page_count {
            let text = match doc.extract_text(page_index) {
                Ok(text) => text,
                Err(e) => {
                    debug!(
                        path = %path_display,
                        page = page_index + 1,
                        error = %e,
                        "page has no extractable text"
                    );
                    String::new()
                }
            };
            if !text.trim().is_empty() {
                pages.push(text);
            }
        }

        info!(
            path = %path_display,
            page_count,
            text_pages = pages.len(),
            "PDF text extraction complete"
        );
        Ok(pages)
    }
}

#[async_trait]
impl TextExtractor for PdfExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        let owned: PathBuf = path.to_path_buf();
        let pages = tokio::task::spawn_blocking(move || Self::extract_pages(&owned))
            .await
            .map_err(|e| {
                RagError::extraction(path.display().to_string(), format!("task join error: {e}"))
            })??;

        Ok(pages.join("\n"))
    }
}
