pub mod docx;
pub mod pdf;

use std::path::Path;

use anyhow::{Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => DocumentKind::Pdf,
            "docx" => DocumentKind::Docx,
            _ => DocumentKind::PlainText,
        }
    }
}

/// Best-effort plain text of a policy document. Failures here are the only
/// errors the matching flow cannot recover from.
pub async fn extract_text(path: &Path) -> Result<String> {
    let kind = DocumentKind::from_path(path);
    tracing::debug!(path = %path.display(), ?kind, "extracting document text");

    let text = match kind {
        DocumentKind::Pdf => pdf::extract_pdf_text(path).await?,
        DocumentKind::Docx => {
            let docx_path = path.to_path_buf();
            tokio::task::spawn_blocking(move || docx::extract_docx_text(&docx_path))
                .await
                .context("DOCX extraction task panicked")??
        }
        DocumentKind::PlainText => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read text document: {}", path.display()))?,
    };

    if text.trim().is_empty() {
        tracing::warn!(path = %path.display(), "no extractable text in document");
    }

    Ok(text)
}
