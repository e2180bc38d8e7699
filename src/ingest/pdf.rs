use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use tokio::process::Command;

/// Extracts page text in reading order. Prefers poppler's `pdftotext -layout`,
/// which keeps the column gaps benefit tables rely on, and falls back to
/// `pdf-extract` when poppler is unavailable or yields nothing.
pub async fn extract_pdf_text(pdf_path: &Path) -> Result<String> {
    let pages = extract_layout_pages(pdf_path).await?;
    if pages.iter().any(|page| !page.trim().is_empty()) {
        return Ok(pages.join("\n"));
    }

    let pdf_path = pdf_path.to_path_buf();
    let extracted = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&pdf_path))
        .await
        .context("PDF extraction task panicked")?
        .context("failed to extract text from PDF")?;

    Ok(extracted)
}

async fn extract_layout_pages(pdf_path: &Path) -> Result<Vec<String>> {
    if !has_command("pdftotext").await {
        return Ok(Vec::new());
    }

    let page_count = match get_pdf_page_count(pdf_path).await {
        Ok(count) => count,
        Err(err) => {
            tracing::warn!("pdfinfo could not count pages of {}: {}", pdf_path.display(), err);
            0
        }
    };

    let mut pages = Vec::with_capacity(page_count);
    for page in 1..=page_count {
        let output = Command::new("pdftotext")
            .arg("-f")
            .arg(page.to_string())
            .arg("-l")
            .arg(page.to_string())
            .arg("-layout")
            .arg("-nopgbrk")
            .arg(pdf_path)
            .arg("-")
            .output()
            .await
            .with_context(|| format!("failed to run pdftotext for page {}", page))?;

        // A page without extractable text contributes nothing.
        if !output.status.success() {
            tracing::debug!(page, "pdftotext returned non-zero status; skipping page");
            continue;
        }

        let text = String::from_utf8_lossy(&output.stdout).to_string();
        if !text.trim().is_empty() {
            pages.push(text);
        }
    }

    Ok(pages)
}

async fn get_pdf_page_count(pdf_path: &Path) -> Result<usize> {
    let output = Command::new("pdfinfo")
        .arg(pdf_path)
        .output()
        .await
        .context("failed to run pdfinfo")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("pdfinfo exited with non-zero status"));
    }

    parse_page_count(&String::from_utf8_lossy(&output.stdout))
}

fn parse_page_count(pdfinfo_output: &str) -> Result<usize> {
    let regex = Regex::new(r"(?m)^Pages:\s+(\d+)\s*$")?;
    regex
        .captures(pdfinfo_output)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<usize>().ok())
        .ok_or_else(|| anyhow::anyhow!("unable to parse page count from pdfinfo"))
}

async fn has_command(binary: &str) -> bool {
    // Some poppler binaries return non-zero for --version, so check PATH presence.
    Command::new("which")
        .arg(binary)
        .output()
        .await
        .map(|out| out.status.success() && !out.stdout.is_empty())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_is_read_from_pdfinfo() {
        let output = "Title:          Policy Wording\nPages:          12\nEncrypted:      no\n";
        assert_eq!(parse_page_count(output).unwrap(), 12);
    }

    #[test]
    fn missing_page_line_is_an_error() {
        assert!(parse_page_count("Title: x\n").is_err());
    }

    #[tokio::test]
    async fn unreadable_pdf_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        tokio::fs::write(&path, b"not a pdf").await.unwrap();
        assert!(extract_pdf_text(&path).await.is_err());
    }
}
