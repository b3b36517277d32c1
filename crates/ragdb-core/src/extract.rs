//! Raw text extraction from documents on disk.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;
use std::process::Command;

use crate::traits::TextExtractor;

/// Reads a file as UTF-8, falling back to lossy decoding.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, path: &Path) -> Result<String> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(content),
            Err(_) => {
                let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
        }
    }
}

/// Runs the poppler `pdftotext` binary. Pages are joined with `\n`.
#[derive(Debug, Clone)]
pub struct PdfToTextExtractor {
    binary: String,
}

impl Default for PdfToTextExtractor {
    fn default() -> Self {
        Self { binary: "pdftotext".to_string() }
    }
}

impl PdfToTextExtractor {
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

impl TextExtractor for PdfToTextExtractor {
    fn extract_text(&self, path: &Path) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .output()
            .map_err(|e| anyhow!("failed to run {}: {}", self.binary, e))?;
        if !output.status.success() {
            tracing::warn!(
                path = %path.display(),
                status = %output.status,
                "pdftotext failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(String::new());
        }
        let text = String::from_utf8_lossy(&output.stdout);
        // pdftotext ends every page with a form feed
        let mut joined = String::with_capacity(text.len());
        for page in text.split('\u{c}') {
            if page.is_empty() {
                continue;
            }
            joined.push_str(page);
            joined.push('\n');
        }
        if joined.trim().is_empty() {
            tracing::warn!(path = %path.display(), "pdftotext extracted 0 characters");
        }
        Ok(joined)
    }
}

pub fn is_pdf(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()).is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Pick an extractor by file extension.
pub fn extractor_for(path: &Path) -> Box<dyn TextExtractor> {
    if is_pdf(path) { Box::new(PdfToTextExtractor::default()) } else { Box::new(PlainTextExtractor) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_falls_back_to_lossy() {
        let tmp = tempfile::TempDir::new().unwrap();
        let p = tmp.path().join("a.txt");
        fs::write(&p, [b'o', b'k', 0xff, b'!']).unwrap();
        let text = PlainTextExtractor.extract_text(&p).unwrap();
        assert!(text.starts_with("ok"));
        assert!(text.ends_with('!'));
    }

    #[test]
    fn missing_pdf_binary_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let p = tmp.path().join("a.pdf");
        fs::write(&p, b"%PDF-1.4").unwrap();
        let ex = PdfToTextExtractor::with_binary("definitely-not-a-real-binary-ragdb");
        assert!(ex.extract_text(&p).is_err());
    }

    #[test]
    fn picks_by_extension() {
        assert!(is_pdf(Path::new("doc.PDF")));
        assert!(!is_pdf(Path::new("notes.txt")));
    }
}
