use std::path::Path;

use crate::types::ChatMessage;

/// Maps text to a fixed-width vector. Must be deterministic for a given `model_id`.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    /// Stable identifier stamped into persisted state (e.g. `sentence-transformers/all-MiniLM-L6-v2`).
    fn model_id(&self) -> &str;
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Produces raw text from a document on disk. An empty string is a valid result.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, path: &Path) -> anyhow::Result<String>;
}

/// Language-model completion over an ordered message list.
pub trait Completer: Send + Sync {
    fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String>;
}
