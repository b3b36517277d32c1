//! Vector index and chunk texts kept index-aligned behind one insert path.

use ragdb_core::error::{Error, Result};
use ragdb_core::types::SearchHit;

use crate::flat::FlatL2Index;

/// Position `i` in the vector index and in the chunk list is the same chunk.
/// Only combined inserts are exposed, so the two never drift apart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkIndex {
    vectors: FlatL2Index,
    chunks: Vec<String>,
}

impl ChunkIndex {
    pub fn new(dim: usize) -> Self {
        Self { vectors: FlatL2Index::new(dim), chunks: Vec::new() }
    }

    /// Pair up separately loaded halves. Differing lengths mean corruption.
    pub fn from_parts(vectors: FlatL2Index, chunks: Vec<String>) -> Result<Self> {
        if vectors.len() != chunks.len() {
            return Err(Error::Corruption(format!(
                "index holds {} vectors but chunk store holds {} texts",
                vectors.len(),
                chunks.len()
            )));
        }
        Ok(Self { vectors, chunks })
    }

    pub fn dim(&self) -> usize { self.vectors.dim() }

    pub fn len(&self) -> usize { self.chunks.len() }

    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }

    pub fn vectors(&self) -> &FlatL2Index { &self.vectors }

    pub fn chunks(&self) -> &[String] { &self.chunks }

    pub fn text(&self, ordinal: usize) -> Option<&str> {
        self.chunks.get(ordinal).map(String::as_str)
    }

    pub fn push(&mut self, text: String, vector: &[f32]) -> Result<usize> {
        let ordinal = self.vectors.insert(vector)?;
        self.chunks.push(text);
        Ok(ordinal)
    }

    /// Insert a whole batch or nothing: every vector is checked before the
    /// first one is appended. Returns the number of chunks added.
    pub fn extend(&mut self, batch: Vec<(String, Vec<f32>)>) -> Result<usize> {
        for (_, vector) in &batch {
            self.vectors.check_dim(vector)?;
        }
        let added = batch.len();
        self.chunks.reserve(added);
        for (text, vector) in batch {
            self.push(text, &vector)?;
        }
        Ok(added)
    }

    /// Roll back to the first `len` chunks.
    pub fn truncate(&mut self, len: usize) {
        self.vectors.truncate(len);
        self.chunks.truncate(len);
    }

    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        self.vectors
            .search(query, k)?
            .into_iter()
            .map(|n| {
                let text = self.text(n.ordinal).ok_or_else(|| {
                    Error::Corruption(format!("no chunk text at ordinal {}", n.ordinal))
                })?;
                Ok(SearchHit { ordinal: n.ordinal, distance: n.distance, text: text.to_string() })
            })
            .collect()
    }
}
