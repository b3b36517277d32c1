//! Recursive boundary splitting with a sliding-window overlap.
//!
//! Text is cut on the coarsest separator that appears (paragraph, line,
//! sentence end, word, character) and any piece still longer than the body
//! budget is cut again on the next separator. Pieces are then merged greedily
//! into chunks. Every chunk after the first starts with the last `overlap`
//! characters of the chunk before it, and no chunk exceeds `chunk_size`
//! characters:
//!
//! ```text
//! chunk[0] = body[0]                          (<= chunk_size)
//! chunk[i] = tail(chunk[i-1], overlap) + body[i]  (body <= chunk_size - overlap)
//! ```
//!
//! Separators stay attached to the end of the piece they follow, so the
//! bodies concatenate back to the input. Lengths are counted in `char`s.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Separators tried in order, coarsest first. `""` means split per character.
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
    /// Chunks whose trimmed length is below this are dropped.
    pub min_chunk_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 200, overlap: 30, min_chunk_chars: 10 }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self { chunk_size, overlap, ..Self::default() }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be > 0".into()));
        }
        if self.overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Longest body a non-first chunk may carry after its overlap head.
    fn body_budget(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    config: ChunkingConfig,
    separators: Vec<String>,
}

impl RecursiveChunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        Self::with_separators(config, &DEFAULT_SEPARATORS)
    }

    /// Custom separator hierarchy, coarsest first. Text that survives every
    /// separator is cut at character boundaries.
    pub fn with_separators(config: ChunkingConfig, separators: &[&str]) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, separators: separators.iter().map(|s| (*s).to_string()).collect() })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split and drop low-signal fragments (trimmed length below `min_chunk_chars`).
    pub fn split(&self, text: &str) -> Vec<String> {
        let min = self.config.min_chunk_chars;
        self.split_raw(text)
            .into_iter()
            .filter(|c| char_len(c.trim()) >= min)
            .collect()
    }

    /// Split without the minimum-length filter.
    pub fn split_raw(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        let mut pieces = Vec::new();
        self.collect_pieces(text, 0, &mut pieces);
        self.merge(&pieces)
    }

    fn collect_pieces<'a>(&self, text: &'a str, level: usize, out: &mut Vec<&'a str>) {
        let budget = self.config.body_budget();
        if char_len(text) <= budget {
            out.push(text);
            return;
        }
        let Some(sep) = self.separators.get(level) else {
            out.extend(split_every(text, budget));
            return;
        };
        if sep.is_empty() {
            out.extend(split_every(text, 1));
            return;
        }
        if !text.contains(sep.as_str()) {
            self.collect_pieces(text, level + 1, out);
            return;
        }
        for piece in split_keep_end(text, sep) {
            self.collect_pieces(piece, level + 1, out);
        }
    }

    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks: Vec<String> = Vec::new();
        let mut body = String::new();
        let mut body_len = 0usize;
        for piece in pieces {
            let len = char_len(piece);
            let budget = if chunks.is_empty() { self.config.chunk_size } else { self.config.body_budget() };
            if body_len > 0 && body_len + len > budget {
                self.emit(&mut chunks, &body);
                body.clear();
                body_len = 0;
            }
            body.push_str(piece);
            body_len += len;
        }
        if body_len > 0 {
            self.emit(&mut chunks, &body);
        }
        chunks
    }

    fn emit(&self, chunks: &mut Vec<String>, body: &str) {
        let chunk = match chunks.last() {
            Some(prev) => {
                let head = tail_chars(prev, self.config.overlap);
                let mut c = String::with_capacity(head.len() + body.len());
                c.push_str(head);
                c.push_str(body);
                c
            }
            None => body.to_string(),
        };
        chunks.push(chunk);
    }
}

/// Split `text` with the given size and overlap and the default minimum-length filter.
pub fn split(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    Ok(RecursiveChunker::new(ChunkingConfig::new(chunk_size, overlap))?.split(text))
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// The last `n` characters of `s` (all of `s` if shorter).
pub fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((i, _)) => &s[i..],
        None => s,
    }
}

fn split_keep_end<'a>(text: &'a str, sep: &str) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut start = 0;
    for (idx, m) in text.match_indices(sep) {
        let end = idx + m.len();
        out.push(&text[start..end]);
        start = end;
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

fn split_every(text: &str, n: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (i, _) in text.char_indices() {
        if count == n {
            out.push(&text[start..i]);
            start = i;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}
