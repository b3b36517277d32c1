use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use ragdb_core::chunker::RecursiveChunker;
use ragdb_core::config::{CorruptionPolicy, Settings};
use ragdb_core::error::{Error, Result};
use ragdb_core::traits::{Embedder, TextExtractor};
use ragdb_core::types::SearchHit;
use ragdb_vector::{ArtifactStore, ChunkIndex};

/// Returned by `search` while nothing has been ingested.
pub const EMPTY_INDEX_MESSAGE: &str =
    "The document has not been uploaded or processed yet. Please upload a PDF first.";

const CONTEXT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub chunks_added: usize,
    pub total_chunks: usize,
}

/// Owns the chunk index for the lifetime of the process.
///
/// Batches are serialized by `ingest`; `index` is held for writing only while
/// a fully embedded batch is appended and saved, so searches keep running
/// while a batch is being embedded.
pub struct RetrievalService {
    embedder: Arc<dyn Embedder>,
    chunker: RecursiveChunker,
    top_k: usize,
    store: Option<ArtifactStore>,
    index: RwLock<ChunkIndex>,
    ingest: Mutex<()>,
}

impl RetrievalService {
    /// Load-or-empty from the artifact pair named in `settings.storage`.
    pub fn open(embedder: Arc<dyn Embedder>, settings: &Settings) -> Result<Self> {
        let store = ArtifactStore::from_settings(&settings.storage);
        Self::open_with_store(embedder, store, settings)
    }

    pub fn open_with_store(embedder: Arc<dyn Embedder>, store: ArtifactStore, settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let dim = embedder.dim();
        let index = match store.load(dim, embedder.model_id()) {
            Ok(Some(index)) => index,
            Ok(None) => {
                tracing::info!(path = %store.index_path().display(), "no persisted index, starting empty");
                ChunkIndex::new(dim)
            }
            Err(e) if is_state_error(&e) && settings.storage.on_corruption == CorruptionPolicy::Reset => {
                tracing::warn!(
                    error = %e,
                    path = %store.index_path().display(),
                    "persisted index unusable; storage.on_corruption = reset, starting empty (next save overwrites it)"
                );
                ChunkIndex::new(dim)
            }
            Err(e) => return Err(e),
        };
        Self::build(embedder, Some(store), index, settings)
    }

    /// No persistence; state lives as long as the service.
    pub fn in_memory(embedder: Arc<dyn Embedder>, settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let index = ChunkIndex::new(embedder.dim());
        Self::build(embedder, None, index, settings)
    }

    fn build(embedder: Arc<dyn Embedder>, store: Option<ArtifactStore>, index: ChunkIndex, settings: &Settings) -> Result<Self> {
        let chunker = RecursiveChunker::new(settings.chunking.clone())?;
        Ok(Self {
            embedder,
            chunker,
            top_k: settings.retrieval.top_k,
            store,
            index: RwLock::new(index),
            ingest: Mutex::new(()),
        })
    }

    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    pub fn dim(&self) -> usize {
        self.embedder.dim()
    }

    pub fn model_id(&self) -> &str {
        self.embedder.model_id()
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Run `f` against a consistent view of the index.
    pub fn with_index<R>(&self, f: impl FnOnce(&ChunkIndex) -> R) -> R {
        f(&self.index.read())
    }

    /// Chunk, embed and append `raw_text`, then persist the full state.
    ///
    /// The batch is all-or-nothing: any embedding or dimension failure leaves
    /// memory and disk untouched, and a save that fails before committing
    /// rolls memory back.
    pub fn add_text(&self, raw_text: &str) -> Result<IngestReport> {
        let _batch = self.ingest.lock();

        let pieces = self.chunker.split(raw_text);
        if pieces.is_empty() {
            tracing::debug!("input produced no chunks; nothing to ingest");
            return Ok(IngestReport { chunks_added: 0, total_chunks: self.len() });
        }

        let vectors = self
            .embedder
            .embed_batch(&pieces)
            .map_err(|e| Error::Embedding(format!("{e:#}")))?;
        if vectors.len() != pieces.len() {
            return Err(Error::Embedding(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                pieces.len()
            )));
        }
        let batch: Vec<(String, Vec<f32>)> = pieces.into_iter().zip(vectors).collect();

        let mut index = self.index.write();
        let before = index.len();
        let chunks_added = index.extend(batch)?;
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&index, self.embedder.model_id()) {
                index.truncate(before);
                tracing::error!(error = %e, "saving index failed; batch rolled back");
                return Err(e);
            }
        }
        let total_chunks = index.len();
        tracing::info!(chunks_added, total_chunks, "ingested batch");
        Ok(IngestReport { chunks_added, total_chunks })
    }

    /// Extract text from `path` and ingest it as one batch.
    pub fn add_file(&self, path: &Path, extractor: &dyn TextExtractor) -> Result<IngestReport> {
        let text = extractor
            .extract_text(path)
            .map_err(|e| Error::Extraction(format!("{}: {e:#}", path.display())))?;
        tracing::debug!(path = %path.display(), chars = text.chars().count(), "extracted text");
        self.add_text(&text)
    }

    /// Up to `top_k` nearest chunks, closest first. Empty when nothing is indexed.
    pub fn search_hits(&self, query_text: &str) -> Result<Vec<SearchHit>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let query = self
            .embedder
            .embed(query_text)
            .map_err(|e| Error::Embedding(format!("{e:#}")))?;
        self.index.read().search(&query, self.top_k)
    }

    /// Retrieved chunk texts joined by a blank line, or `EMPTY_INDEX_MESSAGE`.
    pub fn search(&self, query_text: &str) -> Result<String> {
        if self.is_empty() {
            return Ok(EMPTY_INDEX_MESSAGE.to_string());
        }
        let hits = self.search_hits(query_text)?;
        if hits.is_empty() {
            return Ok(EMPTY_INDEX_MESSAGE.to_string());
        }
        Ok(hits.iter().map(|h| h.text.as_str()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR))
    }

    /// Persist the current state again (e.g. at shutdown). No-op without a store.
    pub fn flush(&self) -> Result<()> {
        let Some(store) = &self.store else { return Ok(()) };
        let _batch = self.ingest.lock();
        let index = self.index.read();
        store.save(&index, self.embedder.model_id())
    }
}

fn is_state_error(e: &Error) -> bool {
    matches!(e, Error::Corruption(_) | Error::ModelMismatch { .. } | Error::DimensionMismatch { .. })
}
