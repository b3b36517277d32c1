//! On-disk artifact pair: a binary index artifact and a JSON chunk artifact.
//!
//! Index artifact layout (little-endian):
//!
//! ```text
//! magic "RAGDBIDX" | version u32 | dim u32 | count u64
//! model_id_len u32 | model_id utf-8 | blake3(chunk artifact) [32]
//! count * dim f32
//! ```
//!
//! The chunk artifact is a JSON array of strings. A save writes the chunk
//! artifact to `<chunks>.pending`, then renames the index artifact into place
//! (the commit point), then renames the pending chunk artifact over the old
//! one. The digest in the index header names the chunk artifact it belongs
//! to, so a load after a crash either rolls the pending file forward or
//! reports the pair as corrupt.

use std::ffi::OsString;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use ragdb_core::config::StorageSettings;
use ragdb_core::error::{Error, Result};
use tempfile::NamedTempFile;

use crate::chunk_index::ChunkIndex;
use crate::flat::FlatL2Index;

const MAGIC: &[u8; 8] = b"RAGDBIDX";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    index_path: PathBuf,
    chunks_path: PathBuf,
}

/// Decoded index artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexArtifact {
    pub model_id: String,
    pub chunks_digest: [u8; 32],
    pub vectors: FlatL2Index,
}

impl ArtifactStore {
    pub fn new(index_path: impl Into<PathBuf>, chunks_path: impl Into<PathBuf>) -> Self {
        Self { index_path: index_path.into(), chunks_path: chunks_path.into() }
    }

    pub fn from_settings(storage: &StorageSettings) -> Self {
        Self::new(storage.index_path(), storage.chunks_path())
    }

    /// Both artifacts as `<dir>/index.bin` and `<dir>/chunks.json`.
    pub fn in_dir(dir: &Path) -> Self {
        let defaults = StorageSettings::default();
        Self::new(dir.join(defaults.index_file), dir.join(defaults.chunks_file))
    }

    pub fn index_path(&self) -> &Path { &self.index_path }

    pub fn chunks_path(&self) -> &Path { &self.chunks_path }

    fn pending_path(&self) -> PathBuf {
        let mut s: OsString = self.chunks_path.clone().into_os_string();
        s.push(".pending");
        PathBuf::from(s)
    }

    /// Write the full current state, replacing whatever was there.
    ///
    /// An error means the previous pair is still the committed one. Once the
    /// index artifact is in place the new state is committed; a failure to
    /// move the chunk artifact after that point is logged and left for the
    /// next `load` to finish.
    pub fn save(&self, index: &ChunkIndex, model_id: &str) -> Result<()> {
        let chunk_bytes = serde_json::to_vec(index.chunks())?;
        let digest = *blake3::hash(&chunk_bytes).as_bytes();
        let index_bytes = encode_index(index.vectors(), model_id, &digest)?;

        let pending = self.pending_path();
        write_atomic(&pending, &chunk_bytes)?;
        write_atomic(&self.index_path, &index_bytes)?;
        if let Err(e) = fs::rename(&pending, &self.chunks_path) {
            tracing::warn!(
                error = %e,
                pending = %pending.display(),
                "index committed but chunk artifact not moved into place; next load completes it"
            );
            return Ok(());
        }
        tracing::debug!(
            vectors = index.len(),
            index = %self.index_path.display(),
            chunks = %self.chunks_path.display(),
            "saved artifact pair"
        );
        Ok(())
    }

    /// `Ok(None)` when nothing has been saved yet.
    pub fn load(&self, expected_dim: usize, model_id: &str) -> Result<Option<ChunkIndex>> {
        let pending = self.pending_path();
        if !self.index_path.exists() {
            if pending.exists() {
                tracing::warn!(path = %pending.display(), "discarding uncommitted chunk artifact");
                fs::remove_file(&pending)?;
            }
            if self.chunks_path.exists() {
                return Err(Error::Corruption(format!(
                    "chunk artifact {} has no index artifact {}",
                    self.chunks_path.display(),
                    self.index_path.display()
                )));
            }
            return Ok(None);
        }

        let artifact = decode_index(&fs::read(&self.index_path)?)?;
        if artifact.model_id != model_id {
            return Err(Error::ModelMismatch { stored: artifact.model_id, current: model_id.to_string() });
        }
        if artifact.vectors.dim() != expected_dim {
            return Err(Error::DimensionMismatch { expected: expected_dim, actual: artifact.vectors.dim() });
        }

        let chunk_bytes = self.committed_chunk_bytes(&artifact.chunks_digest)?;
        let chunks: Vec<String> = serde_json::from_slice(&chunk_bytes)
            .map_err(|e| Error::Corruption(format!("chunk artifact {}: {}", self.chunks_path.display(), e)))?;
        let index = ChunkIndex::from_parts(artifact.vectors, chunks)?;
        tracing::info!(vectors = index.len(), path = %self.index_path.display(), "loaded artifact pair");
        Ok(Some(index))
    }

    /// The chunk artifact whose digest matches the committed index header,
    /// finishing an interrupted save if needed.
    fn committed_chunk_bytes(&self, digest: &[u8; 32]) -> Result<Vec<u8>> {
        let pending = self.pending_path();
        if pending.exists() {
            let bytes = fs::read(&pending)?;
            if blake3::hash(&bytes).as_bytes() == digest {
                tracing::info!(path = %pending.display(), "completing interrupted save");
                fs::rename(&pending, &self.chunks_path)?;
                return Ok(bytes);
            }
            tracing::warn!(path = %pending.display(), "discarding uncommitted chunk artifact");
            fs::remove_file(&pending)?;
        }
        let bytes = match fs::read(&self.chunks_path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::Corruption(format!(
                    "index artifact {} has no chunk artifact {}",
                    self.index_path.display(),
                    self.chunks_path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        if blake3::hash(&bytes).as_bytes() != digest {
            return Err(Error::Corruption(format!(
                "chunk artifact {} does not belong to index artifact {}",
                self.chunks_path.display(),
                self.index_path.display()
            )));
        }
        Ok(bytes)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

pub fn encode_index(vectors: &FlatL2Index, model_id: &str, chunks_digest: &[u8; 32]) -> Result<Vec<u8>> {
    let dim = u32::try_from(vectors.dim())
        .map_err(|_| Error::InvalidConfig(format!("dimension {} does not fit the index format", vectors.dim())))?;
    let model_len = u32::try_from(model_id.len())
        .map_err(|_| Error::InvalidConfig("model id too long".into()))?;
    let payload = vectors.as_slice();
    let mut out = Vec::with_capacity(64 + model_id.len() + std::mem::size_of_val(payload));
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&dim.to_le_bytes());
    out.extend_from_slice(&(vectors.len() as u64).to_le_bytes());
    out.extend_from_slice(&model_len.to_le_bytes());
    out.extend_from_slice(model_id.as_bytes());
    out.extend_from_slice(chunks_digest);
    for &value in payload {
        out.extend_from_slice(&value.to_le_bytes());
    }
    Ok(out)
}

pub fn decode_index(bytes: &[u8]) -> Result<IndexArtifact> {
    let mut r = Reader { buf: bytes, pos: 0 };
    if r.take(MAGIC.len())? != MAGIC {
        return Err(Error::Corruption("index artifact has a bad magic header".into()));
    }
    let version = r.u32()?;
    if version != FORMAT_VERSION {
        return Err(Error::Corruption(format!("unsupported index format version {}", version)));
    }
    let dim = r.u32()? as usize;
    let count = usize::try_from(r.u64()?)
        .map_err(|_| Error::Corruption("vector count overflows usize".into()))?;
    let model_len = r.u32()? as usize;
    let model_id = String::from_utf8(r.take(model_len)?.to_vec())
        .map_err(|_| Error::Corruption("model id is not utf-8".into()))?;
    let mut chunks_digest = [0u8; 32];
    chunks_digest.copy_from_slice(r.take(32)?);

    let expected = count
        .checked_mul(dim)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| Error::Corruption("vector payload size overflows".into()))?;
    let payload = r.rest();
    if payload.len() != expected {
        return Err(Error::Corruption(format!(
            "vector payload is {} bytes, header promises {} ({} x {} f32)",
            payload.len(),
            expected,
            count,
            dim
        )));
    }
    let data: Vec<f32> = payload
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    let vectors = if dim == 0 { FlatL2Index::new(0) } else { FlatL2Index::from_raw(dim, data)? };
    Ok(IndexArtifact { model_id, chunks_digest, vectors })
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.buf.len()).ok_or_else(|| {
            Error::Corruption(format!("index artifact truncated at byte {}", self.pos))
        })?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_le_bytes(arr))
    }

    fn rest(&mut self) -> &'a [u8] {
        let out = &self.buf[self.pos..];
        self.pos = self.buf.len();
        out
    }
}
