//! Embedders for ragdb.
//!
//! `MiniLmEmbedder` runs sentence-transformers/all-MiniLM-L6-v2 (BERT, D = 384)
//! locally through candle. `FakeEmbedder` is a deterministic hashing stand-in
//! selected with `APP_USE_FAKE_EMBEDDINGS=1` or `embedding.use_fake = true`.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::{Tokenizer, TruncationParams};

use ragdb_core::config::EmbeddingSettings;
use ragdb_core::traits::Embedder;
use ragdb_core::types::EMBEDDING_DIM;

pub mod device;
pub mod pool;
pub mod tokenize;

pub use pool::masked_mean_l2;

pub const MINILM_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";
const MAX_LEN: usize = 256;

pub struct MiniLmEmbedder { model: BertModel, tokenizer: Tokenizer, device: Device, dim: usize }

impl MiniLmEmbedder {
    pub fn new(model_dir: &Path) -> Result<Self> {
        let device = device::select_device();
        tracing::info!(dir = %model_dir.display(), "Loading MiniLM model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        tokenizer
            .with_truncation(Some(TruncationParams { max_length: MAX_LEN, ..Default::default() }))
            .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;
        tokenizer.with_padding(None);

        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        let dim = serde_json::from_str::<serde_json::Value>(&raw_config)?
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))? as usize;
        let config: BertConfig = serde_json::from_str(&raw_config)?;

        let weights_path = model_dir.join("model.safetensors");
        let weights = candle_core::safetensors::load(&weights_path, &device)
            .with_context(|| format!("loading {}", weights_path.display()))?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;
        tracing::info!(dim, "MiniLM model loaded");
        Ok(Self { model, tokenizer, device, dim })
    }
}

impl Embedder for MiniLmEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn model_id(&self) -> &str { MINILM_MODEL_ID }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize::tokenize_on_device(&self.tokenizer, text, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let emb: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        let elapsed = start.elapsed();
        if elapsed.as_millis() > 100 { tracing::debug!(?elapsed, "slow embedding"); }
        Ok(emb)
    }
}

/// Bag-of-words hashing embedder. Deterministic, L2-normalised, no model files.
pub struct FakeEmbedder { dim: usize, id: String }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim, id: format!("fake:xxhash64:d{}", dim) } }
}

impl Default for FakeEmbedder {
    fn default() -> Self { Self::new(EMBEDDING_DIM) }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn model_id(&self) -> &str { &self.id }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        Ok(v)
    }
}

fn fake_requested(settings: &EmbeddingSettings) -> bool {
    settings.use_fake
        || std::env::var("APP_USE_FAKE_EMBEDDINGS")
            .ok()
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if fake_requested(settings) {
        tracing::info!("Using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder::default()));
    }
    let dir = resolve_model_dir(settings)?;
    Ok(Arc::new(MiniLmEmbedder::new(&dir)?))
}

fn resolve_model_dir(settings: &EmbeddingSettings) -> Result<PathBuf> {
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = PathBuf::from(&dir);
            if p.exists() { tracing::info!("Using {}: {}", var, p.display()); return Ok(p); }
        }
    }
    if let Some(dir) = &settings.model_dir {
        let p = ragdb_core::config::expand_path(dir);
        if p.exists() { tracing::info!("Using embedding.model_dir: {}", p.display()); return Ok(p); }
    }
    let default = Path::new("models/all-MiniLM-L6-v2");
    if default.exists() { tracing::info!("Using model dir: {}", default.display()); return Ok(default.to_path_buf()); }
    Err(anyhow!("Could not locate the all-MiniLM-L6-v2 model directory (set APP_MODEL_DIR)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_embedder_is_selected_from_settings() {
        let settings = EmbeddingSettings { model_dir: None, use_fake: true };
        let embedder = get_default_embedder(&settings).unwrap();
        assert_eq!(embedder.dim(), EMBEDDING_DIM);
        assert!(embedder.model_id().starts_with("fake:"));
    }
}
