#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use ragdb_core::config::Settings;
use ragdb_core::traits::Embedder;

/// Returns a fixed vector per exact text and fails on anything else.
pub struct MapEmbedder {
    pub dim: usize,
    pub id: String,
    pub map: HashMap<String, Vec<f32>>,
    pub calls: AtomicUsize,
}

impl MapEmbedder {
    pub fn new(dim: usize, entries: &[(&str, Vec<f32>)]) -> Self {
        Self {
            dim,
            id: "map-embedder".to_string(),
            map: entries.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }
}

impl Embedder for MapEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn model_id(&self) -> &str { &self.id }

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.map.get(text).cloned().ok_or_else(|| anyhow!("no vector for {text:?}"))
    }
}

pub fn settings_in(dir: &std::path::Path) -> Settings {
    let mut s = Settings::default();
    s.storage.dir = dir.to_string_lossy().into_owned();
    s
}
