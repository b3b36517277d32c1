//! Background ingestion on tokio's blocking pool.
//!
//! `RetrievalService::add_text` is synchronous and CPU bound; the worker only
//! moves it off the async executor. Must be used from within a tokio runtime.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;

use ragdb_core::error::Result;
use ragdb_core::extract::extractor_for;
use ragdb_core::traits::TextExtractor;

use crate::service::{IngestReport, RetrievalService};

#[derive(Clone)]
pub struct IngestWorker {
    service: Arc<RetrievalService>,
}

impl IngestWorker {
    pub fn new(service: Arc<RetrievalService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<RetrievalService> {
        &self.service
    }

    pub fn submit_text(&self, text: String) -> JoinHandle<Result<IngestReport>> {
        let service = Arc::clone(&self.service);
        tokio::task::spawn_blocking(move || service.add_text(&text))
    }

    /// Extract with the extractor matching the file extension, then ingest.
    pub fn submit_file(&self, path: PathBuf) -> JoinHandle<Result<IngestReport>> {
        let service = Arc::clone(&self.service);
        tokio::task::spawn_blocking(move || {
            let extractor = extractor_for(&path);
            service.add_file(&path, extractor.as_ref())
        })
    }

    pub fn submit_file_with(&self, path: PathBuf, extractor: Arc<dyn TextExtractor>) -> JoinHandle<Result<IngestReport>> {
        let service = Arc::clone(&self.service);
        tokio::task::spawn_blocking(move || service.add_file(&path, extractor.as_ref()))
    }
}
