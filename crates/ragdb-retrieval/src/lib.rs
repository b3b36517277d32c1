//! ragdb-retrieval
//!
//! `RetrievalService` ties the chunker, an embedder and the persisted
//! `ChunkIndex` together: `add_text` on the ingestion path, `search` on the
//! query path. `IngestWorker` hands ingestion to a blocking task pool, and
//! `chat` assembles the message list sent to a language model.

pub mod chat;
pub mod service;
pub mod worker;

pub use service::{IngestReport, RetrievalService, EMPTY_INDEX_MESSAGE};
pub use worker::IngestWorker;
