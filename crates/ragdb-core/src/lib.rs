//! ragdb-core
//!
//! Shared pieces of the retrieval index: domain types, the error taxonomy,
//! collaborator traits, the layered configuration and the recursive chunker.

pub mod chunker;
pub mod config;
pub mod error;
pub mod extract;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
