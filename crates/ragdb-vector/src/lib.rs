//! ragdb-vector
//!
//! Exact flat L2 index, the index-aligned chunk store built on it, and the
//! crash-safe artifact pair it is persisted as.

pub mod chunk_index;
pub mod flat;
pub mod persist;

pub use chunk_index::ChunkIndex;
pub use flat::{squared_l2, FlatL2Index, Neighbor};
pub use persist::ArtifactStore;
