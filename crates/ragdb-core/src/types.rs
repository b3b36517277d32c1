//! Domain types shared by the index, the retrieval service and the chat layer.

use serde::{Deserialize, Serialize};

/// Embedding width of the bundled sentence-transformer.
pub const EMBEDDING_DIM: usize = 384;

/// One retrieved chunk.
///
/// - `ordinal`: insertion position, identical in the vector index and the chunk store
/// - `distance`: squared L2 distance to the query vector (lower is closer)
/// - `text`: the stored chunk text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub ordinal: usize,
    pub distance: f32,
    pub text: String,
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self { Self::new(Role::System, content) }

    pub fn user(content: impl Into<String>) -> Self { Self::new(Role::User, content) }

    pub fn assistant(content: impl Into<String>) -> Self { Self::new(Role::Assistant, content) }
}
