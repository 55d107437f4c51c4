//! File walking, language detection and chunking
//!
//! Turns a checked-out working tree into line-window chunks ready for embedding.

mod chunker;
mod file_info;
mod file_walker;
mod language;

pub use chunker::CodeChunker;
pub use file_info::FileInfo;
pub use file_walker::FileWalker;
pub use language::{detect_language, fence_tag};

use crate::types::ChunkMetadata;

/// Represents a code chunk ready for embedding
#[derive(Debug, Clone)]
pub struct CodeChunk {
    /// The source text of this chunk
    pub content: String,
    /// Where the chunk came from
    pub metadata: ChunkMetadata,
}
