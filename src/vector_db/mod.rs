// LanceDB is the embedded vector database holding one table per indexed repository
pub mod lance_client;
pub use lance_client::LanceVectorDB;

use crate::types::{ChunkMetadata, SearchResult};
use anyhow::Result;

/// Trait for vector database operations
#[async_trait::async_trait]
pub trait VectorDatabase: Send + Sync {
    /// Drop whatever is stored and write the given rows as the new contents
    async fn replace_all(
        &self,
        embeddings: Vec<Vec<f32>>,
        metadata: Vec<ChunkMetadata>,
        contents: Vec<String>,
    ) -> Result<usize>;

    /// Nearest chunks to a query vector, best first, filtered by minimum score
    async fn search(
        &self,
        query_vector: Vec<f32>,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>>;

    /// Number of stored chunks
    async fn count(&self) -> Result<usize>;
}
