use super::{BuildRequest, BuiltIndex, IndexBuilder, Retriever};
use crate::config::IndexingConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::IndexError;
use crate::git::{CheckoutRequest, clone_repository};
use crate::indexer::{CodeChunk, CodeChunker, FileWalker};
use crate::types::{IndexStats, SearchResult};
use crate::vector_db::{LanceVectorDB, VectorDatabase};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Handle to a persisted index: the vector table plus the model that embeds queries
pub struct RepoIndex {
    db: Box<dyn VectorDatabase>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl std::fmt::Debug for RepoIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoIndex")
            .field("embedding_model", &self.embedder.model_name())
            .finish_non_exhaustive()
    }
}

impl RepoIndex {
    pub fn new(db: Box<dyn VectorDatabase>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { db, embedder }
    }

    /// Number of chunks in the index
    pub async fn chunk_count(&self) -> Result<usize, IndexError> {
        self.db
            .count()
            .await
            .map_err(|e| IndexError::Store(format!("{:#}", e)))
    }
}

#[async_trait]
impl Retriever for RepoIndex {
    async fn retrieve(
        &self,
        question: &str,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>, IndexError> {
        let query_vector = embed_all(self.embedder.clone(), vec![question.to_string()], 1)
            .await?
            .pop()
            .ok_or_else(|| IndexError::Embedding("No embedding returned for query".into()))?;

        let results = self
            .db
            .search(query_vector, limit, min_score)
            .await
            .map_err(|e| IndexError::Store(format!("{:#}", e)))?;

        tracing::debug!("Retrieved {} chunks", results.len());
        Ok(results)
    }
}

/// Builds LanceDB indexes from a fresh clone of the repository
pub struct LocalIndexBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
    indexing: IndexingConfig,
    batch_size: usize,
    clone_depth: Option<i32>,
}

impl LocalIndexBuilder {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        indexing: IndexingConfig,
        batch_size: usize,
    ) -> Self {
        Self {
            embedder,
            indexing,
            batch_size: batch_size.max(1),
            clone_depth: Some(1),
        }
    }

    /// History depth for the clone; `None` fetches everything
    pub fn with_clone_depth(mut self, depth: Option<i32>) -> Self {
        self.clone_depth = depth;
        self
    }

    async fn build_inner(
        &self,
        request: &BuildRequest,
    ) -> Result<BuiltIndex<RepoIndex>, IndexError> {
        let start = Instant::now();

        let checkout = CheckoutRequest {
            url: request.clone_url.clone(),
            branch: request.branch.clone(),
            dest: request.checkout_dir.clone(),
            depth: self.clone_depth,
        };
        let cloned = tokio::task::spawn_blocking(move || clone_repository(&checkout))
            .await
            .map_err(|e| IndexError::CloneFailed {
                url: request.clone_url.clone(),
                reason: e.to_string(),
            })?
            .map_err(|e| IndexError::CloneFailed {
                url: request.clone_url.clone(),
                reason: format!("{:#}", e),
            })?;

        let walker = FileWalker::new(&cloned.path, self.indexing.max_file_size).with_patterns(
            self.indexing.include_patterns.clone(),
            self.indexing.exclude_patterns.clone(),
        );
        let files = tokio::task::spawn_blocking(move || walker.walk())
            .await
            .map_err(|e| IndexError::Walk(e.to_string()))?
            .map_err(|e| IndexError::Walk(format!("{:#}", e)))?;

        let chunker = CodeChunker::from_config(&self.indexing);
        let chunks: Vec<CodeChunk> = files.iter().flat_map(|f| chunker.chunk_file(f)).collect();

        if chunks.is_empty() {
            return Err(IndexError::NoFilesFound(request.repo.to_string()));
        }

        let files_indexed = files.len();
        tracing::info!(
            "Embedding {} chunks from {} files of {}",
            chunks.len(),
            files_indexed,
            request.repo
        );

        let (metadata, contents): (Vec<_>, Vec<_>) = chunks
            .into_iter()
            .map(|chunk| (chunk.metadata, chunk.content))
            .unzip();

        let embeddings = embed_all(self.embedder.clone(), contents.clone(), self.batch_size).await?;

        let db = open_db(&request.index_dir).await?;
        let chunks_indexed = db
            .replace_all(embeddings, metadata, contents)
            .await
            .map_err(|e| IndexError::Store(format!("{:#}", e)))?;

        tracing::info!(
            "Indexed {} at {} in {:.1}s",
            request.repo,
            &cloned.head_sha,
            start.elapsed().as_secs_f64()
        );

        Ok(BuiltIndex {
            handle: RepoIndex::new(Box::new(db), self.embedder.clone()),
            stats: IndexStats {
                files_indexed,
                chunks_indexed,
            },
            head_sha: cloned.head_sha,
            branch: cloned.branch,
        })
    }
}

#[async_trait]
impl IndexBuilder for LocalIndexBuilder {
    type Handle = RepoIndex;

    async fn build(&self, request: &BuildRequest) -> Result<BuiltIndex<RepoIndex>, IndexError> {
        let result = self.build_inner(request).await;

        if !self.indexing.keep_checkout && request.checkout_dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&request.checkout_dir) {
                tracing::warn!(
                    "Failed to remove checkout {:?}: {}",
                    request.checkout_dir,
                    e
                );
            }
        }

        result
    }

    async fn load(&self, location: &Path) -> Result<RepoIndex, IndexError> {
        let not_found = || IndexError::NotFound(location.display().to_string());
        if !location.is_dir() {
            return Err(not_found());
        }

        let db = open_db(location).await?;
        let exists = db
            .table_exists()
            .await
            .map_err(|e| IndexError::Store(format!("{:#}", e)))?;
        if !exists {
            return Err(not_found());
        }

        tracing::debug!("Loaded index from {:?}", location);
        Ok(RepoIndex::new(Box::new(db), self.embedder.clone()))
    }

    fn embedding_model(&self) -> &str {
        self.embedder.model_name()
    }
}

async fn open_db(location: &Path) -> Result<LanceVectorDB, IndexError> {
    LanceVectorDB::with_path(location)
        .await
        .map_err(|e| IndexError::Store(format!("{:#}", e)))
}

/// Embed texts in batches on the blocking pool
async fn embed_all(
    embedder: Arc<dyn EmbeddingProvider>,
    texts: Vec<String>,
    batch_size: usize,
) -> Result<Vec<Vec<f32>>, IndexError> {
    tokio::task::spawn_blocking(move || {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(batch_size.max(1)) {
            embeddings.extend(embedder.embed_batch(batch.to_vec())?);
        }
        if embeddings.len() != texts.len() {
            anyhow::bail!(
                "Embedding model returned {} vectors for {} texts",
                embeddings.len(),
                texts.len()
            );
        }
        let dimension = embedder.dimension();
        if let Some(bad) = embeddings.iter().find(|v| v.len() != dimension) {
            anyhow::bail!(
                "Embedding model {} returned a {}-dimensional vector, expected {}",
                embedder.model_name(),
                bad.len(),
                dimension
            );
        }
        Ok(embeddings)
    })
    .await
    .map_err(|e| IndexError::Embedding(e.to_string()))?
    .map_err(|e: anyhow::Error| IndexError::Embedding(format!("{:#}", e)))
}
