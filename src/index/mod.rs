//! Index building and loading
//!
//! The pipeline only decides whether to call [`IndexBuilder::build`] or
//! [`IndexBuilder::load`]; everything about how chunks are produced, embedded and
//! stored lives behind these traits.

mod local;

pub use local::{LocalIndexBuilder, RepoIndex};

use crate::error::IndexError;
use crate::types::{IndexStats, RepoRef, SearchResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Everything needed to build an index for one repository
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub repo: RepoRef,
    /// Where to clone from, normally [`RepoRef::clone_url`]
    pub clone_url: String,
    /// Branch to index; `None` uses the remote's default
    pub branch: Option<String>,
    /// Directory of the persisted index
    pub index_dir: PathBuf,
    /// Scratch directory for the working tree
    pub checkout_dir: PathBuf,
}

/// Result of a successful build
#[derive(Debug)]
pub struct BuiltIndex<H> {
    pub handle: H,
    pub stats: IndexStats,
    /// SHA of the commit that was actually checked out and indexed
    pub head_sha: String,
    /// Branch that was checked out, if HEAD was not detached
    pub branch: Option<String>,
}

/// Builds fresh indexes and reopens persisted ones
#[async_trait]
pub trait IndexBuilder: Send + Sync {
    type Handle: Send + Sync;

    /// Clone and index the repository, replacing any previous index at `index_dir`
    async fn build(&self, request: &BuildRequest) -> Result<BuiltIndex<Self::Handle>, IndexError>;

    /// Reopen an index previously written by [`IndexBuilder::build`]
    async fn load(&self, location: &Path) -> Result<Self::Handle, IndexError>;

    /// Embedding model identifier recorded in the metadata
    fn embedding_model(&self) -> &str;
}

/// Similarity retrieval over an index handle
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(
        &self,
        question: &str,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>, IndexError>;
}
