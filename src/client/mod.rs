//! Core library client for repo-chat
//!
//! [`RepoChatClient`] runs the ask pipeline: resolve the latest commit, decide whether
//! the stored index is current, build or load it, then answer the question. The
//! collaborators are injected so the pipeline can be driven by fakes in tests.
//!
//! # Example
//!
//! ```no_run
//! use repo_chat::{AskRequest, Config, DefaultClient, RepoRef};
//!
//! #[tokio::main]
//! async fn main() -> repo_chat::Result<()> {
//!     let config = Config::load(None)?;
//!     let client = DefaultClient::from_config(&config).await?;
//!
//!     let request = AskRequest {
//!         repo: RepoRef::parse("github.com/rust-lang/log")?,
//!         question: "How do I set the max log level?".to_string(),
//!         force_reindex: false,
//!     };
//!     let outcome = client.ask(&request).await?;
//!     println!("{}", outcome.answer.text);
//!     Ok(())
//! }
//! ```

use crate::config::Config;
use crate::decision::{
    RebuildReason, ReindexDecision, ResolverPolicy, decide_with_index, decide_without_remote,
};
use crate::embedding::FastEmbedManager;
use crate::error::{IndexError, RepoChatError, Result, ValidationError};
use crate::github::{CommitResolver, GitHubResolver};
use crate::index::{BuildRequest, IndexBuilder, LocalIndexBuilder};
use crate::llm::{Answer, ChatQueryEngine, QueryEngine};
use crate::metadata::{IndexMetadata, MetadataStore};
use crate::types::{AskRequest, RemoteHead, RepoRef};
use chrono::Utc;
use std::sync::Arc;

const CHECKOUT_DIR: &str = "checkout";

/// An index ready to answer questions, plus how it was obtained
#[derive(Debug)]
pub struct PreparedIndex<H> {
    pub repo: RepoRef,
    pub handle: H,
    pub decision: ReindexDecision,
    /// Commit the index reflects, when known
    pub commit_sha: Option<String>,
}

/// Result of a single question
#[derive(Debug, Clone)]
pub struct AskOutcome {
    pub answer: Answer,
    pub decision: ReindexDecision,
    pub commit_sha: Option<String>,
}

/// The client wired with the production collaborators
pub type DefaultClient = RepoChatClient<GitHubResolver, LocalIndexBuilder, ChatQueryEngine>;

/// Main client: commit resolution, reindex decision, indexing and answering
pub struct RepoChatClient<R, B, Q> {
    resolver: R,
    builder: B,
    engine: Q,
    store: MetadataStore,
    policy: ResolverPolicy,
}

impl DefaultClient {
    /// Build the production client from configuration
    ///
    /// Credentials are checked before the embedding model is loaded, since loading
    /// may download model files.
    pub async fn from_config(config: &Config) -> Result<Self> {
        Self::with_engine(config, ChatQueryEngine::from_config(config)?).await
    }

    /// Build the production client around an already constructed query engine
    pub async fn with_engine(config: &Config, engine: ChatQueryEngine) -> Result<Self> {
        QueryEngine::<crate::index::RepoIndex>::check_credentials(&engine)?;

        let resolver = GitHubResolver::from_config(config)?;

        let embedding = config.embedding.clone();
        let embedder = tokio::task::spawn_blocking(move || FastEmbedManager::from_config(&embedding))
            .await
            .map_err(|e| RepoChatError::other(format!("Embedding model task failed: {}", e)))?
            .map_err(|e| IndexError::Embedding(format!("{:#}", e)))?;

        let builder = LocalIndexBuilder::new(
            Arc::new(embedder),
            config.indexing.clone(),
            config.embedding.batch_size,
        );

        Ok(RepoChatClient::new(
            resolver,
            builder,
            engine,
            MetadataStore::new(config.storage.dir.clone()),
        )
        .with_policy(config.resolver.on_error))
    }
}

impl<R, B, Q> RepoChatClient<R, B, Q>
where
    R: CommitResolver,
    B: IndexBuilder,
    Q: QueryEngine<B::Handle>,
{
    pub fn new(resolver: R, builder: B, engine: Q, store: MetadataStore) -> Self {
        Self {
            resolver,
            builder,
            engine,
            store,
            policy: ResolverPolicy::default(),
        }
    }

    /// Behavior when the latest commit cannot be resolved
    pub fn with_policy(mut self, policy: ResolverPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Records of every indexed repository
    pub fn list(&self) -> Result<Vec<IndexMetadata>> {
        Ok(self.store.list()?)
    }

    /// Answer one question, building or reusing the index as needed
    pub async fn ask(&self, request: &AskRequest) -> Result<AskOutcome> {
        request.validate()?;

        let prepared = self.prepare(&request.repo, request.force_reindex).await?;
        let answer = self.answer(&prepared, &request.question).await?;

        Ok(AskOutcome {
            answer,
            decision: prepared.decision,
            commit_sha: prepared.commit_sha,
        })
    }

    /// Answer a question against an index that is already prepared
    pub async fn answer(&self, prepared: &PreparedIndex<B::Handle>, question: &str) -> Result<Answer> {
        if question.trim().is_empty() {
            return Err(ValidationError::EmptyQuestion.into());
        }
        tracing::info!("Asking about {}", prepared.repo);
        Ok(self.engine.answer(&prepared.handle, question).await?)
    }

    /// Make sure a current index exists for `repo` and open it
    pub async fn prepare(&self, repo: &RepoRef, force: bool) -> Result<PreparedIndex<B::Handle>> {
        self.engine.check_credentials()?;

        // A missing or private repository aborts before anything is read or written
        let resolved = match self.resolver.resolve(repo).await {
            Err(e) if !e.is_transient() => return Err(e.into()),
            resolved => resolved,
        };

        let stored = self.store.load(repo)?;
        let index_dir = self.store.index_dir(repo);
        let index_exists = index_dir.is_dir();

        let (decision, remote) = match resolved {
            Ok(head) => {
                tracing::debug!("Latest commit of {} on {}: {}", repo, head.branch, head.sha);
                let decision = decide_with_index(&head.sha, force, stored.as_ref(), index_exists);
                (decision, Some(head))
            }
            Err(e) => {
                let Some(decision) =
                    decide_without_remote(self.policy, force, stored.as_ref(), index_exists)
                else {
                    return Err(e.into());
                };
                tracing::warn!(
                    "Could not resolve latest commit of {} ({}); policy '{}': {}",
                    repo,
                    e,
                    self.policy,
                    decision
                );
                (decision, None)
            }
        };
        let decision = self.check_model(decision, stored.as_ref());

        if decision == ReindexDecision::Reuse {
            match self.builder.load(&index_dir).await {
                Ok(handle) => {
                    tracing::info!("{}: {}", repo, decision);
                    let commit_sha = remote
                        .map(|head| head.sha)
                        .or_else(|| stored.map(|record| record.last_commit_sha));
                    return Ok(PreparedIndex {
                        repo: repo.clone(),
                        handle,
                        decision,
                        commit_sha,
                    });
                }
                Err(IndexError::NotFound(location)) => {
                    tracing::warn!("Stored index for {} is unusable at {}", repo, location);
                    let decision = ReindexDecision::Rebuild(RebuildReason::IndexMissing);
                    return self.rebuild(repo, remote, decision).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.rebuild(repo, remote, decision).await
    }

    /// Reuse is only safe when the stored vectors came from the current model
    fn check_model(
        &self,
        decision: ReindexDecision,
        stored: Option<&IndexMetadata>,
    ) -> ReindexDecision {
        let current = self.builder.embedding_model();
        match (decision, stored) {
            (ReindexDecision::Reuse, Some(record)) if record.embedding_model != current => {
                ReindexDecision::Rebuild(RebuildReason::ModelChanged {
                    previous: record.embedding_model.clone(),
                    current: current.to_string(),
                })
            }
            (decision, _) => decision,
        }
    }

    async fn rebuild(
        &self,
        repo: &RepoRef,
        remote: Option<RemoteHead>,
        decision: ReindexDecision,
    ) -> Result<PreparedIndex<B::Handle>> {
        tracing::info!("{}: {}", repo, decision);

        let index_dir = self.store.index_dir(repo);
        let request = BuildRequest {
            repo: repo.clone(),
            clone_url: repo.clone_url(),
            branch: remote.as_ref().map(|head| head.branch.clone()),
            checkout_dir: self.store.repo_dir(repo).join(CHECKOUT_DIR),
            index_dir: index_dir.clone(),
        };

        let built = self.builder.build(&request).await?;

        let (branch, sha) = match remote {
            Some(head) => {
                if head.sha != built.head_sha {
                    tracing::debug!(
                        "Checked out {} while the API reported {}",
                        built.head_sha,
                        head.sha
                    );
                }
                (head.branch, head.sha)
            }
            None => (
                built.branch.unwrap_or_else(|| "HEAD".to_string()),
                built.head_sha,
            ),
        };

        let record = IndexMetadata {
            owner: repo.owner().to_string(),
            repo: repo.name().to_string(),
            branch,
            last_commit_sha: sha.clone(),
            last_indexed: Utc::now(),
            index_path: index_dir,
            stats: built.stats,
            embedding_model: self.builder.embedding_model().to_string(),
        };
        self.store.save(repo, &record)?;

        tracing::info!(
            "Indexed {} files ({} chunks) of {}",
            record.stats.files_indexed,
            record.stats.chunks_indexed,
            repo
        );

        Ok(PreparedIndex {
            repo: repo.clone(),
            handle: built.handle,
            decision,
            commit_sha: Some(sha),
        })
    }
}
