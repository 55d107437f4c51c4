//! # repo-chat - Ask questions about a GitHub repository
//!
//! Clones a public GitHub repository, indexes its files into a local vector store and
//! answers natural-language questions with an OpenAI-compatible chat model. The index
//! is persisted per repository together with the commit it was built from, so it is
//! only rebuilt when the default branch moves (or on request).
//!
//! ## Pipeline
//!
//! ```text
//! RepoRef ──► CommitResolver ──► decide ──► IndexBuilder::build / load ──► QueryEngine
//!   (URL)      (GitHub API)       (SHA vs      (clone, chunk, embed,         (retrieve +
//!                                 metadata)     LanceDB)                      chat API)
//! ```
//!
//! ## Modules
//!
//! - [`client`]: the ask pipeline wiring every component together
//! - [`github`]: latest-commit lookup against the GitHub REST API
//! - [`decision`]: pure reindex decision logic
//! - [`metadata`]: per-repository index records on disk
//! - [`index`]: index builder/loader and retrieval traits
//! - [`indexer`]: file walking, language detection and line chunking
//! - [`embedding`]: embedding generation using FastEmbed
//! - [`vector_db`]: LanceDB storage for chunk vectors
//! - [`llm`]: prompt assembly and chat completions
//! - [`cli`]: argument and interactive front end
//! - [`config`]: configuration with file, environment and flag layers
//! - [`error`]: error types and exit codes

/// Argument parsing, interactive prompts and exit codes
pub mod cli;

/// The ask pipeline
pub mod client;

/// Configuration management with environment variable overrides
pub mod config;

/// Reindex decision logic
pub mod decision;

/// Embedding generation using FastEmbed
pub mod embedding;

/// Error types and utilities
pub mod error;

/// Cloning repositories with libgit2
pub mod git;

/// GitHub REST API commit resolution
pub mod github;

/// Index building, loading and retrieval
pub mod index;

/// File walking, language detection and chunking
pub mod indexer;

/// Chat completion query engine
pub mod llm;

/// Per-repository index metadata
pub mod metadata;

/// Platform-specific default paths
pub mod paths;

/// Shared request and result types
pub mod types;

/// Vector storage backed by LanceDB
pub mod vector_db;

pub use client::{AskOutcome, DefaultClient, PreparedIndex, RepoChatClient};
pub use config::Config;
pub use error::{RepoChatError, Result};
pub use types::{AskRequest, RepoRef};
