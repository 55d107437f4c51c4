/// Centralized error types for repo-chat using thiserror
///
/// Each component boundary returns one of the domain enums below; the CLI maps the
/// top-level [`RepoChatError`] onto a user-facing message and a process exit code.
use thiserror::Error;

/// Main error type for repo-chat
#[derive(Error, Debug)]
pub enum RepoChatError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Resolve(#[from] ResolveError),

    #[error("{0}")]
    Credentials(#[from] CredentialsError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Language model error: {0}")]
    Llm(#[from] LlmError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors caused by malformed user input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid repository URL '{input}': {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Question must not be empty")]
    EmptyQuestion,
}

/// Errors from looking up the latest commit on the hosting service
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Repository not found: {0}")]
    NotFound(String),

    #[error("Access denied to repository {repo}: {message}")]
    AccessDenied { repo: String, message: String },

    #[error("GitHub API rate limit exceeded; set GITHUB_TOKEN for a higher limit")]
    RateLimited,

    #[error("Network error while contacting GitHub: {0}")]
    Network(String),

    #[error("GitHub API returned status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("Unexpected response from GitHub: {0}")]
    UnexpectedResponse(String),
}

/// Errors about missing secrets
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("{var} is not set. Export it or add it to a .env file")]
    Missing { var: String },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Errors related to the per-repository metadata records
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to read metadata from '{path}': {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Failed to save metadata to '{path}': {reason}")]
    SaveFailed { path: String, reason: String },
}

/// Errors related to building or loading a repository index
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to clone {url}: {reason}")]
    CloneFailed { url: String, reason: String },

    #[error("Failed to read working tree: {0}")]
    Walk(String),

    #[error("No indexable files found in {0}")]
    NoFilesFound(String),

    #[error("No index found at {0}")]
    NotFound(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Vector store failed: {0}")]
    Store(String),
}

/// Errors from the chat completion endpoint
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("The language model provider rejected the API key (401)")]
    Unauthorized,

    #[error("Language model API returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error while contacting the language model: {0}")]
    Network(String),

    #[error("Language model returned no answer")]
    EmptyResponse,

    #[error("Failed to decode language model response: {0}")]
    Decode(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),
}

impl From<anyhow::Error> for RepoChatError {
    fn from(err: anyhow::Error) -> Self {
        RepoChatError::Other(format!("{:#}", err))
    }
}

/// Result alias used across the crate's public API
pub type Result<T, E = RepoChatError> = std::result::Result<T, E>;

/// Process exit codes
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const REPOSITORY: i32 = 3;
    pub const NETWORK: i32 = 4;
    pub const CREDENTIALS: i32 = 5;
    pub const CONFIG: i32 = 6;
}

impl RepoChatError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        RepoChatError::Other(msg.into())
    }

    /// Exit status the CLI should terminate with for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            RepoChatError::Validation(_) => exit_code::USAGE,
            RepoChatError::Resolve(ResolveError::NotFound(_))
            | RepoChatError::Resolve(ResolveError::AccessDenied { .. }) => exit_code::REPOSITORY,
            RepoChatError::Resolve(_) | RepoChatError::Llm(LlmError::Network(_)) => {
                exit_code::NETWORK
            }
            RepoChatError::Credentials(_) | RepoChatError::Llm(LlmError::Unauthorized) => {
                exit_code::CREDENTIALS
            }
            RepoChatError::Config(_) => exit_code::CONFIG,
            _ => exit_code::FAILURE,
        }
    }

    /// Whether retrying needs different input from the user
    ///
    /// Repeating the same request after a bad URL or a missing repository cannot succeed,
    /// so interactive mode asks for the repository and question again.
    pub fn is_retryable_input(&self) -> bool {
        matches!(
            self,
            RepoChatError::Validation(_)
                | RepoChatError::Resolve(ResolveError::NotFound(_))
                | RepoChatError::Resolve(ResolveError::AccessDenied { .. })
        )
    }
}

impl ResolveError {
    /// Transient failures are subject to the configured resolver policy;
    /// a missing or private repository never is.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            ResolveError::NotFound(_) | ResolveError::AccessDenied { .. }
        )
    }
}
