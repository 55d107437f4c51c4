/// Configuration system for repo-chat
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::decision::ResolverPolicy;
use crate::error::{ConfigError, RepoChatError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Where metadata records and indexes are persisted
    #[serde(default)]
    pub storage: StorageConfig,

    /// GitHub API access
    #[serde(default)]
    pub github: GitHubConfig,

    /// Chat completion provider
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Indexing configuration
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Retrieval configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Behavior when the latest commit cannot be resolved
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// HTTP client settings shared by the GitHub and LLM clients
    #[serde(default)]
    pub http: HttpConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory; each repository gets `<root>/<owner>_<repo>/`
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
}

/// GitHub configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// REST API base URL (override for GitHub Enterprise)
    #[serde(default = "default_github_api")]
    pub api_base: String,

    /// Environment variable holding an optional access token
    #[serde(default = "default_github_token_var")]
    pub token_var: String,
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible API base URL
    #[serde(default = "default_llm_api")]
    pub api_base: String,

    /// Chat model name
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Environment variable holding the (required) API key
    #[serde(default = "default_llm_key_var")]
    pub api_key_var: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on retrieved context characters sent with a question
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name (e.g., "all-MiniLM-L6-v2", "BAAI/bge-small-en-v1.5")
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Batch size for embedding generation
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Download cache for model files
    #[serde(default = "default_model_cache_dir")]
    pub cache_dir: PathBuf,
}

/// Indexing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Lines per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Lines shared between consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Maximum file size to index (in bytes)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    /// Glob patterns a file must match (empty means everything)
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Glob patterns excluded from indexing
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    /// Keep the cloned working tree after indexing
    #[serde(default)]
    pub keep_checkout: bool,
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of chunks retrieved per question
    #[serde(default = "default_result_limit")]
    pub limit: usize,

    /// Minimum similarity score (0.0 to 1.0)
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

/// Resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResolverConfig {
    /// What to do when GitHub cannot be reached
    #[serde(default)]
    pub on_error: ResolverPolicy,
}

/// HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

// Default value functions
fn default_storage_dir() -> PathBuf {
    crate::paths::PlatformPaths::default_storage_dir()
}

fn default_github_api() -> String {
    "https://api.github.com".to_string()
}

fn default_github_token_var() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_llm_api() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_key_var() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_context_chars() -> usize {
    24_000
}

fn default_model_name() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_batch_size() -> usize {
    32
}

fn default_model_cache_dir() -> PathBuf {
    crate::paths::PlatformPaths::default_model_cache_dir()
}

fn default_chunk_size() -> usize {
    50
}

fn default_chunk_overlap() -> usize {
    10
}

fn default_max_file_size() -> usize {
    1_048_576 // 1 MB
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "**/node_modules/**".to_string(),
        "**/target/**".to_string(),
        "**/dist/**".to_string(),
        "**/vendor/**".to_string(),
        "**/*.lock".to_string(),
        "**/package-lock.json".to_string(),
        "**/*.min.js".to_string(),
    ]
}

fn default_result_limit() -> usize {
    8
}

fn default_min_score() -> f32 {
    0.0
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: default_github_api(),
            token_var: default_github_token_var(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_llm_api(),
            model: default_llm_model(),
            api_key_var: default_llm_key_var(),
            temperature: default_temperature(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            batch_size: default_batch_size(),
            cache_dir: default_model_cache_dir(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_file_size: default_max_file_size(),
            include_patterns: Vec::new(),
            exclude_patterns: default_exclude_patterns(),
            keep_checkout: false,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: default_result_limit(),
            min_score: default_min_score(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, RepoChatError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or fall back to defaults
    pub fn load_or_default() -> Result<Self, RepoChatError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::debug!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from an explicit file (which must exist) or the default location,
    /// then apply environment overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self, RepoChatError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::load_or_default()?,
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), RepoChatError> {
        fn invalid(key: &str, reason: impl Into<String>) -> RepoChatError {
            ConfigError::InvalidValue {
                key: key.to_string(),
                reason: reason.into(),
            }
            .into()
        }

        if self.storage.dir.as_os_str().is_empty() {
            return Err(invalid("storage.dir", "must not be empty"));
        }

        for (key, url) in [
            ("github.api_base", &self.github.api_base),
            ("llm.api_base", &self.llm.api_base),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(invalid(
                    key,
                    format!("must be an http(s) URL, got '{}'", url),
                ));
            }
        }

        if self.llm.model.trim().is_empty() {
            return Err(invalid("llm.model", "must not be empty"));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(invalid(
                "llm.temperature",
                format!("must be between 0.0 and 2.0, got {}", self.llm.temperature),
            ));
        }

        if self.llm.max_context_chars == 0 {
            return Err(invalid("llm.max_context_chars", "must be greater than 0"));
        }

        if self.embedding.batch_size == 0 {
            return Err(invalid("embedding.batch_size", "must be greater than 0"));
        }

        if self.indexing.chunk_size == 0 {
            return Err(invalid("indexing.chunk_size", "must be greater than 0"));
        }

        if self.indexing.chunk_overlap >= self.indexing.chunk_size {
            return Err(invalid(
                "indexing.chunk_overlap",
                format!(
                    "must be smaller than indexing.chunk_size ({}), got {}",
                    self.indexing.chunk_size, self.indexing.chunk_overlap
                ),
            ));
        }

        if self.indexing.max_file_size == 0 {
            return Err(invalid("indexing.max_file_size", "must be greater than 0"));
        }

        if !(0.0..=1.0).contains(&self.search.min_score) {
            return Err(invalid(
                "search.min_score",
                format!("must be between 0.0 and 1.0, got {}", self.search.min_score),
            ));
        }

        if self.search.limit == 0 {
            return Err(invalid("search.limit", "must be greater than 0"));
        }

        if self.http.timeout_secs == 0 {
            return Err(invalid("http.timeout_secs", "must be greater than 0"));
        }

        Ok(())
    }

    /// Apply environment variable overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), RepoChatError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using an arbitrary variable lookup
    ///
    /// A value that does not parse is an error rather than silently keeping the file's setting.
    pub fn apply_overrides_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), RepoChatError> {
        if let Some(dir) = lookup("REPO_CHAT_STORAGE_DIR") {
            self.storage.dir = PathBuf::from(dir);
        }

        if let Some(model) = lookup("REPO_CHAT_MODEL") {
            self.llm.model = model;
        }

        if let Some(model) = lookup("REPO_CHAT_EMBEDDING_MODEL") {
            self.embedding.model_name = model;
        }

        if let Some(url) = lookup("REPO_CHAT_GITHUB_API") {
            self.github.api_base = url;
        }

        if let Some(url) = lookup("REPO_CHAT_LLM_API") {
            self.llm.api_base = url;
        }

        if let Some(policy) = lookup("REPO_CHAT_ON_RESOLVER_ERROR") {
            self.resolver.on_error = policy.parse::<ResolverPolicy>().map_err(|reason| {
                ConfigError::InvalidValue {
                    key: "REPO_CHAT_ON_RESOLVER_ERROR".to_string(),
                    reason,
                }
            })?;
        }

        Ok(())
    }
}
