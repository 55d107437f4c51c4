use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Hosts accepted in a repository URL
const GITHUB_HOSTS: &[&str] = &["github.com", "www.github.com"];

static SEGMENT_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[A-Za-z0-9._-]+$").expect("static regex"));

/// A public GitHub repository identified by owner and name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    owner: String,
    name: String,
}

impl RepoRef {
    /// Build from already-separated parts, validating both
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, ValidationError> {
        let owner = owner.into();
        let name = name.into();
        let display = format!("{}/{}", owner, name);
        validate_segment(&display, "owner", &owner)?;
        validate_segment(&display, "repository name", &name)?;
        Ok(Self { owner, name })
    }

    /// Parse user input into a repository reference
    ///
    /// Accepts full URLs (`https://github.com/owner/name`), URLs without a scheme
    /// (`github.com/owner/name`), SSH remotes (`git@github.com:owner/name.git`) and the
    /// `owner/name` shorthand. Trailing `.git`, slashes, query strings and extra path
    /// segments such as `/tree/main` are ignored.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let invalid = |reason: &str| ValidationError::InvalidUrl {
            input: trimmed.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("input is empty"));
        }

        let without_suffix = trimmed
            .split(['?', '#'])
            .next()
            .unwrap_or(trimmed);

        let (has_host, rest) = if let Some((scheme, rest)) = without_suffix.split_once("://") {
            if !scheme.eq_ignore_ascii_case("https") && !scheme.eq_ignore_ascii_case("http") {
                return Err(invalid("only http(s) URLs are supported"));
            }
            (true, rest.to_string())
        } else if let Some(rest) = without_suffix.strip_prefix("git@") {
            (true, rest.replacen(':', "/", 1))
        } else {
            let first = without_suffix.split('/').next().unwrap_or_default();
            (first.contains('.'), without_suffix.to_string())
        };

        let mut segments = rest.split('/').filter(|s| !s.is_empty());

        if has_host {
            let host = segments.next().unwrap_or_default().to_ascii_lowercase();
            let host = host.split(':').next().unwrap_or_default();
            if !GITHUB_HOSTS.contains(&host) {
                return Err(invalid("only github.com repositories are supported"));
            }
        }

        let remaining: Vec<&str> = segments.collect();
        if remaining.len() < 2 {
            return Err(invalid("expected a repository of the form owner/name"));
        }
        if !has_host && remaining.len() > 2 {
            return Err(invalid("expected a repository of the form owner/name"));
        }

        let owner = remaining[0];
        let name = remaining[1].strip_suffix(".git").unwrap_or(remaining[1]);

        validate_segment(trimmed, "owner", owner)?;
        validate_segment(trimmed, "repository name", name)?;

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical web URL, always with an https scheme
    pub fn url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }

    /// URL used for cloning over https
    pub fn clone_url(&self) -> String {
        format!("{}.git", self.url())
    }

    /// Directory name for this repository under the storage root
    pub fn storage_key(&self) -> String {
        format!("{}_{}", self.owner, self.name)
    }
}

fn validate_segment(input: &str, what: &str, segment: &str) -> Result<(), ValidationError> {
    if segment.is_empty() || segment == "." || segment == ".." || !SEGMENT_RE.is_match(segment) {
        return Err(ValidationError::InvalidUrl {
            input: input.to_string(),
            reason: format!("'{}' is not a valid {}", segment, what),
        });
    }
    Ok(())
}

/// Normalize user input to the canonical `https://github.com/owner/name` URL
pub fn normalize_repo_url(input: &str) -> Result<String, ValidationError> {
    RepoRef::parse(input).map(|repo| repo.url())
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoRef {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Tip of a repository's default branch as reported by the hosting service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteHead {
    /// Default branch name
    pub branch: String,
    /// Commit SHA at the tip of the branch; only ever compared for equality
    pub sha: String,
}

/// Request to answer a question about a repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    /// Repository to ask about
    pub repo: RepoRef,
    /// The natural-language question, passed through unmodified
    pub question: String,
    /// Rebuild the index even if the stored commit is current
    #[serde(default)]
    pub force_reindex: bool,
}

impl AskRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.question.trim().is_empty() {
            return Err(ValidationError::EmptyQuestion);
        }
        Ok(())
    }
}

/// Metadata stored with each chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// File path relative to the repository root
    pub file_path: String,
    /// Starting line number (1-based)
    pub start_line: usize,
    /// Ending line number (inclusive)
    pub end_line: usize,
    /// Detected language
    pub language: Option<String>,
    /// File extension
    pub extension: Option<String>,
    /// SHA256 hash of the file content
    pub file_hash: String,
}

/// A chunk returned by retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// File path relative to the repository root
    pub file_path: String,
    /// The chunk content
    pub content: String,
    /// Similarity score (0.0 to 1.0)
    pub score: f32,
    /// Starting line number in the file
    pub start_line: usize,
    /// Ending line number in the file
    pub end_line: usize,
    /// Detected language
    pub language: String,
}

impl SearchResult {
    /// `path:start-end`, used in prompts and when listing sources
    pub fn location(&self) -> String {
        format!("{}:{}-{}", self.file_path, self.start_line, self.end_line)
    }
}

/// Counters reported by an index build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub files_indexed: usize,
    pub chunks_indexed: usize,
}
