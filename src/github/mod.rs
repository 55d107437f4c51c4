//! Commit resolution against the GitHub REST API
//!
//! Two requests per lookup: the repository endpoint for `default_branch`, then the
//! branch endpoint for the SHA at its tip. Nothing is retried; the caller decides what
//! a failure means through the configured resolver policy.

use crate::error::ResolveError;
use crate::types::{RemoteHead, RepoRef};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

/// Default GitHub API base URL
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const USER_AGENT_VALUE: &str = concat!("repo-chat/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

/// Looks up the latest commit on a repository's default branch
#[async_trait]
pub trait CommitResolver: Send + Sync {
    async fn resolve(&self, repo: &RepoRef) -> Result<RemoteHead, ResolveError>;
}

#[derive(Debug, Deserialize)]
struct RepositoryResponse {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct BranchResponse {
    commit: BranchCommit,
}

#[derive(Debug, Deserialize)]
struct BranchCommit {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

/// [`CommitResolver`] backed by the GitHub REST API
pub struct GitHubResolver {
    client: Client,
    api_base: String,
    token: Option<String>,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubResolver")
            .field("api_base", &self.api_base)
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

impl GitHubResolver {
    /// Create a resolver for `api_base` (e.g. `https://api.github.com`)
    ///
    /// A token is optional; without one GitHub applies the anonymous rate limit.
    pub fn new(
        api_base: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ResolveError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResolveError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Build from configuration, reading the token from the configured variable
    pub fn from_config(config: &crate::config::Config) -> Result<Self, ResolveError> {
        let token = std::env::var(&config.github.token_var).ok();
        Self::new(
            config.github.api_base.clone(),
            token,
            Duration::from_secs(config.http.timeout_secs),
        )
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        if let Some(token) = &self.token {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => tracing::warn!("GitHub token contains invalid characters; sending request without it"),
            }
        }
        headers
    }

    /// `{api_base}/repos/{owner}/{name}` plus extra path segments, each percent-encoded
    fn repo_url(&self, repo: &RepoRef, segments: &[&str]) -> Result<Url, ResolveError> {
        let mut url = Url::parse(&self.api_base).map_err(|e| {
            ResolveError::UnexpectedResponse(format!("Invalid API base '{}': {}", self.api_base, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                ResolveError::UnexpectedResponse(format!("Invalid API base '{}'", self.api_base))
            })?
            .pop_if_empty()
            .extend(["repos", repo.owner(), repo.name()])
            .extend(segments);
        Ok(url)
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        repo: &RepoRef,
        url: Url,
    ) -> Result<T, ResolveError> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .headers(self.headers())
            .send()
            .await
            .map_err(|e| ResolveError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_error_response(repo, response, status).await);
        }

        response
            .json()
            .await
            .map_err(|e| ResolveError::UnexpectedResponse(e.to_string()))
    }
}

#[async_trait]
impl CommitResolver for GitHubResolver {
    async fn resolve(&self, repo: &RepoRef) -> Result<RemoteHead, ResolveError> {
        let info: RepositoryResponse = self.get(repo, self.repo_url(repo, &[])?).await?;
        let branch = info.default_branch;

        let branch_url = self.repo_url(repo, &["branches", &branch])?;
        let tip: BranchResponse = self.get(repo, branch_url).await?;

        tracing::info!("{} is at {} on {}", repo, tip.commit.sha, branch);
        Ok(RemoteHead {
            branch,
            sha: tip.commit.sha,
        })
    }
}

/// Map a non-success response onto a [`ResolveError`]
async fn map_error_response(repo: &RepoRef, response: Response, status: StatusCode) -> ResolveError {
    // Rate-limit header must be read before the body consumes the response
    let rate_limited = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");

    let message = match response.json::<GitHubErrorResponse>().await {
        Ok(err) => err.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string(),
    };

    match status {
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS if rate_limited => {
            ResolveError::RateLimited
        }
        StatusCode::TOO_MANY_REQUESTS => ResolveError::RateLimited,
        StatusCode::NOT_FOUND => ResolveError::NotFound(repo.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ResolveError::AccessDenied {
            repo: repo.to_string(),
            message,
        },
        _ => ResolveError::UnexpectedStatus {
            status: status.as_u16(),
            message,
        },
    }
}
