use anyhow::{Context, Result};
use git2::build::RepoBuilder;
use git2::{FetchOptions, Repository};
use std::path::{Path, PathBuf};

/// What to check out and where
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Clone URL (https, or a local path in tests)
    pub url: String,
    /// Branch to check out; `None` uses the remote HEAD
    pub branch: Option<String>,
    /// Destination directory; removed first if it exists
    pub dest: PathBuf,
    /// History depth, `None` for a full clone
    pub depth: Option<i32>,
}

/// A working tree produced by [`clone_repository`]
#[derive(Debug, Clone)]
pub struct ClonedRepo {
    /// Working tree root
    pub path: PathBuf,
    /// SHA of the checked-out HEAD commit
    pub head_sha: String,
    /// Checked-out branch, or None if HEAD is detached
    pub branch: Option<String>,
}

/// Clone a repository and report the commit that was checked out
///
/// Blocking; run it through `spawn_blocking` from async code.
pub fn clone_repository(request: &CheckoutRequest) -> Result<ClonedRepo> {
    if request.dest.exists() {
        tracing::debug!("Removing previous checkout at {:?}", request.dest);
        std::fs::remove_dir_all(&request.dest).with_context(|| {
            format!("Failed to remove previous checkout {:?}", request.dest)
        })?;
    }
    if let Some(parent) = request.dest.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }

    let mut fetch_options = FetchOptions::new();
    if let Some(depth) = request.depth {
        fetch_options.depth(depth);
    }

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options);
    if let Some(branch) = &request.branch {
        builder.branch(branch);
    }

    tracing::info!(
        "Cloning {} ({}) into {:?}",
        request.url,
        request.branch.as_deref().unwrap_or("default branch"),
        request.dest
    );
    let repo = builder
        .clone(&request.url, &request.dest)
        .with_context(|| format!("Failed to clone {}", request.url))?;

    let head_sha = head_sha(&repo)?;
    let branch = repo.head().ok().and_then(|h| h.shorthand().map(str::to_string));

    Ok(ClonedRepo {
        path: request.dest.clone(),
        head_sha,
        branch,
    })
}

fn head_sha(repo: &Repository) -> Result<String> {
    let commit = repo
        .head()
        .context("Repository has no HEAD")?
        .peel_to_commit()
        .context("HEAD does not point to a commit")?;
    Ok(commit.id().to_string())
}

/// SHA of HEAD for an existing working tree
fn read_head_sha(path: &Path) -> Result<String> {
    let repo = Repository::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    head_sha(&repo)
}
