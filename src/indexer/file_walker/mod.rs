//! Working tree traversal for indexing

use super::file_info::FileInfo;
use super::language::detect_language;
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Share of control bytes above which a file is treated as binary
const BINARY_THRESHOLD: f64 = 0.3;

pub struct FileWalker {
    pub(crate) root: PathBuf,
    pub(crate) max_file_size: usize,
    pub(crate) include_patterns: Vec<String>,
    pub(crate) exclude_patterns: Vec<String>,
}

impl FileWalker {
    pub fn new(root: impl AsRef<Path>, max_file_size: usize) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            max_file_size,
            include_patterns: vec![],
            exclude_patterns: vec![],
        }
    }

    pub fn with_patterns(
        mut self,
        include_patterns: Vec<String>,
        exclude_patterns: Vec<String>,
    ) -> Self {
        self.include_patterns = include_patterns;
        self.exclude_patterns = exclude_patterns;
        self
    }

    /// Walk the working tree and collect every indexable file
    ///
    /// Honors `.gitignore`, skips `.git`, binaries, non-UTF-8 files and files larger
    /// than the size limit, then applies the include/exclude globs to the path
    /// relative to the root.
    pub fn walk(&self) -> Result<Vec<FileInfo>> {
        if !self.root.exists() {
            anyhow::bail!("Root directory does not exist: {:?}", self.root);
        }
        if !self.root.is_dir() {
            anyhow::bail!("Root path is not a directory: {:?}", self.root);
        }

        let include = build_globset(&self.include_patterns).context("Invalid include pattern")?;
        let exclude = build_globset(&self.exclude_patterns).context("Invalid exclude pattern")?;

        let mut files = Vec::new();

        let walker = WalkBuilder::new(&self.root)
            .standard_filters(true)
            .hidden(false)
            .git_ignore(true)
            .git_exclude(true)
            .git_global(false)
            .require_git(false)
            .build();

        for entry in walker {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            if path.components().any(|c| c.as_os_str() == ".git") {
                continue;
            }

            let relative_path = path
                .strip_prefix(&self.root)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");

            if !matches_patterns(&relative_path, include.as_ref(), exclude.as_ref()) {
                tracing::trace!("Skipping by pattern: {}", relative_path);
                continue;
            }

            if let Ok(metadata) = entry.metadata()
                && metadata.len() > self.max_file_size as u64
            {
                tracing::debug!("Skipping large file: {}", relative_path);
                continue;
            }

            let bytes = match fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::debug!("Skipping unreadable file {}: {}", relative_path, e);
                    continue;
                }
            };

            if !is_text(&bytes) {
                tracing::debug!("Skipping binary file: {}", relative_path);
                continue;
            }

            let content = match String::from_utf8(bytes) {
                Ok(content) => content,
                Err(_) => {
                    tracing::debug!("Skipping non-UTF-8 file: {}", relative_path);
                    continue;
                }
            };

            let hash = calculate_hash(&content);
            let extension = path.extension().and_then(|e| e.to_str()).map(String::from);
            let language = extension.as_deref().and_then(detect_language);

            files.push(FileInfo {
                path: path.to_path_buf(),
                relative_path,
                extension,
                language,
                content,
                hash,
            });
        }

        // Stable row order across rebuilds of the same commit
        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        tracing::info!("Found {} files to index", files.len());
        Ok(files)
    }
}

/// Compile patterns into one set; `None` when there are no patterns
fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).with_context(|| format!("Failed to compile glob '{}'", pattern))?;
        builder.add(glob);
    }
    Ok(Some(builder.build()?))
}

/// Include patterns must match when present; exclude patterns must not
pub(crate) fn matches_patterns(
    relative_path: &str,
    include: Option<&GlobSet>,
    exclude: Option<&GlobSet>,
) -> bool {
    if let Some(include) = include
        && !include.is_match(relative_path)
    {
        return false;
    }

    !exclude.is_some_and(|exclude| exclude.is_match(relative_path))
}

/// Heuristic text check: empty files are skipped, as are files with many control bytes
pub(crate) fn is_text(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return false;
    }

    let non_printable = bytes
        .iter()
        .filter(|&&b| b < 0x20 && b != b'\n' && b != b'\r' && b != b'\t')
        .count();

    (non_printable as f64 / bytes.len() as f64) < BINARY_THRESHOLD
}

pub(crate) fn calculate_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests;
