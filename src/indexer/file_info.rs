//! File information structure for indexed files

use std::path::PathBuf;

/// A text file discovered in the working tree
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub path: PathBuf,
    /// Path relative to the working tree root, always with `/` separators
    pub relative_path: String,
    pub extension: Option<String>,
    pub language: Option<String>,
    pub content: String,
    /// SHA256 of the content
    pub hash: String,
}
