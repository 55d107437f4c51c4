use super::CodeChunk;
use super::file_info::FileInfo;
use crate::types::ChunkMetadata;

/// Splits files into overlapping windows of lines
#[derive(Debug, Clone, Copy)]
pub struct CodeChunker {
    size: usize,
    overlap: usize,
}

impl CodeChunker {
    /// `size` lines per chunk, `overlap` lines shared with the previous chunk
    ///
    /// An overlap that is not smaller than the size is clamped so the window
    /// always advances.
    pub fn new(size: usize, overlap: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            overlap: overlap.min(size - 1),
        }
    }

    pub fn from_config(config: &crate::config::IndexingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Chunk a file; whitespace-only windows are dropped
    pub fn chunk_file(&self, file_info: &FileInfo) -> Vec<CodeChunk> {
        let lines: Vec<&str> = file_info.content.lines().collect();
        let mut chunks = Vec::new();

        let step = self.size - self.overlap;
        let mut start_idx = 0;

        while start_idx < lines.len() {
            let end_idx = (start_idx + self.size).min(lines.len());
            let content = lines[start_idx..end_idx].join("\n");

            if !content.trim().is_empty() {
                chunks.push(CodeChunk {
                    content,
                    metadata: ChunkMetadata {
                        file_path: file_info.relative_path.clone(),
                        start_line: start_idx + 1,
                        end_line: end_idx,
                        language: file_info.language.clone(),
                        extension: file_info.extension.clone(),
                        file_hash: file_info.hash.clone(),
                    },
                });
            }

            if end_idx >= lines.len() {
                break;
            }
            start_idx += step;
        }

        chunks
    }
}

impl Default for CodeChunker {
    fn default() -> Self {
        Self::new(50, 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn create_test_file_info(content: &str) -> FileInfo {
        FileInfo {
            path: PathBuf::from("test.rs"),
            relative_path: "src/test.rs".to_string(),
            extension: Some("rs".to_string()),
            language: Some("Rust".to_string()),
            content: content.to_string(),
            hash: "test_hash".to_string(),
        }
    }

    fn numbered_lines(n: usize) -> String {
        (1..=n)
            .map(|i| format!("line {}", i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn ranges(chunks: &[CodeChunk]) -> Vec<(usize, usize)> {
        chunks
            .iter()
            .map(|c| (c.metadata.start_line, c.metadata.end_line))
            .collect()
    }

    #[test]
    fn test_sliding_window_line_ranges() {
        let file_info = create_test_file_info(&numbered_lines(20));
        let chunks = CodeChunker::new(10, 5).chunk_file(&file_info);

        assert_eq!(ranges(&chunks), vec![(1, 10), (6, 15), (11, 20)]);
        assert!(chunks[1].content.starts_with("line 6\n"));
        assert!(chunks[1].content.ends_with("line 15"));
    }

    #[test]
    fn test_without_overlap() {
        let file_info = create_test_file_info(&numbered_lines(25));
        let chunks = CodeChunker::new(10, 0).chunk_file(&file_info);

        assert_eq!(ranges(&chunks), vec![(1, 10), (11, 20), (21, 25)]);
    }

    #[test]
    fn test_short_file_is_single_chunk() {
        let file_info = create_test_file_info("fn main() {}\n");
        let chunks = CodeChunker::default().chunk_file(&file_info);

        assert_eq!(chunks.len(), 1);
        assert_eq!(ranges(&chunks), vec![(1, 1)]);
        assert_eq!(chunks[0].metadata.file_path, "src/test.rs");
        assert_eq!(chunks[0].metadata.language.as_deref(), Some("Rust"));
        assert_eq!(chunks[0].metadata.file_hash, "test_hash");
    }

    #[test]
    fn test_empty_and_blank_files() {
        let chunker = CodeChunker::new(3, 0);
        assert!(chunker.chunk_file(&create_test_file_info("")).is_empty());

        let chunks = chunker.chunk_file(&create_test_file_info("a\nb\nc\n\n  \n\nd"));
        assert_eq!(ranges(&chunks), vec![(1, 3), (7, 7)]);
    }

    #[test]
    fn test_overlap_clamped() {
        let file_info = create_test_file_info(&numbered_lines(4));
        let chunks = CodeChunker::new(2, 5).chunk_file(&file_info);

        assert_eq!(ranges(&chunks), vec![(1, 2), (2, 3), (3, 4)]);
    }
}
