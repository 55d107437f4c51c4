//! Tests for FileWalker

use super::*;
use std::fs;
use tempfile::TempDir;

fn names(files: &[FileInfo]) -> Vec<&str> {
    files.iter().map(|f| f.relative_path.as_str()).collect()
}

fn globset(patterns: &[&str]) -> Option<GlobSet> {
    let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
    build_globset(&patterns).unwrap()
}

#[test]
fn test_new() {
    let walker = FileWalker::new("/tmp", 1024);
    assert_eq!(walker.root, PathBuf::from("/tmp"));
    assert_eq!(walker.max_file_size, 1024);
    assert!(walker.include_patterns.is_empty());
    assert!(walker.exclude_patterns.is_empty());
}

#[test]
fn test_walk_nonexistent_directory() {
    let walker = FileWalker::new("/nonexistent/path/12345", 1024);
    let result = walker.walk();
    assert!(result.unwrap_err().to_string().contains("does not exist"));
}

#[test]
fn test_walk_not_a_directory() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("notadir.txt");
    fs::write(&file_path, "test").unwrap();

    let result = FileWalker::new(&file_path, 1024).walk();
    assert!(result.unwrap_err().to_string().contains("not a directory"));
}

#[test]
fn test_walk_empty_directory() {
    let temp_dir = TempDir::new().unwrap();
    let files = FileWalker::new(temp_dir.path(), 1024).walk().unwrap();
    assert!(files.is_empty());
}

#[test]
fn test_walk_nested_directories_sorted() {
    let temp_dir = TempDir::new().unwrap();
    let subdir = temp_dir.path().join("src");
    fs::create_dir(&subdir).unwrap();
    fs::write(temp_dir.path().join("root.txt"), "root").unwrap();
    fs::write(subdir.join("lib.rs"), "pub fn f() {}").unwrap();

    let files = FileWalker::new(temp_dir.path(), 1024).walk().unwrap();
    assert_eq!(names(&files), vec!["root.txt", "src/lib.rs"]);
}

#[test]
fn test_walk_max_file_size() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("small.txt"), "small").unwrap();
    fs::write(temp_dir.path().join("large.txt"), "a".repeat(2000)).unwrap();

    let files = FileWalker::new(temp_dir.path(), 100).walk().unwrap();
    assert_eq!(names(&files), vec!["small.txt"]);
}

#[test]
fn test_walk_with_include_patterns() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir(temp_dir.path().join("src")).unwrap();
    fs::write(temp_dir.path().join("src/main.rs"), "fn main() {}").unwrap();
    fs::write(temp_dir.path().join("notes.txt"), "text").unwrap();

    let files = FileWalker::new(temp_dir.path(), 1024)
        .with_patterns(vec!["**/*.rs".to_string()], vec![])
        .walk()
        .unwrap();
    assert_eq!(names(&files), vec!["src/main.rs"]);
}

#[test]
fn test_walk_with_default_style_excludes() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("node_modules/pkg")).unwrap();
    fs::write(temp_dir.path().join("node_modules/pkg/index.js"), "x").unwrap();
    fs::write(temp_dir.path().join("Cargo.lock"), "lock").unwrap();
    fs::write(temp_dir.path().join("index.js"), "let a = 1;").unwrap();

    let files = FileWalker::new(temp_dir.path(), 1024)
        .with_patterns(
            vec![],
            vec!["**/node_modules/**".to_string(), "**/*.lock".to_string()],
        )
        .walk()
        .unwrap();
    assert_eq!(names(&files), vec!["index.js"]);
}

#[test]
fn test_walk_invalid_glob_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = FileWalker::new(temp_dir.path(), 1024)
        .with_patterns(vec!["src/[".to_string()], vec![])
        .walk();
    assert!(result.is_err());
}

#[test]
fn test_walk_file_info_fields() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("test.rs");
    fs::write(&file_path, "fn main() {}").unwrap();

    let files = FileWalker::new(temp_dir.path(), 1024).walk().unwrap();
    assert_eq!(files.len(), 1);

    let file_info = &files[0];
    assert_eq!(file_info.path, file_path);
    assert_eq!(file_info.relative_path, "test.rs");
    assert_eq!(file_info.extension, Some("rs".to_string()));
    assert_eq!(file_info.language, Some("Rust".to_string()));
    assert_eq!(file_info.content, "fn main() {}");
    assert_eq!(file_info.hash, calculate_hash("fn main() {}"));
}

#[test]
fn test_walk_skips_binary_and_invalid_utf8() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("text.txt"), "text content").unwrap();
    fs::write(temp_dir.path().join("binary.bin"), vec![0x00; 100]).unwrap();
    fs::write(temp_dir.path().join("invalid.txt"), [0xFF, 0xFE, 0xFD]).unwrap();
    fs::write(temp_dir.path().join("empty.txt"), "").unwrap();

    let files = FileWalker::new(temp_dir.path(), 1024).walk().unwrap();
    assert_eq!(names(&files), vec!["text.txt"]);
}

#[test]
fn test_walk_respects_gitignore_and_skips_git_dir() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(".gitignore"), "ignored.txt\n").unwrap();
    fs::write(temp_dir.path().join("included.txt"), "include").unwrap();
    fs::write(temp_dir.path().join("ignored.txt"), "ignore").unwrap();
    fs::create_dir(temp_dir.path().join(".git")).unwrap();
    fs::write(temp_dir.path().join(".git/config"), "[core]\n").unwrap();

    let files = FileWalker::new(temp_dir.path(), 1024).walk().unwrap();
    let found = names(&files);
    assert!(found.contains(&"included.txt"));
    assert!(found.contains(&".gitignore"));
    assert!(!found.contains(&"ignored.txt"));
    assert!(!found.iter().any(|f| f.starts_with(".git/")));
}

#[test]
fn test_matches_patterns() {
    let include = globset(&["src/**"]);
    let exclude = globset(&["**/generated/**"]);

    assert!(matches_patterns("anything.md", None, None));
    assert!(matches_patterns("src/lib.rs", include.as_ref(), exclude.as_ref()));
    assert!(!matches_patterns("docs/guide.md", include.as_ref(), exclude.as_ref()));
    assert!(!matches_patterns(
        "src/generated/api.rs",
        include.as_ref(),
        exclude.as_ref()
    ));
}

#[test]
fn test_is_text() {
    assert!(is_text(b"fn main() {\n\tprintln!();\r\n}"));
    assert!(!is_text(&[0u8; 10]));
    assert!(!is_text(b""));
    // 3 control bytes out of 10 is exactly the threshold
    assert!(!is_text(&[b'a', b'b', b'c', b'd', b'e', b'f', b'g', 0, 1, 2]));
}

#[test]
fn test_calculate_hash() {
    assert_eq!(calculate_hash("content"), calculate_hash("content"));
    assert_ne!(calculate_hash("content1"), calculate_hash("content2"));
    assert_eq!(
        calculate_hash(""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}
