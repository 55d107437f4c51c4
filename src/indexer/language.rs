//! Language detection from file extensions

/// (language, markdown fence tag, extensions)
const LANGUAGES: &[(&str, &str, &[&str])] = &[
    ("Rust", "rust", &["rs"]),
    ("Python", "python", &["py", "pyi"]),
    ("JavaScript", "javascript", &["js", "mjs", "cjs", "jsx"]),
    ("TypeScript", "typescript", &["ts", "tsx", "mts", "cts"]),
    ("Java", "java", &["java"]),
    ("C++", "cpp", &["cpp", "cc", "cxx", "hpp", "hh"]),
    ("C", "c", &["c", "h"]),
    ("C#", "csharp", &["cs"]),
    ("Go", "go", &["go"]),
    ("Ruby", "ruby", &["rb"]),
    ("PHP", "php", &["php"]),
    ("Swift", "swift", &["swift"]),
    ("Kotlin", "kotlin", &["kt", "kts"]),
    ("Scala", "scala", &["scala"]),
    ("Shell", "bash", &["sh", "bash", "zsh"]),
    ("SQL", "sql", &["sql"]),
    ("HTML", "html", &["html", "htm"]),
    ("CSS", "css", &["css", "scss", "sass"]),
    ("Vue", "vue", &["vue"]),
    ("Svelte", "svelte", &["svelte"]),
    ("JSON", "json", &["json"]),
    ("YAML", "yaml", &["yaml", "yml"]),
    ("TOML", "toml", &["toml"]),
    ("XML", "xml", &["xml"]),
    ("INI", "ini", &["ini", "cfg", "conf"]),
    ("Markdown", "markdown", &["md", "markdown"]),
    ("reStructuredText", "rst", &["rst"]),
    ("Text", "text", &["txt"]),
];

/// Detect the language of a file from its extension (case-insensitive)
pub fn detect_language(extension: &str) -> Option<String> {
    let extension = extension.to_ascii_lowercase();
    LANGUAGES
        .iter()
        .find(|(_, _, extensions)| extensions.contains(&extension.as_str()))
        .map(|(language, _, _)| language.to_string())
}

/// Markdown code fence tag for a detected language; empty when unknown
pub fn fence_tag(language: &str) -> &'static str {
    LANGUAGES
        .iter()
        .find(|(name, _, _)| *name == language)
        .map(|(_, tag, _)| *tag)
        .unwrap_or("")
}
