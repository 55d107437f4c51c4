//! Prompt assembly for repository questions

use crate::indexer::fence_tag;
use crate::types::SearchResult;

pub(crate) const SYSTEM_PROMPT: &str = "You are an expert software engineer answering questions \
about a code repository. Answer using the provided context from the repository. Cite file paths \
when they support your answer. If the context does not contain the answer, say so instead of \
guessing.";

const NO_CONTEXT: &str = "No relevant context was found in the repository.";

/// Select chunks for the prompt, best first, within a character budget
///
/// Whole chunks are kept in rank order until the next one would exceed the budget.
/// If even the best chunk is too large it is cut down to the budget, so a question
/// with any retrieval hit always carries some context.
pub fn select_context(results: &[SearchResult], max_chars: usize) -> Vec<SearchResult> {
    let mut selected = Vec::new();
    let mut used = 0;

    for result in results {
        let size = result.content.chars().count();
        if used + size > max_chars {
            break;
        }
        used += size;
        selected.push(result.clone());
    }

    if selected.is_empty()
        && let Some(best) = results.first()
    {
        let mut truncated = best.clone();
        truncated.content = best.content.chars().take(max_chars).collect();
        truncated.end_line = truncated.start_line + truncated.content.lines().count().max(1) - 1;
        selected.push(truncated);
    }

    selected
}

/// User message: context blocks followed by the question, passed through as given
pub fn build_user_message(context: &[SearchResult], question: &str) -> String {
    let mut message = String::new();

    if context.is_empty() {
        message.push_str(NO_CONTEXT);
        message.push_str("\n\n");
    } else {
        message.push_str("Context from the repository:\n\n");
        for chunk in context {
            message.push_str(&format!(
                "### {}\n```{}\n{}\n```\n\n",
                chunk.location(),
                fence_tag(&chunk.language),
                chunk.content
            ));
        }
    }

    message.push_str("Question: ");
    message.push_str(question);
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(path: &str, content: &str) -> SearchResult {
        SearchResult {
            file_path: path.to_string(),
            content: content.to_string(),
            score: 0.8,
            start_line: 1,
            end_line: content.lines().count().max(1),
            language: "Rust".to_string(),
        }
    }

    #[test]
    fn test_select_context_keeps_whole_chunks_in_order() {
        let results = vec![
            result("a.rs", &"a".repeat(40)),
            result("b.rs", &"b".repeat(40)),
            result("c.rs", &"c".repeat(40)),
        ];

        let selected = select_context(&results, 100);
        let paths: Vec<_> = selected.iter().map(|r| r.file_path.as_str()).collect();
        assert_eq!(paths, vec!["a.rs", "b.rs"]);
        assert_eq!(selected[1].content.len(), 40);
    }

    #[test]
    fn test_select_context_stops_at_first_oversized_chunk() {
        let results = vec![
            result("a.rs", &"a".repeat(40)),
            result("big.rs", &"b".repeat(500)),
            result("c.rs", "c"),
        ];

        let selected = select_context(&results, 100);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].file_path, "a.rs");
    }

    #[test]
    fn test_select_context_truncates_oversized_best_chunk() {
        let results = vec![result("big.rs", &"é".repeat(50))];

        let selected = select_context(&results, 10);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].content.chars().count(), 10);
    }

    #[test]
    fn test_select_context_truncation_narrows_line_range() {
        let mut big = result("src/lib.rs", "line1\nline2\nline3");
        big.start_line = 10;
        big.end_line = 12;

        let selected = select_context(&[big], 8);
        assert_eq!(selected[0].content, "line1\nli");
        assert_eq!(selected[0].start_line, 10);
        assert_eq!(selected[0].end_line, 11);
        assert_eq!(selected[0].location(), "src/lib.rs:10-11");
    }

    #[test]
    fn test_select_context_empty() {
        assert!(select_context(&[], 100).is_empty());
    }

    #[test]
    fn test_build_user_message() {
        let context = vec![result("src/main.rs", "fn main() {}")];
        let message = build_user_message(&context, "What does main do?  ");

        assert!(message.starts_with("Context from the repository:"));
        assert!(message.contains("### src/main.rs:1-1\n```rust\nfn main() {}\n```"));
        assert!(message.ends_with("Question: What does main do?  "));
    }

    #[test]
    fn test_build_user_message_without_context() {
        let message = build_user_message(&[], "Where is the parser?");
        assert!(message.starts_with(NO_CONTEXT));
        assert!(message.ends_with("Question: Where is the parser?"));
    }
}
