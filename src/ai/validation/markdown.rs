//! Markdown response cleanup for note pages

use super::json_repair::strip_code_fences;
use crate::types::{NoteError, Result};

/// Normalize a model-written page body
///
/// Strips a single wrapping ```markdown (or ```md) fence, trims, and ends the
/// text with one newline. An empty body is a `Parse` error.
pub fn clean_markdown(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_start_matches('\u{feff}').trim();

    let first_line = trimmed.lines().next().unwrap_or("").trim();
    let wrapped = matches!(first_line, "```markdown" | "```md" | "```")
        && trimmed.len() > first_line.len()
        && trimmed.ends_with("```");
    let body = if wrapped {
        strip_code_fences(trimmed).trim()
    } else {
        trimmed
    };

    if body.is_empty() {
        return Err(NoteError::parse("note page", "model returned an empty page"));
    }

    Ok(format!("{}\n", body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_markdown_kept() {
        let page = clean_markdown("# auth\n\nHandles login.\n\n\n").unwrap();
        assert_eq!(page, "# auth\n\nHandles login.\n");
    }

    #[test]
    fn test_wrapping_fence_stripped() {
        let page = clean_markdown("```markdown\n# core\n\nText\n```").unwrap();
        assert_eq!(page, "# core\n\nText\n");
    }

    #[test]
    fn test_inner_code_blocks_untouched() {
        let raw = "# net\n\n```mermaid\ngraph LR\n  a --> b\n```";
        let page = clean_markdown(raw).unwrap();
        assert!(page.starts_with("# net"));
        assert!(page.contains("```mermaid"));
        assert!(page.trim_end().ends_with("```"));
    }

    #[test]
    fn test_empty_is_parse_error() {
        assert!(matches!(clean_markdown("  \n"), Err(NoteError::Parse { .. })));
        assert!(clean_markdown("```markdown\n\n```").is_err());
    }
}
