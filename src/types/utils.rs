//! Shared utility functions.
//!
//! The analysis schema is owned by the prompt template, so readers of a
//! module analysis treat values leniently: anything in [`is_unknown_value`]
//! counts as missing.

use serde_json::Value;

/// Placeholder for information the model could not or did not provide
pub const TBD: &str = "TBD";

// =============================================================================
// JSON Value Helpers
// =============================================================================

/// Whether a JSON value carries no information.
///
/// `null`, blank strings, the usual "unknown" markers, and empty
/// arrays/objects all count as unknown.
pub fn is_unknown_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed.is_empty()
                || trimmed.eq_ignore_ascii_case(TBD)
                || trimmed.eq_ignore_ascii_case("unknown")
                || trimmed.eq_ignore_ascii_case("n/a")
        }
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

// =============================================================================
// String Utilities
// =============================================================================

/// File-system safe stem for a module name.
///
/// Keeps ASCII alphanumerics, `-` and `_`; everything else becomes `-`.
/// Leading and trailing dashes are trimmed, an empty result becomes `module`.
pub fn safe_file_stem(name: &str) -> String {
    let mapped: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = mapped.trim_matches('-');
    if trimmed.is_empty() {
        "module".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Truncate to at most `max` characters, appending `...` when cut.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_safe_file_stem() {
        assert_eq!(safe_file_stem("auth"), "auth");
        assert_eq!(safe_file_stem("my module.v2"), "my-module-v2");
        assert_eq!(safe_file_stem("__init__"), "__init__");
        assert_eq!(safe_file_stem("..."), "module");
        assert_eq!(safe_file_stem("@scope/pkg"), "scope-pkg");
    }

    #[test]
    fn test_unknown_values() {
        assert!(is_unknown_value(&json!(null)));
        assert!(is_unknown_value(&json!("  ")));
        assert!(is_unknown_value(&json!("tbd")));
        assert!(is_unknown_value(&json!("Unknown")));
        assert!(is_unknown_value(&json!([])));
        assert!(is_unknown_value(&json!({})));
        assert!(!is_unknown_value(&json!("token refresh")));
        assert!(!is_unknown_value(&json!(0)));
        assert!(!is_unknown_value(&json!(false)));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abc", 5), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
    }
}
