//! JSON Repair Mechanism
//!
//! JSON object extraction and repair for model responses.
//!
//! Handles common model output issues:
//! - Markdown code fence wrapping (```json ... ```)
//! - JSON embedded in explanatory text
//! - Trailing commas
//! - Missing closing braces/brackets
//! - Unterminated strings

use serde_json::{Map, Value};
use tracing::debug;

use crate::types::{NoteError, Result, truncate_chars};

/// Parse a model response into a JSON object
///
/// Primary entry point for analysis responses. Anything that is not a JSON
/// object after extraction and repair is a `Parse` error.
pub fn parse_json_object(content: &str) -> Result<Map<String, Value>> {
    JsonRepairer::new().parse_object(content).map(|(map, _)| map)
}

// =============================================================================
// JsonRepairer
// =============================================================================

pub struct JsonRepairer {
    max_repair_attempts: usize,
}

impl Default for JsonRepairer {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonRepairer {
    pub fn new() -> Self {
        Self {
            max_repair_attempts: 2,
        }
    }

    /// Parse a JSON object, attempting extraction and repair on failure
    ///
    /// Returns (object, was_repaired)
    pub fn parse_object(&self, raw: &str) -> Result<(Map<String, Value>, bool)> {
        let cleaned = preprocess(raw);
        if cleaned.is_empty() {
            return Err(NoteError::parse("model response", "empty response"));
        }

        if let Some(map) = as_object(&cleaned) {
            return Ok((map, false));
        }

        // Outermost {...} span, then the first balanced object
        let candidates = [outer_object_span(&cleaned), first_balanced_object(&cleaned)];
        for candidate in candidates.into_iter().flatten() {
            if let Some(map) = as_object(candidate) {
                debug!("JSON object extracted from mixed content");
                return Ok((map, true));
            }
        }

        let base = cleaned
            .find('{')
            .map(|start| &cleaned[start..])
            .unwrap_or(&cleaned);
        for level in 1..=self.max_repair_attempts {
            let repaired = repair(base, level);
            if let Some(map) = as_object(&repaired) {
                debug!("JSON object repaired at level {}", level);
                return Ok((map, true));
            }
        }

        Err(NoteError::parse(
            "model response",
            format!(
                "no JSON object found. Content preview: {}",
                truncate_chars(&cleaned, 200)
            ),
        ))
    }
}

fn as_object(s: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(s) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn preprocess(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('\u{feff}').trim();
    strip_code_fences(trimmed).trim().to_string()
}

/// Strip one wrapping markdown code fence, whatever its info string
pub(crate) fn strip_code_fences(s: &str) -> &str {
    let mut result = s;

    if result.starts_with("```") {
        result = match result.find('\n') {
            Some(first_newline) => &result[first_newline + 1..],
            None => "",
        };
        if let Some(stripped) = result.trim_end().strip_suffix("```") {
            result = stripped;
        }
    }

    result
}

/// Slice from the first `{` to the last `}`
fn outer_object_span(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    (end > start).then(|| &s[start..=end])
}

/// First complete `{...}` value, honoring strings and escapes
fn first_balanced_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;

    for (i, ch) in s[start..].char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => depth += 1,
            '}' | ']' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&s[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Repair with increasing aggressiveness
fn repair(s: &str, level: usize) -> String {
    let mut result = fix_trailing_commas(s);
    if level >= 2 {
        result = close_strings_at_newline(&result);
    }
    balance_brackets(&fix_trailing_commas(&result))
}

/// Drop commas directly before `]` or `}`
fn fix_trailing_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escape = false;

    for (i, &ch) in chars.iter().enumerate() {
        if escape {
            escape = false;
            result.push(ch);
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            ',' if !in_string => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if matches!(next, Some(']') | Some('}')) {
                    continue;
                }
            }
            _ => {}
        }
        result.push(ch);
    }

    result
}

/// Append closers for unterminated strings, arrays and objects
fn balance_brackets(s: &str) -> String {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escape = false;

    for ch in s.chars() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => stack.push('}'),
            '[' if !in_string => stack.push(']'),
            '}' | ']' if !in_string => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut result = s.trim_end().to_string();
    if in_string {
        result.push('"');
    }
    while let Some(closer) = stack.pop() {
        result.push(closer);
    }
    result
}

/// Terminate strings that run into a line break
fn close_strings_at_newline(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    let mut in_string = false;
    let mut escape = false;

    for ch in s.chars() {
        if escape {
            escape = false;
            result.push(ch);
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '\n' | '\r' if in_string => {
                result.push('"');
                in_string = false;
            }
            _ => {}
        }
        result.push(ch);
    }

    result
}
