//! Model Response Validation
//!
//! - JSON object extraction and repair for analysis responses
//! - Markdown cleanup for note pages
//!
//! Repair on format issues, fail with `Parse` when nothing usable remains.

mod json_repair;
mod markdown;

pub use json_repair::{JsonRepairer, parse_json_object};
pub use markdown::clean_markdown;
