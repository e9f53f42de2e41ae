pub mod error;
pub mod utils;

pub use error::{ErrorCategory, ErrorClassifier, LlmError, NoteError, Result};
pub use utils::{
    TBD, is_unknown_value, safe_file_stem, truncate_chars,
};
