//! Chunk Planner
//!
//! Packs a module's files into prompt-sized chunks. Files keep their order;
//! a file longer than the per-file limit is split into contiguous character
//! windows, each in a chunk of its own. Nothing is dropped or truncated.

use serde::Serialize;
use serde_json::{Value, json};

use crate::analyzer::{Language, LoadedFile};
use crate::config::ChunkingConfig;
use crate::types::{NoteError, Result};

/// Position of a window within a sliced file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SliceInfo {
    /// 0-based window index
    pub index: usize,
    /// Number of windows the file was split into
    pub count: usize,
    /// Offset of the window's first character in the file
    pub char_offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPart {
    pub path: String,
    pub language: Language,
    pub content: String,
    pub slice: Option<SliceInfo>,
}

impl ChunkPart {
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub module: String,
    /// 0-based, contiguous within a module
    pub index: usize,
    pub parts: Vec<ChunkPart>,
}

impl Chunk {
    pub fn char_count(&self) -> usize {
        self.parts.iter().map(ChunkPart::char_count).sum()
    }

    pub fn is_slice(&self) -> bool {
        self.parts.iter().any(|p| p.slice.is_some())
    }

    /// JSON document bound to the analysis template's `payload` placeholder
    pub fn payload(&self, chunk_count: usize) -> Value {
        let snippets: Vec<Value> = self
            .parts
            .iter()
            .enumerate()
            .map(|(i, part)| {
                let mut snippet = json!({
                    "snippet_id": format!("{}-{}-{}", self.module, self.index + 1, i + 1),
                    "path": part.path,
                    "language": part.language.highlight_str(),
                    "content": part.content,
                });
                if let (Some(slice), Some(obj)) = (part.slice, snippet.as_object_mut()) {
                    obj.insert("slice".to_string(), json!(slice));
                }
                snippet
            })
            .collect();

        json!({
            "module": self.module,
            "chunk_index": self.index + 1,
            "chunk_count": chunk_count,
            "snippets": snippets,
        })
    }
}

/// Per-chunk limits; both are at least 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLimits {
    max_files: usize,
    max_chars: usize,
}

impl ChunkLimits {
    pub fn new(max_files: usize, max_chars: usize) -> Result<Self> {
        if max_files == 0 || max_chars == 0 {
            return Err(NoteError::config(format!(
                "Chunk limits must be at least 1 (max_files_per_module={}, max_chars_per_file={})",
                max_files, max_chars
            )));
        }
        Ok(Self {
            max_files,
            max_chars,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.max_files_per_module, config.max_chars_per_file)
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Character budget of one chunk
    pub fn budget(&self) -> usize {
        self.max_chars.saturating_mul(self.max_files)
    }
}

#[derive(Debug, Clone)]
pub struct ChunkPlanner {
    limits: ChunkLimits,
}

impl ChunkPlanner {
    pub fn new(limits: ChunkLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> ChunkLimits {
        self.limits
    }

    /// Plan the chunks of one module, files in the given order
    pub fn plan(&self, module: &str, files: &[LoadedFile]) -> Vec<Chunk> {
        let mut builder = ChunkBuilder::new(module);

        for file in files {
            if file.char_count > self.limits.max_chars {
                builder.flush();
                let windows = split_windows(&file.content, self.limits.max_chars);
                let count = windows.len();
                for (index, (char_offset, text)) in windows.into_iter().enumerate() {
                    builder.push(ChunkPart {
                        path: file.file.path.clone(),
                        language: file.file.language,
                        content: text.to_string(),
                        slice: Some(SliceInfo {
                            index,
                            count,
                            char_offset,
                        }),
                    });
                    builder.flush();
                }
                continue;
            }

            let would_overflow = builder.parts.len() + 1 > self.limits.max_files
                || builder.chars + file.char_count > self.limits.budget();
            if would_overflow {
                builder.flush();
            }
            builder.push(ChunkPart {
                path: file.file.path.clone(),
                language: file.file.language,
                content: file.content.clone(),
                slice: None,
            });
        }

        builder.finish()
    }
}

struct ChunkBuilder<'a> {
    module: &'a str,
    chunks: Vec<Chunk>,
    parts: Vec<ChunkPart>,
    chars: usize,
}

impl<'a> ChunkBuilder<'a> {
    fn new(module: &'a str) -> Self {
        Self {
            module,
            chunks: Vec::new(),
            parts: Vec::new(),
            chars: 0,
        }
    }

    fn push(&mut self, part: ChunkPart) {
        self.chars += part.char_count();
        self.parts.push(part);
    }

    fn flush(&mut self) {
        if self.parts.is_empty() {
            return;
        }
        self.chunks.push(Chunk {
            module: self.module.to_string(),
            index: self.chunks.len(),
            parts: std::mem::take(&mut self.parts),
        });
        self.chars = 0;
    }

    fn finish(mut self) -> Vec<Chunk> {
        self.flush();
        self.chunks
    }
}

/// Split text into windows of at most `max_chars` characters.
/// Returns (char offset, window) pairs.
fn split_windows(text: &str, max_chars: usize) -> Vec<(usize, &str)> {
    let mut windows = Vec::new();
    let mut start_byte = 0;
    let mut start_char = 0;

    for (char_pos, (byte_pos, _)) in text.char_indices().enumerate() {
        if char_pos > start_char && char_pos - start_char == max_chars {
            windows.push((start_char, &text[start_byte..byte_pos]));
            start_byte = byte_pos;
            start_char = char_pos;
        }
    }
    if start_byte < text.len() {
        windows.push((start_char, &text[start_byte..]));
    }

    windows
}
