use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::report::Location;

/// A stylesheet or component file loaded into memory, with a line index for
/// reporting positions.
#[derive(Debug)]
pub struct SourceText {
    pub path: PathBuf,
    pub content: String,
    /// Byte offsets where each line starts (0-indexed into content)
    line_starts: Vec<usize>,
}

impl SourceText {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Self::from_string(path.to_path_buf(), content))
    }

    /// Create a SourceText from a string, using the given path for display purposes.
    pub fn from_string(path: PathBuf, content: String) -> Self {
        let line_starts = compute_line_starts(content.as_bytes());
        Self {
            path,
            content,
            line_starts,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().replace('\\', "/")
    }

    /// Convert a byte offset into a (1-indexed line, 0-indexed column) pair.
    /// Column is a character offset (UTF-8 codepoint count) within the line.
    pub fn offset_to_line_col(&self, byte_offset: usize) -> (usize, usize) {
        let line_idx = match self.line_starts.binary_search(&byte_offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let line = &self.content[self.line_starts[line_idx]..byte_offset];
        (line_idx + 1, line.chars().count())
    }

    pub fn location(&self, byte_offset: usize) -> Location {
        let (line, column) = self.offset_to_line_col(byte_offset);
        Location { line, column }
    }
}

fn compute_line_starts(content: &[u8]) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, &byte) in content.iter().enumerate() {
        if byte == b'\n' && i + 1 < content.len() {
            starts.push(i + 1);
        }
    }
    starts
}
