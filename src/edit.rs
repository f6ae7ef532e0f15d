/// Replace the byte range `[start..end)` of a file with `replacement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Byte offset, inclusive.
    pub start: usize,
    /// Byte offset, exclusive.
    pub end: usize,
    pub replacement: String,
}

/// Edits sorted by start offset with overlaps removed.
///
/// When two edits overlap the one starting first is kept; for equal starts,
/// the one that was pushed first wins.
#[derive(Debug, Default)]
pub struct EditSet {
    edits: Vec<Edit>,
}

impl EditSet {
    pub fn from_vec(mut raw: Vec<Edit>) -> Self {
        // Stable sort keeps insertion order among equal starts.
        raw.sort_by_key(|e| e.start);

        let mut accepted: Vec<Edit> = Vec::with_capacity(raw.len());
        for edit in raw {
            if accepted.last().is_some_and(|last| edit.start < last.end) {
                continue;
            }
            accepted.push(edit);
        }
        Self { edits: accepted }
    }

    /// Apply every edit in one pass over `source`.
    pub fn apply(&self, source: &str) -> String {
        let mut out = String::with_capacity(source.len());
        let mut cursor = 0;
        for edit in &self.edits {
            out.push_str(&source[cursor..edit.start]);
            out.push_str(&edit.replacement);
            cursor = edit.end;
        }
        out.push_str(&source[cursor..]);
        out
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }
}
