use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    /// 1-indexed line number
    pub line: usize,
    /// 0-indexed column (character offset within the line)
    pub column: usize,
}

/// A selector the normalizer rewrote (or would rewrite).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rewrite {
    pub path: String,
    pub location: Location,
    pub original: String,
    pub normalized: String,
    /// Whether the rewrite was written back to disk.
    pub applied: bool,
}

impl Rewrite {
    pub fn sort_key(&self) -> (&str, usize, usize) {
        (&self.path, self.location.line, self.location.column)
    }
}

impl fmt::Display for Rewrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.applied { "rewrote" } else { "deep selector" };
        write!(
            f,
            "{}:{}:{}: {}: `{}` -> `{}`",
            self.path,
            self.location.line,
            self.location.column,
            verb,
            self.original,
            self.normalized,
        )
    }
}
