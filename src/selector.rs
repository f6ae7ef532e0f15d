use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The deep combinator every dialect is rewritten to.
pub const DEEP_COMBINATOR: &str = "::v-deep";

/// Regex replacement for the legacy `:deep(arg)` pattern.
const DEEP_REPLACEMENT: &str = "::v-deep ${1}";

const DEEP_CALL: &str = ":deep(";
const LEGACY_DEEP: &str = "/deep/";

/// Legacy pattern: the argument ends at the first `)`, whatever it closes.
static FIRST_CLOSE_DEEP_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":deep\(([^)]+)\)").unwrap());

/// How the argument of `:deep(...)` is delimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgumentCapture {
    /// Scan for the matching `)`, honoring nested parentheses and quoted strings.
    #[default]
    Balanced,
    /// Stop at the first `)`. Compatible with older toolchains, but truncates
    /// arguments such as `.a:not(.b)`.
    FirstClose,
}

/// Result of normalizing one selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub selector: String,
    /// Whether `selector` differs from the input.
    pub changed: bool,
}

/// A style rule as seen by the normalizer: its selector text and where that
/// text lives in the owning stylesheet. The declaration block is never touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    pub selector: String,
    /// Byte offset of the selector start, inclusive.
    pub start: usize,
    /// Byte offset of the selector end, exclusive.
    pub end: usize,
}

impl StyleRule {
    /// Normalize the selector and store the result only when it changed.
    /// Returns whether the rule was modified.
    pub fn normalize_in_place(&mut self, capture: ArgumentCapture) -> bool {
        let normalized = normalize_with(&self.selector, capture);
        if normalized.changed {
            self.selector = normalized.selector;
        }
        normalized.changed
    }
}

/// Normalize with the default (balanced) argument capture.
pub fn normalize(selector: &str) -> Normalized {
    normalize_with(selector, ArgumentCapture::Balanced)
}

/// Rewrite every `:deep(arg)` to `::v-deep arg` and every `/deep/` to
/// `::v-deep`.
///
/// Both rewrites are repeated until nothing changes: removing the closing `)`
/// of one argument can splice a fresh `:deep(` together (`:deep(.a:)deep(.b)`),
/// and nested calls only surface once the outer call is gone. Each `:deep(`
/// rewrite removes one `(`, so the loop is bounded by the paren count.
pub fn normalize_with(selector: &str, capture: ArgumentCapture) -> Normalized {
    if !selector.contains("deep") {
        return Normalized {
            selector: selector.to_string(),
            changed: false,
        };
    }

    let mut current = selector.to_string();
    loop {
        let calls = rewrite_deep_calls(&current, capture);
        let next = rewrite_legacy_combinator(&calls);
        if next == current {
            break;
        }
        current = next;
    }

    Normalized {
        changed: current != selector,
        selector: current,
    }
}

fn rewrite_deep_calls(input: &str, capture: ArgumentCapture) -> Cow<'_, str> {
    match capture {
        ArgumentCapture::Balanced => rewrite_deep_calls_balanced(input),
        ArgumentCapture::FirstClose => {
            FIRST_CLOSE_DEEP_CALL.replace_all(input, DEEP_REPLACEMENT)
        }
    }
}

fn rewrite_deep_calls_balanced(input: &str) -> Cow<'_, str> {
    let mut out = String::new();
    let mut cursor = 0;
    let mut search_from = 0;

    while let Some(found) = input[search_from..].find(DEEP_CALL) {
        let start = search_from + found;
        let arg_start = start + DEEP_CALL.len();
        match matching_paren(input.as_bytes(), arg_start) {
            Some(close) if close > arg_start => {
                out.push_str(&input[cursor..start]);
                out.push_str(DEEP_COMBINATOR);
                out.push(' ');
                out.push_str(&input[arg_start..close]);
                cursor = close + 1;
                search_from = cursor;
            }
            // Empty or unterminated argument: leave it as written.
            _ => search_from = arg_start,
        }
    }

    if cursor == 0 {
        return Cow::Borrowed(input);
    }
    out.push_str(&input[cursor..]);
    Cow::Owned(out)
}

/// Find the `)` closing a group whose contents start at `from`.
fn matching_paren(bytes: &[u8], from: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut quote: Option<u8> = None;
    let mut i = from;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'\\' => i += 1,
                b'"' | b'\'' => quote = Some(b),
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

fn rewrite_legacy_combinator(input: &str) -> String {
    if input.contains(LEGACY_DEEP) {
        input.replace(LEGACY_DEEP, DEEP_COMBINATOR)
    } else {
        input.to_string()
    }
}
