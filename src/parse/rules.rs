//! Locates style-rule selectors in a stylesheet without parsing its grammar.
//!
//! A selector is the prelude text in front of a `{` at paren depth zero,
//! starting after the previous `{`, `}` or `;`. Preludes starting with `@`
//! (media queries, font faces, Less detached rulesets) are not style rules,
//! though rules nested inside their blocks are. Comments, quoted strings and
//! Less `@{...}` interpolations are skipped so their braces do not count.

use crate::compose::StyleLanguage;
use crate::selector::StyleRule;

pub fn scan_rules(text: &str, language: StyleLanguage) -> Vec<StyleRule> {
    let bytes = text.as_bytes();
    let less = language == StyleLanguage::Less;
    let mut rules = Vec::new();
    let mut prelude_start: Option<usize> = None;
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = text[i + 2..].find("*/").map_or(bytes.len(), |p| i + 2 + p + 2);
                continue;
            }
            b'/' if less && depth == 0 && bytes.get(i + 1) == Some(&b'/') => {
                i = text[i..].find('\n').map_or(bytes.len(), |p| i + p);
                continue;
            }
            b'"' | b'\'' => {
                prelude_start.get_or_insert(i);
                i = skip_quoted(bytes, i);
                continue;
            }
            b'\\' => {
                prelude_start.get_or_insert(i);
                i += 2;
                continue;
            }
            b'@' if less && bytes.get(i + 1) == Some(&b'{') => {
                prelude_start.get_or_insert(i);
                i = text[i..].find('}').map_or(bytes.len(), |p| i + p + 1);
                continue;
            }
            b'(' => {
                prelude_start.get_or_insert(i);
                depth += 1;
            }
            b')' => {
                prelude_start.get_or_insert(i);
                depth = depth.saturating_sub(1);
            }
            b'{' if depth == 0 => {
                if let Some(start) = prelude_start.take() {
                    let prelude = text[start..i].trim_end();
                    if !prelude.is_empty() && !prelude.starts_with('@') {
                        rules.push(StyleRule {
                            selector: prelude.to_string(),
                            start,
                            end: start + prelude.len(),
                        });
                    }
                }
            }
            b'}' | b';' if depth == 0 => prelude_start = None,
            _ if b.is_ascii_whitespace() => {}
            _ => {
                prelude_start.get_or_insert(i);
            }
        }
        i += 1;
    }

    rules
}

fn skip_quoted(bytes: &[u8], open: usize) -> usize {
    let quote = bytes[open];
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            b'\n' => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}
