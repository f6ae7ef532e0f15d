//! Module-mode class renaming.
//!
//! A [`NamingTemplate`] is a css-loader style `localIdentName` such as
//! `[local]--[hash:base64:5]`. Supported placeholders:
//!
//! - `[local]`: the class name as written
//! - `[name]`: file name without its last extension
//! - `[ext]`: the last extension, including the dot
//! - `[folder]`: name of the directory holding the file
//! - `[hash]`, `[hash:N]`, `[hash:<hex|base64>]`, `[hash:<hex|base64>:N]`
//!
//! The hash is SHA-256 over `salt`, the file path and the local name, so the
//! same file always yields the same identifiers and two files declaring the
//! same local name get different ones. Unknown placeholders are kept verbatim.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

use crate::compose::StyleLanguage;
use crate::parse::rules::scan_rules;

pub const DEFAULT_LOCAL_IDENT_NAME: &str = "[local]--[hash:base64:5]";

const DEFAULT_HASH_LENGTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HashEncoding {
    Hex,
    Base64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Local,
    Name,
    Ext,
    Folder,
    Hash {
        encoding: HashEncoding,
        length: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl Default for NamingTemplate {
    fn default() -> Self {
        Self::parse(DEFAULT_LOCAL_IDENT_NAME)
    }
}

impl fmt::Display for NamingTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl NamingTemplate {
    pub fn parse(raw: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = raw;

        while let Some(open) = rest.find('[') {
            let Some(close) = rest[open..].find(']').map(|c| open + c) else {
                break;
            };
            literal.push_str(&rest[..open]);
            match parse_placeholder(&rest[open + 1..close]) {
                Some(segment) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(segment);
                }
                None => literal.push_str(&rest[open..=close]),
            }
            rest = &rest[close + 1..];
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Generate the global identifier for `local` declared in `path`.
    pub fn render(&self, path: &str, local: &str, salt: &str) -> String {
        let file = Path::new(path);
        let mut digest: Option<Vec<u8>> = None;
        let mut out = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Local => out.push_str(local),
                Segment::Name => {
                    if let Some(stem) = file.file_stem() {
                        out.push_str(&stem.to_string_lossy());
                    }
                }
                Segment::Ext => {
                    if let Some(ext) = file.extension() {
                        out.push('.');
                        out.push_str(&ext.to_string_lossy());
                    }
                }
                Segment::Folder => {
                    if let Some(folder) = file.parent().and_then(Path::file_name) {
                        out.push_str(&folder.to_string_lossy());
                    }
                }
                Segment::Hash { encoding, length } => {
                    let bytes = digest.get_or_insert_with(|| ident_digest(path, local, salt));
                    let encoded = match encoding {
                        HashEncoding::Hex => hex_encode(bytes),
                        HashEncoding::Base64 => base64_url_encode(bytes),
                    };
                    out.push_str(&encoded[..(*length).min(encoded.len())]);
                }
            }
        }

        escape_identifier(&out)
    }
}

fn parse_placeholder(inner: &str) -> Option<Segment> {
    let mut parts = inner.split(':');
    let head = parts.next()?;
    let rest: Vec<&str> = parts.collect();
    match (head, rest.as_slice()) {
        ("local", []) => Some(Segment::Local),
        ("name", []) => Some(Segment::Name),
        ("ext", []) => Some(Segment::Ext),
        ("folder", []) => Some(Segment::Folder),
        ("hash", []) => Some(Segment::Hash {
            encoding: HashEncoding::Hex,
            length: DEFAULT_HASH_LENGTH,
        }),
        ("hash", [one]) => match one.parse::<usize>() {
            Ok(length) => Some(Segment::Hash {
                encoding: HashEncoding::Hex,
                length,
            }),
            Err(_) => Some(Segment::Hash {
                encoding: parse_encoding(one)?,
                length: DEFAULT_HASH_LENGTH,
            }),
        },
        ("hash", [encoding, length]) => Some(Segment::Hash {
            encoding: parse_encoding(encoding)?,
            length: length.parse().ok()?,
        }),
        _ => None,
    }
}

fn parse_encoding(name: &str) -> Option<HashEncoding> {
    match name {
        "hex" => Some(HashEncoding::Hex),
        "base64" => Some(HashEncoding::Base64),
        _ => None,
    }
}

fn ident_digest(path: &str, local: &str, salt: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(path.replace('\\', "/").as_bytes());
    hasher.update([0u8]);
    hasher.update(local.as_bytes());
    hasher.finalize().to_vec()
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn base64_url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Make a rendered name usable as a CSS class: characters outside
/// `[A-Za-z0-9_-]` (and non-ASCII) become `-`, and names that would start
/// with a digit or `--` get a leading `_`.
fn escape_identifier(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || !c.is_ascii() {
                c
            } else {
                '-'
            }
        })
        .collect();

    let bytes = out.as_bytes();
    let needs_prefix = match bytes {
        [first, ..] if first.is_ascii_digit() => true,
        [b'-', second, ..] if second.is_ascii_digit() || *second == b'-' => true,
        _ => false,
    };
    if needs_prefix {
        out.insert(0, '_');
    }
    out
}

/// Class names declared by a selector, skipping anything inside `:global(...)`.
pub fn local_class_names(selector: &str) -> Vec<String> {
    let bytes = selector.as_bytes();
    let mut names = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' | b'\'' => i = skip_string(bytes, i),
            b'[' => {
                i = bytes[i..]
                    .iter()
                    .position(|&b| b == b']')
                    .map_or(bytes.len(), |p| i + p + 1);
            }
            b':' if selector[i..].starts_with(":global(") => {
                i = skip_group(bytes, i + ":global(".len());
            }
            b'.' => {
                let start = i + 1;
                let end = ident_end(bytes, start);
                if end > start && starts_identifier(&bytes[start..end]) {
                    let name = &selector[start..end];
                    if !names.iter().any(|n: &String| n == name) {
                        names.push(name.to_string());
                    }
                }
                i = end.max(start);
            }
            _ => i += 1,
        }
    }
    names
}

fn ident_end(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len()
        && (bytes[end].is_ascii_alphanumeric()
            || bytes[end] == b'_'
            || bytes[end] == b'-'
            || bytes[end] >= 0x80)
    {
        end += 1;
    }
    end
}

fn starts_identifier(ident: &[u8]) -> bool {
    match ident {
        [first, ..] if first.is_ascii_digit() => false,
        [b'-', second, ..] => !second.is_ascii_digit(),
        [b'-'] => false,
        _ => true,
    }
}

fn skip_string(bytes: &[u8], open: usize) -> usize {
    let quote = bytes[open];
    let mut i = open + 1;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == quote {
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

fn skip_group(bytes: &[u8], from: usize) -> usize {
    let mut depth = 1usize;
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

/// Map every class declared in `content` to its generated identifier.
///
/// Works on the source as written: classes produced only by preprocessor
/// expansion (e.g. Less `&-suffix`) are not visible here.
pub fn class_exports(
    content: &str,
    language: StyleLanguage,
    path: &str,
    template: &NamingTemplate,
    salt: &str,
) -> BTreeMap<String, String> {
    let mut exports = BTreeMap::new();
    for rule in scan_rules(content, language) {
        for local in local_class_names(&rule.selector) {
            exports
                .entry(local.clone())
                .or_insert_with(|| template.render(path, &local, salt));
        }
    }
    exports
}
