//! `<style>` blocks of single-file components.

use crate::compose::{Query, StyleLanguage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleBlock {
    /// Position among the file's `<style>` blocks.
    pub index: usize,
    /// Attributes in source order; valueless attributes map to `None`.
    pub attrs: Vec<(String, Option<String>)>,
    /// Byte offset of the block content start, inclusive.
    pub content_start: usize,
    /// Byte offset of the block content end, exclusive.
    pub content_end: usize,
}

impl StyleBlock {
    pub fn attr(&self, name: &str) -> Option<Option<&str>> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_deref())
    }

    pub fn lang(&self) -> Option<&str> {
        self.attr("lang").flatten()
    }

    /// Stylesheet family of the block content; `None` for languages without
    /// a stage chain (scss, stylus, ...).
    pub fn language(&self) -> Option<StyleLanguage> {
        match self.lang() {
            None | Some("") => Some(StyleLanguage::Css),
            Some(lang) => StyleLanguage::from_name(lang),
        }
    }

    /// The resource query a component loader attaches to this block.
    pub fn query(&self) -> Query {
        let mut query = Query::default()
            .with("vue", "")
            .with("type", "style")
            .with("index", &self.index.to_string());
        if let Some(lang) = self.lang() {
            query = query.with("lang", lang);
        }
        if self.attr("scoped").is_some() {
            query = query.with("scoped", "");
        }
        if let Some(module) = self.attr("module") {
            query = query.with("module", module.unwrap_or(""));
        }
        query
    }

    pub fn content<'t>(&self, text: &'t str) -> &'t str {
        &text[self.content_start..self.content_end]
    }
}

/// Find every top-level `<style>` block. Blocks without a closing tag are
/// ignored; a self-closing `<style src="..."/>` yields an empty block.
pub fn style_blocks(text: &str) -> Vec<StyleBlock> {
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(found) = text[cursor..].find("<style") {
        let tag_start = cursor + found;
        let after_name = tag_start + "<style".len();
        cursor = after_name;

        match text.as_bytes().get(after_name) {
            Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/' => {}
            _ => continue,
        }

        let Some((attrs, tag_end, self_closing)) = parse_open_tag(text, after_name) else {
            break;
        };

        let (content_start, content_end, next) = if self_closing {
            (tag_end, tag_end, tag_end)
        } else {
            match text[tag_end..].find("</style>") {
                Some(close) => (tag_end, tag_end + close, tag_end + close + "</style>".len()),
                None => break,
            }
        };

        blocks.push(StyleBlock {
            index: blocks.len(),
            attrs,
            content_start,
            content_end,
        });
        cursor = next;
    }

    blocks
}

type OpenTag = (Vec<(String, Option<String>)>, usize, bool);

/// Parse attributes up to the closing `>`. Returns the attributes, the
/// offset just past `>`, and whether the tag was self-closing.
fn parse_open_tag(text: &str, from: usize) -> Option<OpenTag> {
    let bytes = text.as_bytes();
    let mut attrs = Vec::new();
    let mut i = from;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i)? {
            b'>' => return Some((attrs, i + 1, false)),
            b'/' if bytes.get(i + 1) == Some(&b'>') => return Some((attrs, i + 2, true)),
            _ => {}
        }

        let name_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        if i == name_start {
            // Stray `/` not followed by `>`.
            i += 1;
            continue;
        }
        let name = text[name_start..i].to_string();

        if bytes.get(i) != Some(&b'=') {
            attrs.push((name, None));
            continue;
        }
        i += 1;

        let value = match bytes.get(i)? {
            q @ (b'"' | b'\'') => {
                let close = text[i + 1..].find(*q as char)? + i + 1;
                let value = text[i + 1..close].to_string();
                i = close + 1;
                value
            }
            _ => {
                let start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    i += 1;
                }
                text[start..i].to_string()
            }
        };
        attrs.push((name, Some(value)));
    }
}
