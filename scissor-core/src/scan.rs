//! HTML document scanner
//!
//! Locates script elements and the two insertion points (`<head>` first
//! child, `</body>` close tag) without building a DOM. The scanner is
//! byte-oriented and understands just enough HTML to walk markup safely:
//! comments, doctypes, end tags, quoted attribute values, and raw-text
//! elements whose content may contain `<`.
//!
//! Offsets are byte offsets into the source string. Every recorded offset
//! sits next to an ASCII delimiter (`<` or `>`), so slicing at them is
//! always UTF-8 safe.

use memchr::{memchr, memchr_iter, memmem};
use std::ops::Range;

/// Elements whose content is raw text in HTML: markup inside them is not
/// parsed, so the scanner must skip to their matching close tag.
const RAW_TEXT_TAGS: &[&str] = &["script", "style", "textarea", "title", "xmp"];

/// MIME types recognized as plain JavaScript on a `type` attribute.
const JAVASCRIPT_TYPES: &[&str] = &["text/ecmascript-6", "application/javascript", "text/javascript"];

/// A script element found in the document, in source order.
#[derive(Debug)]
pub struct ScriptElement {
    /// Byte range of the whole element, from `<` of the start tag through
    /// the `>` of the close tag.
    pub span: Range<usize>,
    /// Raw text content between the tags, exactly as written.
    pub text: String,
    /// 1-based document line of the opening tag.
    pub start_tag_line: u32,
    /// Value of the `type` attribute, if present.
    pub type_attr: Option<String>,
    /// Whether a `src` attribute is present.
    pub has_src: bool,
}

impl ScriptElement {
    /// The candidate predicate: no `src` attribute, and either no `type`
    /// attribute or one of the recognized JavaScript types (exact match, so
    /// `type=""` and `type="module"` are both excluded).
    pub fn is_inline_javascript(&self) -> bool {
        if self.has_src {
            return false;
        }
        match &self.type_attr {
            None => true,
            Some(value) => JAVASCRIPT_TYPES.contains(&value.as_str()),
        }
    }
}

/// Script elements and insertion points discovered in one pass.
#[derive(Debug, Default)]
pub struct DocumentScan {
    pub scripts: Vec<ScriptElement>,
    /// Byte offset just after the `<head ...>` start tag, if present.
    pub head_content_start: Option<usize>,
    /// Byte offset of the first `</body` close tag, if present.
    pub body_content_end: Option<usize>,
}

/// Scan a document for script elements and insertion points.
pub fn scan(source: &str) -> DocumentScan {
    let bytes = source.as_bytes();
    let mut result = DocumentScan::default();
    let mut pos = 0usize;

    while pos < bytes.len() {
        let Some(offset) = memchr(b'<', &bytes[pos..]) else {
            break;
        };
        pos += offset;

        if bytes[pos..].starts_with(b"<!--") {
            pos = memmem::find(&bytes[pos + 4..], b"-->")
                .map(|i| pos + 4 + i + 3)
                .unwrap_or(bytes.len());
            continue;
        }

        if bytes[pos..].starts_with(b"</") {
            let (name, name_end) = read_tag_name(bytes, pos + 2);
            if name == "body" && result.body_content_end.is_none() {
                result.body_content_end = Some(pos);
            }
            pos = skip_past_tag_end(bytes, name_end);
            continue;
        }

        if bytes[pos..].starts_with(b"<!") || bytes[pos..].starts_with(b"<?") {
            pos = skip_past_tag_end(bytes, pos + 2);
            continue;
        }

        if !bytes.get(pos + 1).is_some_and(|b| b.is_ascii_alphabetic()) {
            // Stray `<` in text content.
            pos += 1;
            continue;
        }

        let tag_start = pos;
        let (name, name_end) = read_tag_name(bytes, pos + 1);
        let (attrs, tag_end) = read_attributes(bytes, name_end);

        if name == "script" {
            let (content_end, element_end) = find_raw_text_close(bytes, tag_end, &name);
            result.scripts.push(ScriptElement {
                span: tag_start..element_end,
                text: source[tag_end..content_end].to_string(),
                start_tag_line: line_at(bytes, tag_start),
                type_attr: attr_value(&attrs, "type"),
                has_src: attrs.iter().any(|(attr, _)| attr.as_str() == "src"),
            });
            pos = element_end;
        } else if RAW_TEXT_TAGS.contains(&name.as_str()) {
            let (_, element_end) = find_raw_text_close(bytes, tag_end, &name);
            pos = element_end;
        } else {
            if name == "head" && result.head_content_start.is_none() {
                result.head_content_start = Some(tag_end);
            }
            pos = tag_end;
        }
    }

    result
}

fn attr_value(attrs: &[(String, Option<String>)], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|(attr, _)| attr.as_str() == name)
        .map(|(_, value)| value.clone().unwrap_or_default())
}

/// 1-based line number of a byte offset.
fn line_at(bytes: &[u8], offset: usize) -> u32 {
    memchr_iter(b'\n', &bytes[..offset]).count() as u32 + 1
}

/// Read an ASCII tag name starting at `pos`. Returns the lowercased name and
/// the offset one past its last character.
fn read_tag_name(bytes: &[u8], pos: usize) -> (String, usize) {
    let mut end = pos;
    while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'-') {
        end += 1;
    }
    (
        String::from_utf8_lossy(&bytes[pos..end]).to_ascii_lowercase(),
        end,
    )
}

/// Advance past the closing `>` of a tag, honoring quoted attribute values.
fn skip_past_tag_end(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() {
        match bytes[pos] {
            b'>' => return pos + 1,
            quote @ (b'"' | b'\'') => {
                pos += 1;
                while pos < bytes.len() && bytes[pos] != quote {
                    pos += 1;
                }
                pos += 1;
            }
            _ => pos += 1,
        }
    }
    bytes.len()
}

/// Parse attributes from `pos` up to the end of the start tag. Returns the
/// attribute list (lowercased names) and the offset just past the `>`.
fn read_attributes(bytes: &[u8], mut pos: usize) -> (Vec<(String, Option<String>)>, usize) {
    let mut attrs = Vec::new();

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() {
            return (attrs, pos);
        }
        match bytes[pos] {
            b'>' => return (attrs, pos + 1),
            b'/' => pos += 1,
            _ => {
                let name_start = pos;
                while pos < bytes.len()
                    && !bytes[pos].is_ascii_whitespace()
                    && !matches!(bytes[pos], b'=' | b'>' | b'/')
                {
                    pos += 1;
                }
                let name = String::from_utf8_lossy(&bytes[name_start..pos]).to_ascii_lowercase();

                while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                    pos += 1;
                }
                let value = if pos < bytes.len() && bytes[pos] == b'=' {
                    pos += 1;
                    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                        pos += 1;
                    }
                    if pos < bytes.len() && matches!(bytes[pos], b'"' | b'\'') {
                        let quote = bytes[pos];
                        pos += 1;
                        let value_start = pos;
                        while pos < bytes.len() && bytes[pos] != quote {
                            pos += 1;
                        }
                        let value = String::from_utf8_lossy(&bytes[value_start..pos]).into_owned();
                        pos = (pos + 1).min(bytes.len());
                        Some(value)
                    } else {
                        let value_start = pos;
                        while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'>' {
                            pos += 1;
                        }
                        Some(String::from_utf8_lossy(&bytes[value_start..pos]).into_owned())
                    }
                } else {
                    None
                };

                if name.is_empty() {
                    // Malformed leading `=`; skip the byte to keep making progress.
                    pos += 1;
                } else {
                    attrs.push((name, value));
                }
            }
        }
    }
}

/// Find the close tag of a raw-text element. Returns `(content_end,
/// element_end)`. An unclosed element runs to the end of the document.
fn find_raw_text_close(bytes: &[u8], from: usize, name: &str) -> (usize, usize) {
    let mut pos = from;
    while pos < bytes.len() {
        let Some(offset) = memchr(b'<', &bytes[pos..]) else {
            break;
        };
        let at = pos + offset;
        let name_end = at + 2 + name.len();
        if name_end <= bytes.len()
            && bytes[at + 1] == b'/'
            && bytes[at + 2..name_end].eq_ignore_ascii_case(name.as_bytes())
            && bytes
                .get(name_end)
                .map_or(true, |&b| b.is_ascii_whitespace() || matches!(b, b'>' | b'/'))
        {
            return (at, skip_past_tag_end(bytes, name_end));
        }
        pos = at + 1;
    }
    (bytes.len(), bytes.len())
}
