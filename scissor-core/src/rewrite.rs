//! Document rewriting
//!
//! The rewriter never re-serializes the document. It records byte-range
//! edits (script removals and at most one insertion) against the original
//! source and applies them in a single pass, leaving all other markup
//! byte-for-byte intact.

use memchr::memchr;
use std::ops::Range;

/// One splice against the source document.
#[derive(Debug)]
struct Edit {
    range: Range<usize>,
    replacement: String,
}

/// Collects edits in source order and applies them once.
#[derive(Debug, Default)]
pub struct DocumentRewriter {
    edits: Vec<Edit>,
}

impl DocumentRewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a byte range from the document.
    pub fn delete(&mut self, range: Range<usize>) {
        self.edits.push(Edit {
            range,
            replacement: String::new(),
        });
    }

    /// Insert markup at a byte offset.
    pub fn insert(&mut self, at: usize, markup: String) {
        self.edits.push(Edit {
            range: at..at,
            replacement: markup,
        });
    }

    /// Apply all edits. Edits must not overlap; they are sorted by start
    /// offset so the insertion point may be recorded out of order.
    pub fn apply(mut self, source: &str) -> String {
        self.edits.sort_by_key(|edit| (edit.range.start, edit.range.end));

        let mut output = String::with_capacity(source.len());
        let mut cursor = 0;
        for edit in &self.edits {
            debug_assert!(edit.range.start >= cursor, "overlapping edits");
            output.push_str(&source[cursor..edit.range.start]);
            output.push_str(&edit.replacement);
            cursor = edit.range.end;
        }
        output.push_str(&source[cursor..]);
        output
    }
}

/// Extend a deleted element's range over an immediately following text node
/// that is nothing but whitespace, so removals do not leave blank lines
/// behind. The text node runs to the next `<` or to the end of the document;
/// an immediately following tag or comment stops the extension.
pub fn extend_over_trailing_whitespace(source: &str, end: usize) -> usize {
    let rest = &source.as_bytes()[end..];
    let text_len = memchr(b'<', rest).unwrap_or(rest.len());
    if text_len > 0 && source[end..end + text_len].chars().all(char::is_whitespace) {
        end + text_len
    } else {
        end
    }
}

/// Render the external script reference element. `defer` is set for head
/// placement so execution order matches the scripts' original position in
/// the body.
pub fn external_script_tag(js_file_name: &str, defer: bool) -> String {
    let src = escape_attribute(js_file_name);
    if defer {
        format!(r#"<script src="{src}" defer></script>"#)
    } else {
        format!(r#"<script src="{src}"></script>"#)
    }
}

/// Minimal escaping for a double-quoted attribute value.
fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_deletes_and_inserts() {
        let source = "abcdef";
        let mut rewriter = DocumentRewriter::new();
        rewriter.delete(2..4);
        rewriter.insert(0, "<".to_string());
        assert_eq!(rewriter.apply(source), "<abef");
    }

    #[test]
    fn test_apply_without_edits_is_identity() {
        assert_eq!(DocumentRewriter::new().apply("unchanged"), "unchanged");
    }

    #[test]
    fn test_extends_over_whitespace_text_node() {
        let source = "a</script>\n  <p>";
        assert_eq!(extend_over_trailing_whitespace(source, 10), 13);
    }

    #[test]
    fn test_does_not_extend_over_text_with_content() {
        let source = "a</script>\n x <p>";
        assert_eq!(extend_over_trailing_whitespace(source, 10), 10);
    }

    #[test]
    fn test_does_not_extend_when_tag_follows_directly() {
        let source = "a</script><p>";
        assert_eq!(extend_over_trailing_whitespace(source, 10), 10);
    }

    #[test]
    fn test_extends_to_end_of_document() {
        let source = "a</script>\n";
        assert_eq!(extend_over_trailing_whitespace(source, 10), 11);
    }

    #[test]
    fn test_external_script_tag_escapes_src() {
        let tag = external_script_tag(r#"a"&b.js"#, false);
        assert_eq!(tag, r#"<script src="a&quot;&amp;b.js"></script>"#);
    }

    #[test]
    fn test_external_script_tag_defer() {
        assert_eq!(
            external_script_tag("out.js", true),
            r#"<script src="out.js" defer></script>"#
        );
    }
}
