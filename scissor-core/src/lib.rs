//! Scissor core library - splits inline HTML scripts into one external JavaScript file
//!
//! Inline JavaScript elements are extracted from a document in source order,
//! concatenated into a single payload, and replaced by one external
//! `<script>` reference. When any extracted fragment carries an embedded
//! base64 source-map comment, the mappings are re-projected into the
//! coordinate space of the concatenated file and a unified map is appended.

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Single-threaded, synchronous, single linear pass over the candidates
// - All accumulators are local to one invocation; no global mutable state
// - Fragments are visited and emitted in document order
// - Untouched markup is preserved byte-for-byte
// - Identical input yields byte-for-byte identical output

pub mod error;
pub mod fragment;
pub mod map;
pub mod rewrite;
pub mod scan;

pub use error::SplitError;

use map::{FragmentPlacement, MapMerger};
use rewrite::DocumentRewriter;

/// Options for one split invocation.
#[derive(Debug, Clone)]
pub struct SplitOptions {
    /// HTML document text.
    pub source: String,
    /// Value of the `src` attribute on the generated external script element.
    pub js_file_name: String,
    /// Place the reference as the first child of `<head>` with `defer`
    /// instead of as the last child of `<body>`.
    pub script_in_head: bool,
    /// Remove inline scripts without inserting any external reference.
    /// Takes precedence over `always_write_script`.
    pub only_split: bool,
    /// Insert the external reference even when no inline script was found.
    pub always_write_script: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        SplitOptions {
            source: String::new(),
            js_file_name: String::new(),
            script_in_head: true,
            only_split: false,
            always_write_script: false,
        }
    }
}

/// Result of one split invocation.
#[derive(Debug)]
pub struct SplitOutput {
    /// The rewritten document.
    pub html: String,
    /// The concatenated script payload, with a unified source-map comment
    /// appended when any fragment carried an embedded map.
    pub js: String,
}

/// Split a document's inline scripts into a single external JavaScript file.
///
/// Each inline JavaScript element is removed from the markup (together with
/// an immediately following whitespace-only text node), its text is trimmed
/// and semicolon-terminated, and any embedded source map is re-projected
/// into the coordinate space of the concatenated output. Unless
/// `only_split` is set, the rewritten HTML references the output file
/// through one external `<script>` element.
///
/// Fails when an embedded map does not decode, or when the placement policy
/// needs a `<head>` or `</body>` the document does not have.
pub fn split(options: &SplitOptions) -> Result<SplitOutput, SplitError> {
    let source = options.source.as_str();
    let scanned = scan::scan(source);

    let mut rewriter = DocumentRewriter::new();
    let mut contents: Vec<String> = Vec::new();
    let mut merger = MapMerger::new();
    let mut output_line_offset = 0u32;

    for script in scanned.scripts.iter().filter(|s| s.is_inline_javascript()) {
        let end = rewrite::extend_over_trailing_whitespace(source, script.span.end);
        rewriter.delete(script.span.start..end);

        let raw = script.text.as_str();
        let fragment = match map::extract_embedded_map(raw)? {
            Some((stripped, embedded)) => {
                // Leading geometry is measured on the raw text: trimming
                // removes exactly those lines and columns, and the map's
                // coordinates still refer to them.
                let offsets = fragment::leading_offsets(raw);
                merger.merge(
                    &embedded,
                    FragmentPlacement {
                        output_line_offset,
                        start_tag_line: script.start_tag_line,
                        leading_blank_lines: offsets.blank_lines,
                        first_line_column: offsets.first_line_column,
                    },
                )?;
                fragment::normalize(&stripped)
            }
            None => fragment::normalize(raw),
        };

        output_line_offset += fragment.line_count;
        contents.push(fragment.text);
    }

    if !options.only_split && (!contents.is_empty() || options.always_write_script) {
        let tag = rewrite::external_script_tag(&options.js_file_name, options.script_in_head);
        if options.script_in_head {
            let at = scanned.head_content_start.ok_or(SplitError::MissingHead)?;
            rewriter.insert(at, tag);
        } else {
            let at = scanned.body_content_end.ok_or(SplitError::MissingBody)?;
            rewriter.insert(at, tag);
        }
    }

    if let Some(comment) = merger.into_data_url_comment()? {
        contents.push(comment);
    }

    Ok(SplitOutput {
        html: rewriter.apply(source),
        js: contents.join("\n"),
    })
}
