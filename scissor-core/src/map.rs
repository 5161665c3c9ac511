//! Embedded source-map decoding and re-projection
//!
//! Inline scripts produced by build tools may end with a base64 data-URL
//! `sourceMappingURL` comment. This module detects and strips that comment,
//! decodes the map, and re-projects each mapping from the coordinate space
//! of the inline script (which is relative to the HTML document) into the
//! coordinate space of the concatenated output file.

use crate::error::SplitError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use regex::Regex;
use sourcemap::{SourceMap, SourceMapBuilder};
use std::sync::OnceLock;

const SOURCE_MAP_URL_PREFIX: &str =
    "//# sourceMappingURL=data:application/json;charset=utf8;base64,";

/// The embedded comment grammar, anchored at the end of the fragment text:
/// a newline, the data-URL comment, and a single trailing newline.
fn embedded_map_comment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\n//# sourceMappingURL=data:application/json;charset=utf8;base64,([A-Za-z0-9+/=]+)\n$",
        )
        .unwrap()
    })
}

/// Detect and strip an embedded source-map comment from a fragment's raw text.
///
/// Returns the text with the comment removed plus the decoded map, or `None`
/// when the fragment carries no embedded map. A comment that matches the
/// grammar but does not decode to a valid map is a hard error; a partially
/// recovered map would silently lie about positions.
pub fn extract_embedded_map(raw: &str) -> Result<Option<(String, SourceMap)>, SplitError> {
    let Some(captures) = embedded_map_comment().captures(raw) else {
        return Ok(None);
    };
    let comment = captures.get(0).unwrap();
    let payload = BASE64.decode(captures[1].as_bytes())?;
    let map = SourceMap::from_slice(&payload)?;
    Ok(Some((raw[..comment.start()].to_string(), map)))
}

/// Coordinate context for re-projecting one fragment's mappings.
#[derive(Debug, Clone, Copy)]
pub struct FragmentPlacement {
    /// Lines already emitted to the output before this fragment.
    pub output_line_offset: u32,
    /// 1-based document line of the fragment's `<script` start tag.
    pub start_tag_line: u32,
    /// Blank lines at the start of the raw fragment text, removed by trimming.
    pub leading_blank_lines: u32,
    /// Leading whitespace removed from the first retained line.
    pub first_line_column: u32,
}

/// Accumulates re-projected mappings from every fragment, in visitation
/// order, into one unified map. No sorting and no deduplication; fragment
/// order already yields monotonically increasing generated lines.
pub struct MapMerger {
    builder: SourceMapBuilder,
    has_mappings: bool,
}

impl MapMerger {
    pub fn new() -> Self {
        MapMerger {
            builder: SourceMapBuilder::new(None),
            has_mappings: false,
        }
    }

    /// Re-project every mapping of `map` into the output coordinate space.
    ///
    /// The embedded map's generated positions are relative to the document:
    /// its line N is document line N, and columns on the first content line
    /// include the markup indentation. Re-projection rebases lines onto the
    /// concatenated output, correcting for the start tag's document line and
    /// for blank lines removed by trimming, and subtracts the first retained
    /// line's indentation from that line's columns.
    pub fn merge(&mut self, map: &SourceMap, placement: FragmentPlacement) -> Result<(), SplitError> {
        for token in map.tokens() {
            // Token lines are 0-based document lines, start_tag_line is
            // 1-based, so equality means "the document line directly after
            // the start tag" - the line where trimmed content begins when
            // the tag sits on its own line.
            let document_line = i64::from(token.get_dst_line());
            let first_content_line = document_line == i64::from(placement.start_tag_line);

            let dst_line = i64::from(placement.output_line_offset)
                - i64::from(placement.leading_blank_lines)
                + document_line
                - i64::from(placement.start_tag_line)
                + 1;
            let dst_col = i64::from(token.get_dst_col())
                - if first_content_line {
                    i64::from(placement.first_line_column)
                } else {
                    0
                };

            let (dst_line, dst_col) = checked_position(dst_line, dst_col)?;
            self.builder.add(
                dst_line,
                dst_col,
                token.get_src_line(),
                token.get_src_col(),
                token.get_source(),
                token.get_name(),
            );
            self.has_mappings = true;
        }
        Ok(())
    }

    /// Encode the unified map as a trailing data-URL comment (blank line
    /// before, newline after), or `None` when no fragment contributed any
    /// mappings.
    pub fn into_data_url_comment(self) -> Result<Option<String>, SplitError> {
        if !self.has_mappings {
            return Ok(None);
        }
        let map = self.builder.into_sourcemap();
        let mut encoded = Vec::new();
        map.to_writer(&mut encoded)?;
        Ok(Some(format!(
            "\n{}{}\n",
            SOURCE_MAP_URL_PREFIX,
            BASE64.encode(&encoded)
        )))
    }
}

impl Default for MapMerger {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject mappings that re-project to before the start of the output file.
fn checked_position(line: i64, column: i64) -> Result<(u32, u32), SplitError> {
    let out_of_range = SplitError::MappingOutOfRange { line, column };
    match (u32::try_from(line), u32::try_from(column)) {
        (Ok(line), Ok(column)) => Ok((line, column)),
        _ => Err(out_of_range),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encode a map built by `build` as an embedded data-URL comment.
    fn embedded_comment(build: impl FnOnce(&mut SourceMapBuilder)) -> String {
        let mut builder = SourceMapBuilder::new(None);
        build(&mut builder);
        let mut encoded = Vec::new();
        builder.into_sourcemap().to_writer(&mut encoded).unwrap();
        format!("\n{}{}\n", SOURCE_MAP_URL_PREFIX, BASE64.encode(&encoded))
    }

    #[test]
    fn test_extract_returns_none_without_comment() {
        let result = extract_embedded_map("var x = 1;\n").unwrap();
        assert!(result.is_none(), "Plain fragment should have no map");
    }

    #[test]
    fn test_extract_strips_comment_and_decodes_map() {
        let comment = embedded_comment(|b| {
            b.add(2, 0, 0, 0, Some("x.js"), None);
        });
        let raw = format!("\nvar x = 1;{comment}");

        let (stripped, map) = extract_embedded_map(&raw).unwrap().unwrap();
        assert_eq!(stripped, "\nvar x = 1;");
        assert_eq!(map.get_token_count(), 1);
    }

    #[test]
    fn test_extract_requires_comment_at_end() {
        let comment = embedded_comment(|b| {
            b.add(0, 0, 0, 0, Some("x.js"), None);
        });
        let raw = format!("var x = 1;{comment}var y = 2;\n");
        let result = extract_embedded_map(&raw).unwrap();
        assert!(result.is_none(), "Comment in the middle is not an embedded map");
    }

    #[test]
    fn test_extract_rejects_undecodable_payload() {
        // Valid base64 charset, not a JSON source map.
        let payload = BASE64.encode(b"not a source map");
        let raw = format!("var x = 1;\n{SOURCE_MAP_URL_PREFIX}{payload}\n");
        let result = extract_embedded_map(&raw);
        assert!(matches!(result, Err(SplitError::SourceMap(_))));
    }

    #[test]
    fn test_extract_rejects_truncated_base64() {
        let raw = format!("var x = 1;\n{SOURCE_MAP_URL_PREFIX}A\n");
        let result = extract_embedded_map(&raw);
        assert!(matches!(result, Err(SplitError::MapEncoding(_))));
    }

    #[test]
    fn test_merge_rebases_lines_and_first_line_columns() {
        // Fragment whose <script> tag sits on document line 10; content
        // starts on line 11 with 4 columns of markup indentation.
        let mut builder = SourceMapBuilder::new(None);
        builder.add(10, 7, 0, 0, Some("a.js"), Some("alpha"));
        builder.add(11, 7, 1, 2, Some("a.js"), None);
        let embedded = builder.into_sourcemap();

        let mut merger = MapMerger::new();
        merger
            .merge(
                &embedded,
                FragmentPlacement {
                    output_line_offset: 3,
                    start_tag_line: 10,
                    leading_blank_lines: 0,
                    first_line_column: 4,
                },
            )
            .unwrap();
        assert!(merger.has_mappings);

        let unified = merger.builder.into_sourcemap();
        let tokens: Vec<_> = unified
            .tokens()
            .map(|t| (t.get_dst_line(), t.get_dst_col()))
            .collect();
        // First content line: rebased to offset + 1, indentation removed.
        // Second line: indentation kept.
        assert_eq!(tokens, vec![(4, 3), (5, 7)]);

        let first = unified.tokens().next().unwrap();
        assert_eq!(first.get_source(), Some("a.js"));
        assert_eq!(first.get_name(), Some("alpha"));
        assert_eq!((first.get_src_line(), first.get_src_col()), (0, 0));
    }

    #[test]
    fn test_merge_subtracts_leading_blank_lines() {
        // Raw content "\nvar x = 1;\n" after a tag on line 2: one leading
        // blank line, mapping on document line 3 (0-based 2).
        let mut builder = SourceMapBuilder::new(None);
        builder.add(2, 0, 0, 0, Some("x.js"), None);
        let embedded = builder.into_sourcemap();

        let mut merger = MapMerger::new();
        merger
            .merge(
                &embedded,
                FragmentPlacement {
                    output_line_offset: 0,
                    start_tag_line: 2,
                    leading_blank_lines: 1,
                    first_line_column: 0,
                },
            )
            .unwrap();

        let unified = merger.builder.into_sourcemap();
        let token = unified.tokens().next().unwrap();
        assert_eq!((token.get_dst_line(), token.get_dst_col()), (0, 0));
    }

    #[test]
    fn test_merge_rejects_positions_before_output_start() {
        let mut builder = SourceMapBuilder::new(None);
        builder.add(0, 0, 0, 0, Some("x.js"), None);
        let embedded = builder.into_sourcemap();

        let mut merger = MapMerger::new();
        let result = merger.merge(
            &embedded,
            FragmentPlacement {
                output_line_offset: 0,
                start_tag_line: 5,
                leading_blank_lines: 0,
                first_line_column: 0,
            },
        );
        assert!(matches!(
            result,
            Err(SplitError::MappingOutOfRange { .. })
        ));
    }

    #[test]
    fn test_empty_merger_emits_no_comment() {
        let comment = MapMerger::new().into_data_url_comment().unwrap();
        assert!(comment.is_none());
    }
}
