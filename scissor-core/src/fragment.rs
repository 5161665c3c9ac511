//! Fragment normalization
//!
//! Turns the raw text of one inline script into the form it takes in the
//! concatenated output: whitespace trimmed and a trailing semicolon added
//! when the last line could otherwise merge with the next fragment under
//! automatic semicolon insertion.

use regex::Regex;
use std::sync::OnceLock;

/// Matches last lines that are already safe to concatenate: a line comment
/// anywhere on the line, a trailing semicolon, or a trailing block-comment
/// close. Anything else gets a `;` appended. This is a lexical heuristic on
/// the last line only; a multi-line template literal whose last line happens
/// to end in `;` is left alone even though the `;` sits inside the literal.
fn terminated_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"//|;\s*$|\*/\s*$").unwrap())
}

/// A normalized inline script fragment.
#[derive(Debug)]
pub struct Fragment {
    /// Final text as it will appear in the concatenated output.
    pub text: String,
    /// Number of newline-delimited lines in the trimmed text. Appending the
    /// terminating `;` does not change it.
    pub line_count: u32,
}

/// Leading geometry of a fragment's raw text, measured before any trimming
/// or comment stripping: the number of blank lines before the first line
/// with content, and the length of that line's leading whitespace run.
///
/// Both are zero for an entirely blank fragment.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeadingOffsets {
    pub blank_lines: u32,
    pub first_line_column: u32,
}

/// Measure the leading blank lines and first-line indentation of raw text.
pub fn leading_offsets(raw: &str) -> LeadingOffsets {
    let mut offsets = LeadingOffsets::default();
    for line in raw.split('\n') {
        if line.trim().is_empty() {
            offsets.blank_lines += 1;
        } else {
            offsets.first_line_column =
                line.chars().take_while(|c| c.is_whitespace()).count() as u32;
            break;
        }
    }
    offsets
}

/// Trim a fragment and apply the statement-termination policy.
///
/// An entirely blank fragment normalizes to `";"` with one line.
pub fn normalize(text: &str) -> Fragment {
    let trimmed = text.trim();
    let line_count = trimmed.split('\n').count() as u32;
    let last_line = trimmed.rsplit('\n').next().unwrap_or(trimmed);

    let mut text = trimmed.to_string();
    if !terminated_line().is_match(last_line) {
        text.push(';');
    }

    Fragment { text, line_count }
}
