//! Formatting helpers for combined test output

/// Character used for the rule lines around a section header
pub const HEADER_RULE_CHAR: char = '#';

/// Build a labeled section header.
///
/// The label sits between two rule lines of `width` characters and ends with
/// a colon, so concatenated sections stay readable in a terminal or report:
///
/// ```text
/// ##########
/// Redirected output foo.processor.0:
/// ##########
/// ```
#[must_use]
pub fn output_header(label: &str, width: usize) -> String {
    let rule: String = std::iter::repeat_n(HEADER_RULE_CHAR, width).collect();
    format!("{rule}\n{label}:\n{rule}\n")
}

/// Ensure non-empty text ends with exactly the newlines it already had, plus
/// one if it had none.
#[must_use]
pub fn ensure_trailing_newline(mut text: String) -> String {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
