//! Output sanitizer: merges redirected output files into the combined output
//! and repairs it so it can always be serialized into a report.
//!
//! Every problem found here is recovered in place and reported through the
//! [`StatusSink`]; nothing in this module returns an error.

use std::fs::File;
use std::path::{Path, PathBuf};
use testrun_utils::format::output_header;

use crate::job::{StatusKind, StatusSink};
use crate::stream::read_output;

/// Status message when a redirected output file cannot be opened
pub const FILE_TIMEOUT_MESSAGE: &str = "FILE TIMEOUT";

/// Section body written in place of an unavailable redirected file
pub const FILE_UNAVAILABLE_TEXT: &str = "FILE UNAVAILABLE\n";

/// Caveat recorded when invalid bytes were substituted during capture
pub const INVALID_CHARACTERS_CAVEAT: &str = "invalid characters in output";

/// Status message when NUL characters had to be removed
pub const NULL_CHARACTERS_MESSAGE: &str = "NULL characters in output";

/// Text that replaces every NUL
pub const NUL_REPLACEMENT: &str = "NULL";

/// Textual NUL escape some programs print instead of the byte itself
const ESCAPED_NUL: &str = "\\x00";

/// Label used in the header of a redirected file's section
#[must_use]
pub fn redirected_label(path: &Path) -> String {
    format!("Redirected output {}", path.display())
}

/// Append one labeled section per redirected file, in the given order.
///
/// A file that cannot be opened is treated as not produced in time: its
/// section reads `FILE UNAVAILABLE` and the status becomes `FILE TIMEOUT`.
pub fn append_redirected_output(
    output: &mut String,
    files: &[PathBuf],
    header_width: usize,
    sink: &dyn StatusSink,
) {
    for path in files {
        output.push_str(&output_header(&redirected_label(path), header_width));

        match File::open(path) {
            Ok(mut file) => output.push_str(&read_output(&mut file, sink)),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Redirected output unavailable");
                sink.set_status(StatusKind::Error, FILE_TIMEOUT_MESSAGE);
                output.push_str(FILE_UNAVAILABLE_TEXT);
            }
        }
    }
}

/// Record the invalid-characters caveat if capture had to substitute bytes.
///
/// Output is a `String`, so it is well-formed by construction and always
/// encodes as a JSON string; the encode below is a debug-build assertion
/// only. No second decode is attempted here.
pub fn check_serializable(output: &str, replaced_invalid: bool, sink: &dyn StatusSink) {
    debug_assert!(serde_json::to_string(output).is_ok());

    if replaced_invalid {
        sink.add_caveat(INVALID_CHARACTERS_CAVEAT);
    }
}

/// Replace raw and escaped NULs with `NULL`.
///
/// The repair is lossy, so the test is marked as an error whenever it was
/// needed. Returns whether anything was replaced.
pub fn replace_nul(output: &mut String, sink: &dyn StatusSink) -> bool {
    if !output.contains('\0') && !output.contains(ESCAPED_NUL) {
        return false;
    }

    *output = output
        .replace('\0', NUL_REPLACEMENT)
        .replace(ESCAPED_NUL, NUL_REPLACEMENT);
    sink.set_status(StatusKind::Error, NULL_CHARACTERS_MESSAGE);
    true
}

/// Run every finalization step on `output`, in order: redirected files,
/// serialization check, NUL repair.
pub fn sanitize_output(
    output: &mut String,
    files: &[PathBuf],
    header_width: usize,
    replaced_invalid: bool,
    sink: &dyn StatusSink,
) {
    append_redirected_output(output, files, header_width, sink);
    check_serializable(output, replaced_invalid, sink);
    replace_nul(output, sink);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSink {
        statuses: RefCell<Vec<JobStatus>>,
        caveats: RefCell<Vec<String>>,
    }

    impl StatusSink for RecordingSink {
        fn set_status(&self, kind: StatusKind, message: &str) {
            self.statuses.borrow_mut().push(JobStatus::new(kind, message));
        }

        fn add_caveat(&self, caveat: &str) {
            self.caveats.borrow_mut().push(caveat.to_string());
        }
    }

    #[test]
    fn test_missing_file_section() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("t.processor.0");
        let sink = RecordingSink::default();
        let mut output = String::new();

        append_redirected_output(&mut output, &[missing.clone()], 10, &sink);

        let expected = format!(
            "{}{}",
            output_header(&redirected_label(&missing), 10),
            FILE_UNAVAILABLE_TEXT
        );
        assert_eq!(output, expected);
        assert_eq!(
            *sink.statuses.borrow(),
            vec![JobStatus::new(StatusKind::Error, FILE_TIMEOUT_MESSAGE)]
        );
    }

    #[test]
    fn test_sections_follow_declared_order() {
        let temp = TempDir::new().unwrap();
        let second = temp.path().join("b.txt");
        let first = temp.path().join("a.txt");
        fs::write(&second, "from b").unwrap();
        fs::write(&first, "from a\n").unwrap();
        let sink = RecordingSink::default();
        let mut output = String::from("stdout\n");

        append_redirected_output(&mut output, &[second.clone(), first.clone()], 5, &sink);

        let expected = format!(
            "stdout\n{}from b\n{}from a\n",
            output_header(&redirected_label(&second), 5),
            output_header(&redirected_label(&first), 5),
        );
        assert_eq!(output, expected);
        assert!(sink.statuses.borrow().is_empty());
    }

    #[test]
    fn test_empty_redirected_file_contributes_only_header() {
        let temp = TempDir::new().unwrap();
        let empty = temp.path().join("empty");
        fs::write(&empty, "").unwrap();
        let sink = RecordingSink::default();
        let mut output = String::new();

        append_redirected_output(&mut output, &[empty.clone()], 3, &sink);
        assert_eq!(output, output_header(&redirected_label(&empty), 3));
    }

    #[test]
    fn test_check_serializable_records_caveat_only_after_substitution() {
        let sink = RecordingSink::default();
        check_serializable("plain text", false, &sink);
        assert!(sink.caveats.borrow().is_empty());

        check_serializable("bad \u{FFFD} byte", true, &sink);
        assert_eq!(*sink.caveats.borrow(), vec![INVALID_CHARACTERS_CAVEAT]);
        assert!(sink.statuses.borrow().is_empty());
    }

    #[test]
    fn test_replace_raw_nul() {
        let sink = RecordingSink::default();
        let mut output = String::from("a\0b\0");
        assert!(replace_nul(&mut output, &sink));
        assert_eq!(output, "aNULLbNULL");
        assert_eq!(
            *sink.statuses.borrow(),
            vec![JobStatus::new(StatusKind::Error, NULL_CHARACTERS_MESSAGE)]
        );
    }

    #[test]
    fn test_replace_escaped_nul() {
        let sink = RecordingSink::default();
        let mut output = String::from(r"value=\x00 end");
        assert!(replace_nul(&mut output, &sink));
        assert_eq!(output, "value=NULL end");
    }

    #[test]
    fn test_clean_output_untouched() {
        let sink = RecordingSink::default();
        let mut output = String::from("x = 0\n\\x01\n");
        assert!(!replace_nul(&mut output, &sink));
        assert_eq!(output, "x = 0\n\\x01\n");
        assert!(sink.statuses.borrow().is_empty());
    }

    #[test]
    fn test_sanitize_output_repairs_nul_from_redirected_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("rank0");
        fs::write(&file, b"rank \0 zero").unwrap();
        let sink = RecordingSink::default();
        let mut output = String::new();

        sanitize_output(&mut output, &[file], 4, false, &sink);

        assert!(!output.contains('\0'));
        assert!(output.ends_with("rank NULL zero\n"));
        assert_eq!(
            sink.statuses.borrow().last(),
            Some(&JobStatus::new(StatusKind::Error, NULL_CHARACTERS_MESSAGE))
        );
    }
}
