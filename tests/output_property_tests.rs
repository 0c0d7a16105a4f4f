use proptest::prelude::*;
use std::cell::RefCell;
use std::io::Cursor;
use testrun::format::output_header;
use testrun::sanitize::{replace_nul, sanitize_output};
use testrun::{CommandSpec, JobStatus, StatusKind, StatusSink, read_output};

#[derive(Default)]
struct RecordingSink {
    status: RefCell<Option<JobStatus>>,
    caveats: RefCell<Vec<String>>,
}

impl StatusSink for RecordingSink {
    fn set_status(&self, kind: StatusKind, message: &str) {
        *self.status.borrow_mut() = Some(JobStatus::new(kind, message));
    }

    fn add_caveat(&self, caveat: &str) {
        self.caveats.borrow_mut().push(caveat.to_string());
    }
}

proptest! {
    /// Finalized output never carries a NUL, raw or escaped
    #[test]
    fn prop_replace_nul_leaves_no_nul(
        parts in proptest::collection::vec("[a-z \\n]{0,8}", 1..6),
        sep in prop_oneof![Just("\0"), Just("\\x00"), Just("")],
    ) {
        let mut output = parts.join(sep);
        let had_nul = output.contains('\0') || output.contains("\\x00");
        let sink = RecordingSink::default();

        let replaced = replace_nul(&mut output, &sink);

        prop_assert!(!output.contains('\0'));
        prop_assert!(!output.contains("\\x00"));
        prop_assert_eq!(replaced, had_nul);
        prop_assert_eq!(sink.status.borrow().is_some(), had_nul);
    }

    /// Valid UTF-8 reads back unchanged except for one added trailing newline
    #[test]
    fn prop_read_output_appends_single_newline(text in "\\PC{0,64}") {
        let sink = RecordingSink::default();
        let read = read_output(&mut Cursor::new(text.clone().into_bytes()), &sink);

        if text.is_empty() {
            prop_assert_eq!(read, "");
        } else if text.ends_with('\n') {
            prop_assert_eq!(read, text);
        } else {
            prop_assert_eq!(read, format!("{text}\n"));
        }
        prop_assert!(sink.status.borrow().is_none());
    }

    /// Sanitized output always encodes as a JSON string
    #[test]
    fn prop_sanitized_output_serializes(text in "\\PC{0,64}") {
        let mut output = text;
        let sink = RecordingSink::default();

        sanitize_output(&mut output, &[], 80, false, &sink);

        prop_assert!(serde_json::to_string(&output).is_ok());
        prop_assert!(!output.contains('\0'));
        prop_assert!(sink.caveats.borrow().is_empty());
    }

    /// Header rules always match the requested width
    #[test]
    fn prop_output_header_rule_width(label in "[a-zA-Z0-9 ./_]{0,40}", width in 1usize..200) {
        let header = output_header(&label, width);
        let lines: Vec<&str> = header.lines().collect();

        prop_assert_eq!(lines.len(), 3);
        prop_assert_eq!(lines[0].len(), width);
        prop_assert_eq!(lines[0], lines[2]);
        prop_assert_eq!(lines[1], format!("{label}:"));
    }

    /// Arguments are kept as separate argv entries, never re-split
    #[test]
    fn prop_command_spec_preserves_args(args in proptest::collection::vec("[^\\x00]{0,16}", 0..8)) {
        let command = CommandSpec::new("prog").args(&args);

        prop_assert_eq!(command.args.len(), args.len());
        for (kept, original) in command.args.iter().zip(&args) {
            prop_assert_eq!(kept.to_str(), Some(original.as_str()));
        }
    }
}
