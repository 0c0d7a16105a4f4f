//! Reading captured output back from a seekable stream

use std::io::{Read, Seek, SeekFrom};
use testrun_utils::format::ensure_trailing_newline;

use crate::job::{StatusKind, StatusSink};

/// Status message when a stream is not valid UTF-8
pub const NON_UNICODE_MESSAGE: &str = "non-unicode characters in output";

/// Status message for any other read failure
pub const READ_ERROR_MESSAGE: &str = "error reading output";

/// Read everything from `stream`, starting at its beginning, as UTF-8 text.
///
/// Failures never propagate: they set an error status on `sink` and yield an
/// empty string, so the caller still produces a (partial) result. Non-empty
/// text always ends with a newline, which keeps concatenated sections apart.
pub fn read_output<R>(stream: &mut R, sink: &dyn StatusSink) -> String
where
    R: Read + Seek + ?Sized,
{
    let mut bytes = Vec::new();
    let read = stream
        .seek(SeekFrom::Start(0))
        .and_then(|_| stream.read_to_end(&mut bytes));

    if let Err(err) = read {
        tracing::warn!(error = %err, "Failed to read captured output");
        sink.set_status(StatusKind::Error, READ_ERROR_MESSAGE);
        return String::new();
    }

    match String::from_utf8(bytes) {
        Ok(text) => ensure_trailing_newline(text),
        Err(err) => {
            tracing::warn!(
                valid_up_to = err.utf8_error().valid_up_to(),
                "Captured output is not valid UTF-8"
            );
            sink.set_status(StatusKind::Error, NON_UNICODE_MESSAGE);
            String::new()
        }
    }
}
