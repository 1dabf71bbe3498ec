//! Unified error types for chatarchive.
//!
//! Every fallible operation in the library returns [`ArchiveError`]. The
//! variants mirror the policies the pipeline applies to them:
//!
//! - **Line-level** ([`MalformedSessionMarker`](ArchiveError::MalformedSessionMarker),
//!   [`MalformedRecordHeader`](ArchiveError::MalformedRecordHeader)): the line is
//!   skipped and parsing continues.
//! - **Record-level** ([`TimestampFormat`](ArchiveError::TimestampFormat)): the
//!   record is dropped in structured adapters, the file is abandoned in
//!   transcript adapters.
//! - **File-level** (everything else): the file is reported and the run moves
//!   on to its siblings.
//!
//! Undecodable bytes never surface here. They are replaced during decoding and
//! reported through `tracing`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::parsing::timestamp::FormatHint;

/// A specialized [`Result`] type for chatarchive operations.
///
/// # Example
///
/// ```rust
/// use chatarchive::error::Result;
/// use chatarchive::Message;
///
/// fn load() -> Result<Vec<Message>> {
///     Ok(vec![])
/// }
/// ```
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// The error type for all chatarchive operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArchiveError {
    /// An I/O error occurred while reading input or writing output.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Directory traversal failed.
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// A structured export could not be parsed.
    #[error("Failed to parse {format} export{}: {source}", path.as_ref().map(|p| format!(" (file: {})", p.display())).unwrap_or_default())]
    Parse {
        /// The format being parsed (e.g., "Skype JSON", "Kopete XML")
        format: &'static str,
        /// The underlying parse error
        #[source]
        source: ParseErrorKind,
        /// The file path, if available
        path: Option<PathBuf>,
    },

    /// The input doesn't have the expected overall structure.
    #[error("Invalid {format} format: {message}")]
    InvalidFormat {
        /// The format that was expected
        format: &'static str,
        /// Description of what's wrong
        message: String,
    },

    /// A session boundary line failed to match its grammar.
    #[error("Malformed session marker at line {line_number}: {line:?}")]
    MalformedSessionMarker {
        /// 1-based line number within the file
        line_number: usize,
        /// The offending line
        line: String,
    },

    /// A record header or labeled field line failed to match its grammar.
    #[error("Malformed record header at line {line_number}: {line:?}")]
    MalformedRecordHeader {
        /// 1-based line number within the file
        line_number: usize,
        /// The offending line
        line: String,
    },

    /// None of the registered patterns for the hint matched the input.
    #[error("Unrecognized {hint} timestamp: {input:?}")]
    TimestampFormat {
        /// The raw timestamp text
        input: String,
        /// The pattern family that was tried
        hint: FormatHint,
    },

    /// A cross-reference (owner id, counterpart, contact mapping) is missing.
    #[error("Unresolved reference '{reference}' ({context})")]
    UnresolvedReference {
        /// The identifier that could not be resolved
        reference: String,
        /// What the reference was needed for
        context: &'static str,
    },

    /// A required input path was not supplied.
    #[error("{format}: missing {what}")]
    MissingInput {
        /// The source format that needs the input
        format: &'static str,
        /// Which input is missing
        what: &'static str,
    },

    /// The requested text encoding label is not known.
    #[error("Unknown encoding '{0}'")]
    UnknownEncoding(String),

    /// Nothing could be emitted and at least one input failed.
    #[error("No output produced ({failures} input(s) failed)")]
    NoOutput {
        /// Number of failed inputs
        failures: usize,
    },
}

/// Kinds of parse errors that can occur in structured exports.
#[derive(Debug, Error)]
pub enum ParseErrorKind {
    /// JSON parsing error
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// CSV parsing error
    #[error("{0}")]
    Csv(#[from] csv::Error),
    /// XML parsing error
    #[error("{0}")]
    Xml(#[from] roxmltree::Error),
    /// Generic parsing error
    #[error("{0}")]
    Other(String),
}

// ============================================================================
// Convenience constructors
// ============================================================================

impl ArchiveError {
    /// Creates a JSON parse error for the given format.
    pub fn json_parse(format: &'static str, source: serde_json::Error, path: Option<PathBuf>) -> Self {
        ArchiveError::Parse {
            format,
            source: ParseErrorKind::Json(source),
            path,
        }
    }

    /// Creates a CSV parse error for the given format.
    pub fn csv_parse(format: &'static str, source: csv::Error, path: Option<PathBuf>) -> Self {
        ArchiveError::Parse {
            format,
            source: ParseErrorKind::Csv(source),
            path,
        }
    }

    /// Creates an XML parse error for the given format.
    pub fn xml_parse(format: &'static str, source: roxmltree::Error, path: Option<PathBuf>) -> Self {
        ArchiveError::Parse {
            format,
            source: ParseErrorKind::Xml(source),
            path,
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(format: &'static str, message: impl Into<String>) -> Self {
        ArchiveError::InvalidFormat {
            format,
            message: message.into(),
        }
    }

    /// Creates a timestamp format error.
    pub fn timestamp(input: impl Into<String>, hint: FormatHint) -> Self {
        ArchiveError::TimestampFormat {
            input: input.into(),
            hint,
        }
    }

    /// Creates an unresolved reference error.
    pub fn unresolved(reference: impl Into<String>, context: &'static str) -> Self {
        ArchiveError::UnresolvedReference {
            reference: reference.into(),
            context,
        }
    }

    /// Creates a malformed session marker error.
    pub fn malformed_marker(line_number: usize, line: impl Into<String>) -> Self {
        ArchiveError::MalformedSessionMarker {
            line_number,
            line: line.into(),
        }
    }

    /// Creates a malformed record header error.
    pub fn malformed_header(line_number: usize, line: impl Into<String>) -> Self {
        ArchiveError::MalformedRecordHeader {
            line_number,
            line: line.into(),
        }
    }

    /// Returns `true` for errors confined to a single line.
    ///
    /// The transcript machine skips such lines and stays in its current state.
    pub fn is_line_recoverable(&self) -> bool {
        matches!(
            self,
            ArchiveError::MalformedSessionMarker { .. } | ArchiveError::MalformedRecordHeader { .. }
        )
    }

    /// Returns `true` if this is an IO error.
    pub fn is_io(&self) -> bool {
        matches!(self, ArchiveError::Io(_))
    }

    /// Returns `true` if this is a parse error.
    pub fn is_parse(&self) -> bool {
        matches!(self, ArchiveError::Parse { .. })
    }

    /// Returns `true` if this is a timestamp error.
    pub fn is_timestamp(&self) -> bool {
        matches!(self, ArchiveError::TimestampFormat { .. })
    }

    /// Returns `true` if this is an unresolved reference error.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, ArchiveError::UnresolvedReference { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = ArchiveError::from(io_err);
        let display = err.to_string();
        assert!(display.contains("IO error"));
        assert!(display.contains("file not found"));
        assert!(err.is_io());
    }

    #[test]
    fn test_parse_error_with_path() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err = ArchiveError::json_parse(
            "Skype JSON",
            json_err,
            Some(PathBuf::from("/path/to/messages.json")),
        );
        let display = err.to_string();
        assert!(display.contains("Skype JSON"));
        assert!(display.contains("/path/to/messages.json"));
        assert!(err.is_parse());
    }

    #[test]
    fn test_parse_error_without_path() {
        let err = ArchiveError::Parse {
            format: "SMS CSV",
            source: ParseErrorKind::Other("bad row".into()),
            path: None,
        };
        let display = err.to_string();
        assert!(display.contains("SMS CSV"));
        assert!(!display.contains("file:"));
    }

    #[test]
    fn test_xml_parse_constructor() {
        let xml_err = roxmltree::Document::parse("<unclosed>").unwrap_err();
        let err = ArchiveError::xml_parse("Kopete XML", xml_err, None);
        assert!(err.is_parse());
        assert!(err.to_string().contains("Kopete XML"));
    }

    #[test]
    fn test_timestamp_error_display() {
        let err = ArchiveError::timestamp("yesterday-ish", FormatHint::Sms);
        let display = err.to_string();
        assert!(display.contains("yesterday-ish"));
        assert!(display.contains("sms"));
        assert!(err.is_timestamp());
        assert!(!err.is_line_recoverable());
    }

    #[test]
    fn test_line_recoverable() {
        assert!(ArchiveError::malformed_marker(3, "Session Start garbage").is_line_recoverable());
        assert!(ArchiveError::malformed_header(7, "Numbers:").is_line_recoverable());
        assert!(!ArchiveError::unresolved("42", "owner id").is_line_recoverable());
    }

    #[test]
    fn test_unresolved_display() {
        let err = ArchiveError::unresolved("000001", "session owner");
        assert!(err.is_unresolved());
        assert!(err.to_string().contains("000001"));
        assert!(err.to_string().contains("session owner"));
    }

    #[test]
    fn test_malformed_marker_line_number() {
        let err = ArchiveError::malformed_marker(12, "Session Start (ICQ");
        assert!(err.to_string().contains("line 12"));
    }

    #[test]
    fn test_no_output_display() {
        let err = ArchiveError::NoOutput { failures: 3 };
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ArchiveError::json_parse("Telegram JSONL", json_err, None);
        assert!(err.source().is_some());
    }
}
