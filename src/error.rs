//! Crate error types.
//!
//! Provides unified error handling with actionable context for debugging.
//! Unmatched annotations are not errors; see [`crate::alignment::Unmatched`].

use thiserror::Error;

use crate::types::AnnotationId;

/// Crate result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types with specific context for actionable debugging
#[derive(Debug, Error)]
pub enum Error {
    /// IO error with path context
    #[error("IO error at {path:?}: {source}")]
    Io {
        /// The underlying IO error.
        source: std::io::Error,
        /// File path where the error occurred, if known.
        path: Option<std::path::PathBuf>,
    },

    /// Configuration error with guidance
    #[error("Configuration error: {message}. {hint}")]
    Config {
        /// Description of the configuration problem.
        message: String,
        /// Actionable guidance for fixing the issue.
        hint: &'static str,
    },

    /// Payload or file parsing error
    #[error("Parse error in {file:?}: {message}")]
    Parse {
        /// File that failed to parse, if known.
        file: Option<std::path::PathBuf>,
        /// Description of the parse failure.
        message: String,
    },

    /// A candidate points at a line or annotation that does not exist.
    ///
    /// Raised only for contract violations between matcher and aligner,
    /// never for ordinary data variance.
    #[error(
        "Invalid candidate reference: annotation {annotation_id} at line {line_index} \
         (span {span_len}) outside song of {line_count} lines or unknown annotation"
    )]
    InvalidReference {
        /// Annotation the candidate claims to belong to.
        annotation_id: AnnotationId,
        /// First line of the candidate span.
        line_index: usize,
        /// Number of lines the candidate covers.
        span_len: usize,
        /// Number of lines in the song.
        line_count: usize,
    },

    /// Generic message error (escape hatch)
    #[error("{0}")]
    Msg(String),
}

impl Error {
    /// Create an IO error with path context
    pub fn io(source: std::io::Error, path: impl Into<Option<std::path::PathBuf>>) -> Self {
        Self::Io { source, path: path.into() }
    }

    /// Create a config error with actionable hint
    pub fn config(message: impl Into<String>, hint: &'static str) -> Self {
        Self::Config { message: message.into(), hint }
    }

    /// Create a parse error with file context
    pub fn parse(message: impl Into<String>, file: impl Into<Option<std::path::PathBuf>>) -> Self {
        Self::Parse { file: file.into(), message: message.into() }
    }

    /// Whether this error signals an upstream bug rather than bad input data
    pub const fn is_contract_violation(&self) -> bool {
        matches!(self, Self::InvalidReference { .. })
    }
}

// Convenience conversions
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io { source: e, path: None }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse { file: None, message: e.to_string() }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Self::Msg(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Self::Msg(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;

    #[test]
    fn config_error_carries_hint() {
        let err = Error::config("min_score out of range", "Use a value between 0.0 and 1.0");
        let msg = err.to_string();
        assert!(msg.contains("min_score"));
        assert!(msg.contains("between 0.0 and 1.0"));
    }

    #[test]
    fn invalid_reference_is_contract_violation() {
        let err = Error::InvalidReference {
            annotation_id: AnnotationId::new(7),
            line_index: 12,
            span_len: 1,
            line_count: 3,
        };
        assert!(err.is_contract_violation());
        assert!(err.to_string().contains("annotation 7"));
        assert!(!Error::from("plain").is_contract_violation());
    }

    #[test]
    fn json_errors_become_parse_errors() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::Parse { file: None, .. }));
    }
}
