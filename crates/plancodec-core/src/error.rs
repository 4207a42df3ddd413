use std::fmt;
use thiserror::Error as ThisError;

///
/// CodecError
///
/// Structured codec error with a stable classification.
/// An unavailable plan is not an error; it is represented by empty output.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct CodecError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    /// The variant (if present) must correspond to `origin`.
    pub detail: Option<ErrorDetail>,
}

impl CodecError {
    /// Construct a CodecError without detail.
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Construct a decode-origin grammar violation at a 1-based line.
    pub(crate) fn malformed_text(line: usize, reason: impl Into<String>) -> Self {
        Self::from(DecodeError::MalformedText {
            line,
            reason: reason.into(),
        })
    }

    /// Construct a decode-origin resource limit violation at a 1-based line.
    pub(crate) fn limit_exceeded(line: usize, limit: impl Into<String>) -> Self {
        Self::from(DecodeError::LimitExceeded {
            line,
            limit: limit.into(),
        })
    }

    /// Construct an envelope-origin malformed input error.
    pub(crate) fn envelope_malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::MalformedText, ErrorOrigin::Envelope, message)
    }

    /// Construct an envelope-origin failure not caused by the input.
    pub(crate) fn envelope_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Envelope, message)
    }

    /// Construct a config-origin error for settings the caller supplied.
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidInput, ErrorOrigin::Config, message)
    }

    /// Construct a config-origin error for a failure outside the settings
    /// themselves, such as an unreadable file.
    pub fn config_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Config, message)
    }

    #[must_use]
    pub const fn is_malformed_text(&self) -> bool {
        matches!(self.class, ErrorClass::MalformedText)
    }

    /// Line the decoder rejected, when the error came from decoding.
    #[must_use]
    pub const fn line(&self) -> Option<usize> {
        match &self.detail {
            Some(ErrorDetail::Decode(
                DecodeError::MalformedText { line, .. } | DecodeError::LimitExceeded { line, .. },
            )) => Some(*line),
            None => None,
        }
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

impl From<DecodeError> for CodecError {
    fn from(err: DecodeError) -> Self {
        let class = match err {
            DecodeError::MalformedText { .. } => ErrorClass::MalformedText,
            DecodeError::LimitExceeded { .. } => ErrorClass::LimitExceeded,
        };

        Self {
            class,
            origin: ErrorOrigin::Decode,
            message: err.to_string(),
            detail: Some(ErrorDetail::Decode(err)),
        }
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`CodecError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Decode(DecodeError),
}

///
/// DecodeError
///
/// Decoder-specific structured error detail.
/// Never returned directly; always wrapped in [`ErrorDetail::Decode`].
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum DecodeError {
    #[error("malformed plan text at line {line}: {reason}")]
    MalformedText { line: usize, reason: String },

    #[error("plan text exceeds {limit} at line {line}")]
    LimitExceeded { line: usize, limit: String },
}

///
/// ErrorClass
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    MalformedText,
    LimitExceeded,
    InvalidInput,
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::MalformedText => "malformed_text",
            Self::LimitExceeded => "limit_exceeded",
            Self::InvalidInput => "invalid_input",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Decode,
    Envelope,
    Config,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Decode => "decode",
            Self::Envelope => "envelope",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_text_carries_line_and_class() {
        let err = CodecError::malformed_text(3, "depth jumps from 0 to 2");

        assert!(err.is_malformed_text());
        assert_eq!(err.origin, ErrorOrigin::Decode);
        assert_eq!(err.line(), Some(3));
        assert_eq!(
            err.display_with_class(),
            "decode:malformed_text: malformed plan text at line 3: depth jumps from 0 to 2"
        );
    }

    #[test]
    fn limit_errors_are_not_malformed_text() {
        let err = CodecError::limit_exceeded(257, "max_depth 256");

        assert!(!err.is_malformed_text());
        assert_eq!(err.class, ErrorClass::LimitExceeded);
        assert_eq!(err.line(), Some(257));
    }

    #[test]
    fn config_errors_split_caller_input_from_internal_failures() {
        let invalid = CodecError::config_invalid("decode.max_depth must be at least 1");
        assert_eq!(invalid.class, ErrorClass::InvalidInput);
        assert_eq!(
            invalid.display_with_class(),
            "config:invalid_input: decode.max_depth must be at least 1"
        );
        assert!(!invalid.is_malformed_text());

        let internal = CodecError::config_internal("failed to read config");
        assert_eq!(internal.class, ErrorClass::Internal);
        assert_eq!(internal.line(), None);
    }

    #[test]
    fn envelope_errors_have_no_line() {
        let err = CodecError::envelope_malformed("invalid base64");

        assert!(err.is_malformed_text());
        assert_eq!(err.origin, ErrorOrigin::Envelope);
        assert_eq!(err.line(), None);
        assert_eq!(err.to_string(), "invalid base64");
    }
}
