//! Error taxonomy of the decoder
//!
//! Errors fall in three families:
//! - structural errors (desync, unexpected node, premature end, syntax,
//!   depth limit): the stream is compromised and the decode is aborted,
//! - value errors (malformed leaf): fatal for the containing decode step,
//! - protocol/policy errors (unknown response class, unresolved
//!   discriminator, service failures) raised by the layers above the cursor.

use thiserror::Error;

use crate::response::ResponseEnvelope;

/// Error type shared by every decode and encode operation of the crate
#[derive(Debug, Clone, Error)]
pub enum EwsError {
    #[error("Protocol desync: expected {expected}, found {found}")]
    ProtocolDesync { expected: String, found: String },

    #[error("Unexpected node: {0}")]
    UnexpectedNode(String),

    #[error("Premature end of document inside <{0}>")]
    PrematureEof(String),

    #[error("Malformed value {value:?} in <{element}>: expected {expected}")]
    MalformedValue {
        element: String,
        value: String,
        expected: &'static str,
    },

    #[error("Unknown response class: {0}")]
    UnknownResponseClass(String),

    #[error("Unresolved discriminator: {0}")]
    UnresolvedDiscriminator(String),

    #[error("Change payload could not be materialized: {0}")]
    ChangeObjectMaterializationFailed(String),

    #[error("Duplicate sort key: {0}")]
    DuplicateSortKey(String),

    #[error("Discriminator registered twice: {0}")]
    DuplicateDiscriminator(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Document nesting exceeds {0} levels")]
    DepthLimitExceeded(usize),

    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("SOAP fault {code}: {message}")]
    SoapFault {
        code: String,
        message: String,
        response_code: Option<String>,
    },

    #[error("{0}")]
    Response(Box<ResponseEnvelope>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl EwsError {
    pub(crate) fn desync(expected: impl Into<String>, found: impl Into<String>) -> Self {
        EwsError::ProtocolDesync {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub(crate) fn malformed(
        element: impl Into<String>,
        value: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        EwsError::MalformedValue {
            element: element.into(),
            value: value.into(),
            expected,
        }
    }

    /// Whether the error leaves the underlying stream unusable
    ///
    /// Structural errors must abort the whole decode: no partial result
    /// built from the same cursor may be published.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            EwsError::ProtocolDesync { .. }
                | EwsError::UnexpectedNode(_)
                | EwsError::PrematureEof(_)
                | EwsError::Syntax(_)
                | EwsError::DepthLimitExceeded(_)
        )
    }

    /// The service envelope carried by a caller-raised failure, if any
    pub fn envelope(&self) -> Option<&ResponseEnvelope> {
        match self {
            EwsError::Response(envelope) => Some(envelope),
            _ => None,
        }
    }
}

// Implement From for common error types

impl From<quick_xml::Error> for EwsError {
    fn from(err: quick_xml::Error) -> Self {
        match err {
            quick_xml::Error::Io(e) => EwsError::Io(e.to_string()),
            other => EwsError::Syntax(other.to_string()),
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for EwsError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        EwsError::Syntax(err.to_string())
    }
}

impl From<serde_json::Error> for EwsError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            EwsError::Io(err.to_string())
        } else {
            EwsError::Syntax(err.to_string())
        }
    }
}

impl From<std::io::Error> for EwsError {
    fn from(err: std::io::Error) -> Self {
        EwsError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for EwsError {
    fn from(err: toml::de::Error) -> Self {
        EwsError::Config(err.to_string())
    }
}

/// Result type alias using EwsError
pub type Result<T> = std::result::Result<T, EwsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_classification() {
        assert!(EwsError::PrematureEof("Items".into()).is_structural());
        assert!(EwsError::desync("</Items>", "<Folder>").is_structural());
        assert!(EwsError::Syntax("bad".into()).is_structural());
        assert!(!EwsError::malformed("Size", "abc", "integer").is_structural());
        assert!(!EwsError::UnknownResponseClass("Maybe".into()).is_structural());
        assert!(!EwsError::UnresolvedDiscriminator("Hologram".into()).is_structural());
    }

    #[test]
    fn test_malformed_value_message() {
        let err = EwsError::malformed("Size", "abc", "integer");
        assert_eq!(
            err.to_string(),
            "Malformed value \"abc\" in <Size>: expected integer"
        );
    }

    #[test]
    fn test_json_syntax_error_conversion() {
        let err: EwsError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, EwsError::Syntax(_)));
    }
}
