//! Wire protocol errors.

use std::fmt;

use thiserror::Error;

/// Errors produced while decoding or encoding frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The frame is not valid JSON of the expected shape.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// A required field is absent.
    #[error("{message_type} message missing field `{field}`")]
    MissingField {
        /// Type tag of the offending message
        message_type: String,
        /// Name of the absent field
        field: &'static str,
    },

    /// A field is present but fails validation.
    #[error("invalid field `{field}`: {reason}")]
    InvalidField {
        /// Name of the offending field
        field: &'static str,
        /// Why validation failed
        reason: String,
    },

    /// An outbound frame could not be serialized.
    #[error("failed to encode frame: {0}")]
    Encode(String),
}

impl ProtocolError {
    pub(crate) fn json(err: serde_json::Error) -> Self {
        Self::InvalidJson(err.to_string())
    }

    pub(crate) fn encode(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }

    pub(crate) fn missing(message_type: &str, field: &'static str) -> Self {
        Self::MissingField {
            message_type: message_type.to_string(),
            field,
        }
    }

    pub(crate) fn invalid<E: fmt::Display>(field: &'static str, reason: E) -> Self {
        Self::InvalidField {
            field,
            reason: reason.to_string(),
        }
    }
}
