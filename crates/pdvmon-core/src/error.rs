//! Domain-specific error types following panic-free policy.

use thiserror::Error;

/// Errors that can occur in domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Slot number outside the configured layout
    #[error("Slot {slot} out of range (layout has {count} slots)")]
    SlotOutOfRange { slot: u8, count: u8 },

    /// Slot layout with an unusable slot count
    #[error("Invalid slot count: {count} (expected 1..={max})")]
    InvalidSlotCount { count: u8, max: u8 },

    /// Terminal address was empty after trimming
    #[error("Terminal address must not be empty")]
    EmptyAddress,

    /// Unknown quality preset name
    #[error("Unknown quality preset: {0}")]
    UnknownQuality(String),

    /// Parse error for incoming data
    #[error("Failed to parse {field}: {reason}")]
    ParseError { field: String, reason: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
