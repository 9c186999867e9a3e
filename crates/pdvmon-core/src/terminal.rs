//! Terminal (PDV) addressing and inactivity durations.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Label used when a terminal number cannot be derived from an address.
pub const UNKNOWN_TERMINAL: &str = "unknown";

// ============================================================================
// Terminal Address
// ============================================================================

/// Network address of a retail terminal, as typed by the operator.
///
/// Always trimmed and non-empty. No IP validation is performed: the backend
/// is the authority on which terminals exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TerminalAddress(String);

impl TerminalAddress {
    /// Creates an address from user or wire input.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::EmptyAddress` if the input is blank.
    pub fn parse(input: &str) -> DomainResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(DomainError::EmptyAddress);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the underlying string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Two-digit terminal number shown to operators.
    ///
    /// Taken from the last dot-separated segment, zero-padded to three
    /// characters and cut to the final two: `10.0.0.5` is `05`,
    /// `10.0.0.123` is `23`.
    #[must_use]
    pub fn terminal_number(&self) -> String {
        let last = self.0.rsplit('.').next().unwrap_or_default();
        if last.is_empty() {
            return UNKNOWN_TERMINAL.to_string();
        }
        let padded = format!("{last:0>3}");
        let chars: Vec<char> = padded.chars().collect();
        let start = chars.len().saturating_sub(2);
        chars.get(start..).map(|c| c.iter().collect()).unwrap_or(padded)
    }

    /// Operator-facing label, e.g. `PDV 05`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("PDV {}", self.terminal_number())
    }
}

impl TryFrom<String> for TerminalAddress {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TerminalAddress> for String {
    fn from(address: TerminalAddress) -> Self {
        address.0
    }
}

impl fmt::Display for TerminalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Inactive Duration
// ============================================================================

/// How long a terminal has been silent, as reported by the backend.
///
/// The backend sends whole seconds or seconds rounded to one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InactiveDuration(Duration);

impl InactiveDuration {
    /// Creates a duration from whole seconds.
    pub fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    /// Creates a duration from fractional seconds, rounded to tenths.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ParseError` for negative or non-finite input.
    pub fn from_secs_f64(secs: f64) -> DomainResult<Self> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(DomainError::ParseError {
                field: "inactive_time".to_string(),
                reason: format!("expected a non-negative number of seconds, got {secs}"),
            });
        }
        let tenths = (secs * 10.0).round() as u64;
        Ok(Self(Duration::from_millis(tenths.saturating_mul(100))))
    }

    /// Returns the wrapped duration.
    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl fmt::Display for InactiveDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.subsec_millis() == 0 {
            write!(f, "{}s", self.0.as_secs())
        } else {
            write!(f, "{:.1}s", self.0.as_secs_f64())
        }
    }
}
