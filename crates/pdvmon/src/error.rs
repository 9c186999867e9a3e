//! Error types for the pdvmon front-end.
//!
//! This module defines errors that can occur during terminal setup,
//! configuration loading and transport construction.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::io;
use std::path::PathBuf;

use pdvmon_session::{SessionError, TransportError};
use thiserror::Error;

// ============================================================================
// TUI Error Type
// ============================================================================

/// Front-end errors.
///
/// Most variants carry enough context to tell the operator what to fix:
/// a config path, a terminal capability, or the backend address.
#[derive(Error, Debug)]
pub enum TuiError {
    /// Failed to initialize the terminal.
    ///
    /// Usually means stdout is not a TTY (pipes, scripts). Run pdvmon from
    /// an interactive terminal.
    #[error("Failed to initialize terminal: {0}")]
    TerminalInit(String),

    /// Failed to restore the terminal on exit. Running `reset` can help.
    #[error("Failed to restore terminal: {0}")]
    TerminalCleanup(String),

    /// The config file could not be read or parsed.
    #[error("Invalid config {path}: {reason}")]
    Config {
        /// File that failed to load
        path: PathBuf,
        /// Read or parse failure
        reason: String,
    },

    /// The WebRTC stack could not be set up.
    #[error("Media setup failed: {0}")]
    Media(String),

    /// Transport failure passthrough.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Session command failure passthrough.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// I/O error passthrough.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Convenience Result type alias for front-end operations.
pub type Result<T> = std::result::Result<T, TuiError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_init_error_display() {
        let error = TuiError::TerminalInit("not a TTY".to_string());
        let display = format!("{error}");
        assert!(display.contains("Failed to initialize terminal"));
        assert!(display.contains("not a TTY"));
    }

    #[test]
    fn test_config_error_display() {
        let error = TuiError::Config {
            path: PathBuf::from("/etc/pdvmon.toml"),
            reason: "expected `=`".to_string(),
        };
        let display = format!("{error}");
        assert!(display.contains("/etc/pdvmon.toml"));
        assert!(display.contains("expected `=`"));
    }

    #[test]
    fn test_session_error_is_transparent() {
        let error: TuiError = SessionError::NotConnected.into();
        assert_eq!(error.to_string(), "not connected to the backend");
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "missing");
        let tui_error: TuiError = io_error.into();
        assert!(matches!(tui_error, TuiError::Io(_)));
        assert!(format!("{tui_error}").contains("IO error"));
    }
}
