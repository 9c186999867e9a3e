//! pdvmon Core - Shared types for the PDV monitoring dashboard
//!
//! This crate provides the domain types shared between the session layer
//! (`pdvmon-session`), the wire protocol and the terminal front-end.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod error;
pub mod log;
pub mod media;
pub mod slot;
pub mod terminal;

// Re-exports for convenience
pub use error::{DomainError, DomainResult};
pub use log::{Highlight, LogEntry, LogLevel};
pub use media::{ConnectivityState, MediaState, QualityPreset};
pub use slot::{SlotId, SlotLayout, DEFAULT_SLOT_COUNT, MAX_SLOT_COUNT};
pub use terminal::{InactiveDuration, TerminalAddress, UNKNOWN_TERMINAL};
