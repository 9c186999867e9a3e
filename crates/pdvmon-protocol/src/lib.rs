//! pdvmon Protocol - Wire formats for the backend and relay channels
//!
//! This crate provides message types and parsing for:
//! - the shared control channel between the dashboard and the terminal
//!   backend (`register`, `register_response`, `pdv_data`,
//!   `pdv_inativo_timeout`);
//! - the per-slot relay transport used to negotiate video sessions.

pub mod error;
pub mod message;
pub mod parse;
pub mod relay;

pub use error::ProtocolError;
pub use message::{ControlCommand, ControlEvent, PDV_DATA, PDV_INACTIVE_TIMEOUT, REGISTER_RESPONSE};
pub use parse::{RawControlEvent, RawRelayFrame};
pub use relay::{RelayCommand, RelayEvent, SessionDescription, CLOSE_FRAME};
