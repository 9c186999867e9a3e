//! Control-channel message types exchanged with the terminal backend.

use pdvmon_core::{InactiveDuration, TerminalAddress};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::parse::RawControlEvent;

/// Commands sent from the dashboard to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ControlCommand {
    /// Ask the backend to start relaying a terminal's events.
    Register {
        /// Address of the terminal to bind
        pdv_ip: TerminalAddress,
    },
}

impl ControlCommand {
    /// Creates a register command.
    pub fn register(pdv_ip: TerminalAddress) -> Self {
        Self::Register { pdv_ip }
    }

    /// Serializes the command into a single text frame.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Encode` if serialization fails.
    pub fn to_frame(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::encode)
    }
}

/// Wire tag of the register acknowledgement.
pub const REGISTER_RESPONSE: &str = "register_response";
/// Wire tag of a terminal data line.
pub const PDV_DATA: &str = "pdv_data";
/// Wire tag of the backend's inactivity notification.
pub const PDV_INACTIVE_TIMEOUT: &str = "pdv_inativo_timeout";

/// Events received from the backend, after validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// Backend ack/nack for a prior register command.
    RegisterResponse {
        address: TerminalAddress,
        success: bool,
    },

    /// One event line produced by a terminal.
    TerminalData {
        address: TerminalAddress,
        data: String,
    },

    /// The backend has not heard from a terminal for a while.
    InactivityTimeout {
        address: TerminalAddress,
        inactive: InactiveDuration,
    },

    /// A well-formed message with a type this client does not handle.
    Unknown {
        /// The unrecognised `type` tag
        kind: String,
    },
}

impl ControlEvent {
    /// Parses one inbound text frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidJson` if the frame is not a JSON object
    /// - `ProtocolError::MissingField` if a required field is absent
    /// - `ProtocolError::InvalidField` if a field fails validation
    pub fn parse(frame: &str) -> Result<Self, ProtocolError> {
        let raw: RawControlEvent = serde_json::from_str(frame).map_err(ProtocolError::json)?;
        raw.into_event()
    }

    /// The `type` tag this event was parsed from.
    pub fn kind(&self) -> &str {
        match self {
            Self::RegisterResponse { .. } => REGISTER_RESPONSE,
            Self::TerminalData { .. } => PDV_DATA,
            Self::InactivityTimeout { .. } => PDV_INACTIVE_TIMEOUT,
            Self::Unknown { kind } => kind,
        }
    }

    /// Address the event refers to, if any.
    pub fn address(&self) -> Option<&TerminalAddress> {
        match self {
            Self::RegisterResponse { address, .. }
            | Self::TerminalData { address, .. }
            | Self::InactivityTimeout { address, .. } => Some(address),
            Self::Unknown { .. } => None,
        }
    }
}
