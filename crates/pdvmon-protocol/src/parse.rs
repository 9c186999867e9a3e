//! Lenient raw structures for inbound frames.
//!
//! The backend is not versioned, so every field is optional at the serde
//! layer. Presence and validity are checked afterwards, which gives precise
//! `MissingField`/`InvalidField` errors instead of opaque serde messages.

use pdvmon_core::{InactiveDuration, TerminalAddress};
use serde::Deserialize;

use crate::error::ProtocolError;
use crate::message::{ControlEvent, PDV_DATA, PDV_INACTIVE_TIMEOUT, REGISTER_RESPONSE};

/// Raw control-channel event as sent by the backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawControlEvent {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub pdv_ip: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub inactive_time: Option<serde_json::Number>,
}

impl RawControlEvent {
    /// Validates the raw fields and builds a typed event.
    ///
    /// # Errors
    ///
    /// See [`ControlEvent::parse`].
    pub fn into_event(self) -> Result<ControlEvent, ProtocolError> {
        let kind = self
            .kind
            .clone()
            .ok_or_else(|| ProtocolError::missing("<untyped>", "type"))?;

        match kind.as_str() {
            REGISTER_RESPONSE => {
                let address = self.address(REGISTER_RESPONSE)?;
                let success = self
                    .success
                    .ok_or_else(|| ProtocolError::missing(REGISTER_RESPONSE, "success"))?;
                Ok(ControlEvent::RegisterResponse { address, success })
            }
            PDV_DATA => {
                let address = self.address(PDV_DATA)?;
                let data = self
                    .data
                    .ok_or_else(|| ProtocolError::missing(PDV_DATA, "data"))?;
                Ok(ControlEvent::TerminalData { address, data })
            }
            PDV_INACTIVE_TIMEOUT => {
                let address = self.address(PDV_INACTIVE_TIMEOUT)?;
                let inactive = self.inactive_duration()?;
                Ok(ControlEvent::InactivityTimeout { address, inactive })
            }
            _ => Ok(ControlEvent::Unknown { kind }),
        }
    }

    fn address(&self, message_type: &str) -> Result<TerminalAddress, ProtocolError> {
        let raw = self
            .pdv_ip
            .as_deref()
            .ok_or_else(|| ProtocolError::missing(message_type, "pdv_ip"))?;
        TerminalAddress::parse(raw).map_err(|e| ProtocolError::invalid("pdv_ip", e))
    }

    fn inactive_duration(&self) -> Result<InactiveDuration, ProtocolError> {
        let number = self
            .inactive_time
            .as_ref()
            .ok_or_else(|| ProtocolError::missing(PDV_INACTIVE_TIMEOUT, "inactive_time"))?;

        if let Some(secs) = number.as_u64() {
            return Ok(InactiveDuration::from_secs(secs));
        }
        let secs = number
            .as_f64()
            .ok_or_else(|| ProtocolError::invalid("inactive_time", "not a number"))?;
        InactiveDuration::from_secs_f64(secs).map_err(|e| ProtocolError::invalid("inactive_time", e))
    }
}

/// Raw relay frame: `{ "type": ..., "sdp": ... }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRelayFrame {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub sdp: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_event_ignores_extra_fields() {
        let raw: RawControlEvent = serde_json::from_str(
            r#"{"type":"pdv_data","pdv_ip":"10.0.0.1","data":"x","extra":{"nested":true}}"#,
        )
        .unwrap();
        assert_eq!(raw.kind.as_deref(), Some("pdv_data"));
        assert!(raw.into_event().is_ok());
    }

    #[test]
    fn test_raw_event_all_missing() {
        let raw: RawControlEvent = serde_json::from_str("{}").unwrap();
        assert!(raw.kind.is_none());
        assert!(raw.pdv_ip.is_none());
        assert!(raw.into_event().is_err());
    }

    #[test]
    fn test_negative_inactive_time_is_invalid() {
        let raw: RawControlEvent = serde_json::from_str(
            r#"{"type":"pdv_inativo_timeout","pdv_ip":"10.0.0.1","inactive_time":-3}"#,
        )
        .unwrap();
        let err = raw.into_event().unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidField { field: "inactive_time", .. }));
    }

    #[test]
    fn test_raw_relay_frame() {
        let raw: RawRelayFrame = serde_json::from_str(r#"{"type":"offer"}"#).unwrap();
        assert_eq!(raw.kind.as_deref(), Some("offer"));
        assert!(raw.sdp.is_none());
    }
}
