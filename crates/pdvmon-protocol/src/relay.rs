//! Per-slot relay transport frames.
//!
//! The relay speaks a tiny protocol: the dashboard opens with the raw
//! source URL, optionally names a quality preset, then answers the relay's
//! SDP offer once candidate gathering is done.

use pdvmon_core::QualityPreset;
use serde::Serialize;

use crate::error::ProtocolError;
use crate::parse::RawRelayFrame;

/// Frame asking the relay to stop streaming before the socket closes.
pub const CLOSE_FRAME: &str = "CLOSE";

/// Negotiation descriptor exchanged over the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionDescription {
    Offer { sdp: String },
    Answer { sdp: String },
}

#[derive(Serialize)]
struct QualityFrame {
    quality: QualityPreset,
}

#[derive(Serialize)]
struct ChangeQualityFrame {
    change_quality: QualityPreset,
}

/// Frames the dashboard sends on a relay transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayCommand {
    /// Session initiation: the raw video-source URL.
    Source(String),
    /// Initial encoding preset, sent right after the source.
    Quality(QualityPreset),
    /// Local description produced once gathering completes.
    Answer { sdp: String },
    /// Ask the relay to renegotiate with a different preset.
    ChangeQuality(QualityPreset),
    /// Graceful stop.
    Close,
}

impl RelayCommand {
    /// Encodes the command as a text frame.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Encode` if JSON serialization fails.
    pub fn to_frame(&self) -> Result<String, ProtocolError> {
        match self {
            Self::Source(url) => Ok(url.clone()),
            Self::Quality(quality) => serde_json::to_string(&QualityFrame { quality: *quality })
                .map_err(ProtocolError::encode),
            Self::Answer { sdp } => {
                serde_json::to_string(&SessionDescription::Answer { sdp: sdp.clone() })
                    .map_err(ProtocolError::encode)
            }
            Self::ChangeQuality(preset) => serde_json::to_string(&ChangeQualityFrame {
                change_quality: *preset,
            })
            .map_err(ProtocolError::encode),
            Self::Close => Ok(CLOSE_FRAME.to_string()),
        }
    }
}

/// Frames received from the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// Remote offer carrying a non-empty SDP.
    Offer { sdp: String },
    /// Any other well-formed frame; not acted upon.
    Other { kind: Option<String> },
}

impl RelayEvent {
    /// Parses one inbound relay frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidJson` if the frame is not a JSON object
    /// - `ProtocolError::MissingField` if an offer lacks a non-empty `sdp`
    pub fn parse(frame: &str) -> Result<Self, ProtocolError> {
        let raw: RawRelayFrame = serde_json::from_str(frame).map_err(ProtocolError::json)?;
        match raw.kind.as_deref() {
            Some("offer") => match raw.sdp {
                Some(sdp) if !sdp.is_empty() => Ok(Self::Offer { sdp }),
                _ => Err(ProtocolError::missing("offer", "sdp")),
            },
            _ => Ok(Self::Other { kind: raw.kind }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_is_sent_raw() {
        let frame = RelayCommand::Source("rtsp://cam1/stream".to_string())
            .to_frame()
            .unwrap();
        assert_eq!(frame, "rtsp://cam1/stream");
    }

    #[test]
    fn test_answer_frame_shape() {
        let frame = RelayCommand::Answer {
            sdp: "v=0".to_string(),
        }
        .to_frame()
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], "answer");
        assert_eq!(value["sdp"], "v=0");
    }

    #[test]
    fn test_quality_frames() {
        assert_eq!(
            RelayCommand::Quality(QualityPreset::Medium).to_frame().unwrap(),
            r#"{"quality":"medium"}"#
        );
        // The relay matches this prefix literally.
        assert_eq!(
            RelayCommand::ChangeQuality(QualityPreset::High).to_frame().unwrap(),
            r#"{"change_quality":"high"}"#
        );
        assert_eq!(RelayCommand::Close.to_frame().unwrap(), CLOSE_FRAME);
    }

    #[test]
    fn test_parse_offer() {
        let event = RelayEvent::parse(r#"{"type":"offer","sdp":"v=0\r\n"}"#).unwrap();
        assert_eq!(
            event,
            RelayEvent::Offer {
                sdp: "v=0\r\n".to_string()
            }
        );
    }

    #[test]
    fn test_offer_without_sdp_is_an_error() {
        let err = RelayEvent::parse(r#"{"type":"offer"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingField { field: "sdp", .. }));

        let err = RelayEvent::parse(r#"{"type":"offer","sdp":""}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingField { field: "sdp", .. }));
    }

    #[test]
    fn test_other_frames_are_passed_through() {
        let event = RelayEvent::parse(r#"{"type":"answer","sdp":"v=0"}"#).unwrap();
        assert_eq!(
            event,
            RelayEvent::Other {
                kind: Some("answer".to_string())
            }
        );
        assert!(RelayEvent::parse("not json").is_err());
    }
}
