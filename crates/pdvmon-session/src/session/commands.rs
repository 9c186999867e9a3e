//! Session actor commands, errors, events and snapshots.
//!
//! All types are designed for async message passing and follow the
//! panic-free policy.

use std::collections::BTreeMap;

use pdvmon_core::{DomainError, MediaState, QualityPreset, SlotId, TerminalAddress};
use pdvmon_protocol::ProtocolError;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::alerts::AlertView;
use crate::media::MediaError;
use crate::router::RouterStats;

// ============================================================================
// Session Commands
// ============================================================================

/// Commands sent to the session actor.
///
/// Each command carries a oneshot channel for its response.
#[derive(Debug)]
pub enum SessionCommand {
    /// Open the control channel to the backend typed by the operator.
    ///
    /// # Errors
    /// - `SessionError::MissingInput` if no backend address was entered
    ConnectServer {
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Close the control channel and reset every slot.
    DisconnectServer {
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Bind the slot's terminal address input to the slot.
    ///
    /// # Errors
    /// - `SessionError::NotConnected` without an open control channel
    /// - `SessionError::MissingInput` if no address was entered
    RegisterTerminal {
        slot: SlotId,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Start the slot's video feed from its source URL input.
    ///
    /// # Errors
    /// - `SessionError::NotConnected` without an open control channel
    /// - `SessionError::MissingInput` if no source URL was entered
    StartFeed {
        slot: SlotId,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Stop the slot's video feed.
    StopFeed {
        slot: SlotId,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Renegotiate the slot's feed with another preset.
    ///
    /// # Errors
    /// - `SessionError::Media` unless the feed is connected
    ChangeQuality {
        slot: SlotId,
        preset: QualityPreset,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Dismiss the slot's inactivity alert.
    DismissAlert {
        slot: SlotId,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Read the current session state.
    Snapshot {
        respond_to: oneshot::Sender<SessionSnapshot>,
    },
}

// ============================================================================
// Session Errors
// ============================================================================

/// Errors returned by session operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The actor has stopped.
    #[error("session actor channel closed")]
    ChannelClosed,

    /// The control channel is not open.
    #[error("not connected to the backend")]
    NotConnected,

    /// A required operator input is empty.
    #[error("missing {0}")]
    MissingInput(&'static str),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

// ============================================================================
// Session Events
// ============================================================================

/// State of the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Events published to subscribers after the actor handled an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The control channel changed state.
    LinkChanged(LinkState),
    /// Board state may have changed; redraw.
    Updated,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub link: LinkState,
    pub registrations: Vec<(SlotId, TerminalAddress)>,
    pub media: BTreeMap<SlotId, MediaState>,
    pub live_media: usize,
    pub alerts: Vec<AlertView>,
    pub exclusive: Option<SlotId>,
    pub queued_alerts: usize,
    pub router: RouterStats,
}

impl SessionSnapshot {
    /// Address registered to `slot`.
    pub fn address_of(&self, slot: SlotId) -> Option<&TerminalAddress> {
        self.registrations
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, address)| address)
    }

    /// Media state of `slot`.
    pub fn media_state(&self, slot: SlotId) -> MediaState {
        self.media.get(&slot).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_display() {
        assert_eq!(
            SessionError::MissingInput("terminal address").to_string(),
            "missing terminal address"
        );
        let err: SessionError = DomainError::SlotOutOfRange { slot: 7, count: 4 }.into();
        assert!(matches!(err, SessionError::Domain(_)));
    }

    #[test]
    fn test_snapshot_lookups() {
        let address = TerminalAddress::parse("10.0.0.5").unwrap();
        let snapshot = SessionSnapshot {
            registrations: vec![(SlotId::new(2), address.clone())],
            ..Default::default()
        };
        assert_eq!(snapshot.address_of(SlotId::new(2)), Some(&address));
        assert_eq!(snapshot.address_of(SlotId::new(1)), None);
        assert_eq!(snapshot.media_state(SlotId::new(1)), MediaState::Idle);
    }
}
