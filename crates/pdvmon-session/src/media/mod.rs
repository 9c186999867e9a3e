//! Per-slot media negotiation.
//!
//! [`MediaSessionManager`] drives each slot through
//! `Connecting → AwaitingOffer → Negotiating → Connected`. Anything that
//! suspends (opening the relay, building the peer, gathering candidates)
//! runs in a spawned task that reports back as a [`MediaEvent`] tagged with
//! the slot and the session generation it was started for.

mod manager;
mod peer;

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use pdvmon_core::{ConnectivityState, SlotId};

use crate::transport::TransportError;

pub use manager::{MediaError, MediaSessionManager, RelayFrameIn};
pub use peer::{PeerError, PeerMedia, PeerMediaFactory, PeerSignals};

/// Completion of asynchronous media work for one slot session.
#[derive(Debug)]
pub struct MediaEvent {
    pub slot: SlotId,
    /// Session generation the work was started for.
    pub generation: u64,
    pub kind: MediaEventKind,
}

/// What happened.
pub enum MediaEventKind {
    /// The relay transport is open.
    RelayOpened {
        outbound: mpsc::UnboundedSender<String>,
    },
    /// A text frame arrived on the relay.
    RelayFrame(String),
    /// The relay closed, with the error if it failed.
    RelayClosed { error: Option<TransportError> },
    /// The peer was created and owns resources from now on.
    PeerCreated(Arc<dyn PeerMedia>),
    /// Candidate gathering finished with this local description.
    GatheringComplete { sdp: String },
    /// Peer creation or the offer/answer exchange failed.
    NegotiationFailed(String),
    /// Peer connectivity changed.
    Connectivity(ConnectivityState),
    /// A remote track was attached.
    TrackAttached { kind: String },
}

impl fmt::Debug for MediaEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RelayOpened { .. } => f.write_str("RelayOpened"),
            Self::RelayFrame(frame) => f.debug_tuple("RelayFrame").field(frame).finish(),
            Self::RelayClosed { error } => {
                f.debug_struct("RelayClosed").field("error", error).finish()
            }
            Self::PeerCreated(_) => f.write_str("PeerCreated"),
            Self::GatheringComplete { .. } => f.write_str("GatheringComplete"),
            Self::NegotiationFailed(reason) => {
                f.debug_tuple("NegotiationFailed").field(reason).finish()
            }
            Self::Connectivity(state) => f.debug_tuple("Connectivity").field(state).finish(),
            Self::TrackAttached { kind } => {
                f.debug_struct("TrackAttached").field("kind", kind).finish()
            }
        }
    }
}
