//! Peer media seam.
//!
//! The manager never touches a WebRTC stack directly. A
//! [`PeerMediaFactory`] creates one [`PeerMedia`] per negotiation, and the
//! peer reports asynchronous callbacks (connectivity, tracks) through the
//! [`PeerSignals`] it was created with.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use pdvmon_core::{ConnectivityState, SlotId};

use super::{MediaEvent, MediaEventKind};

/// Errors raised by peer media implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerError {
    /// The peer connection could not be built.
    #[error("peer setup failed: {0}")]
    Setup(String),

    /// Applying the offer or producing the answer failed.
    #[error("negotiation failed: {0}")]
    Negotiation(String),

    /// The peer was closed before candidate gathering finished.
    #[error("candidate gathering aborted")]
    GatheringAborted,
}

/// One negotiated peer connection.
#[async_trait]
pub trait PeerMedia: Send + Sync {
    /// Sets the remote offer, then creates and sets the local answer.
    ///
    /// # Errors
    ///
    /// Returns `PeerError::Negotiation` if the offer is rejected.
    async fn accept_offer(&self, sdp: String) -> Result<(), PeerError>;

    /// Waits for candidate gathering on the answer set by `accept_offer` and
    /// returns the final local SDP.
    ///
    /// # Errors
    ///
    /// Returns `PeerError::GatheringAborted` if the peer closes first, and
    /// `PeerError::Negotiation` if no answer has been set.
    async fn gathering_complete(&self) -> Result<String, PeerError>;

    /// Closes the connection. Idempotent.
    async fn close(&self);
}

/// Creates peer connections for a slot.
#[async_trait]
pub trait PeerMediaFactory: Send + Sync {
    /// Builds a receive-only peer that reports through `signals`.
    ///
    /// # Errors
    ///
    /// Returns `PeerError::Setup` if the peer cannot be created.
    async fn create(
        &self,
        slot: SlotId,
        signals: PeerSignals,
    ) -> Result<Arc<dyn PeerMedia>, PeerError>;
}

/// Event sink tagged with a slot and generation.
///
/// Peers use it for their callbacks; the manager's spawned tasks use it to
/// post their completions.
#[derive(Clone)]
pub struct PeerSignals {
    slot: SlotId,
    generation: u64,
    tx: mpsc::UnboundedSender<MediaEvent>,
}

impl PeerSignals {
    pub(crate) fn new(slot: SlotId, generation: u64, tx: mpsc::UnboundedSender<MediaEvent>) -> Self {
        Self {
            slot,
            generation,
            tx,
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Reports a connectivity change.
    pub fn connectivity(&self, state: ConnectivityState) {
        self.emit(MediaEventKind::Connectivity(state));
    }

    /// Reports a remote track (e.g. `"video"`).
    pub fn track_attached(&self, kind: impl Into<String>) {
        self.emit(MediaEventKind::TrackAttached { kind: kind.into() });
    }

    pub(crate) fn emit(&self, kind: MediaEventKind) {
        // Receiver gone means the session actor has stopped
        let _ = self.tx.send(MediaEvent {
            slot: self.slot,
            generation: self.generation,
            kind,
        });
    }
}

impl fmt::Debug for PeerSignals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerSignals")
            .field("slot", &self.slot)
            .field("generation", &self.generation)
            .finish()
    }
}
