//! Media session manager - per-slot offer/answer state machine.
//!
//! # Generations
//!
//! Every `connect` allocates a relay generation and every accepted offer
//! allocates a negotiation generation, both from one counter. Relay task
//! events are tagged with the relay generation, peer events with the
//! negotiation generation. An event whose tag no longer matches the slot's
//! session is stale and dropped; a stale peer handle is closed on arrival.
//! Retired sessions carry generation 0, which is never issued.
//!
//! # Panic-Free Guarantees
//!
//! Relay sends go to an unbounded channel; a failed send means the
//! transport is gone and a `RelayClosed` event is already on its way.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use pdvmon_core::{ConnectivityState, LogEntry, MediaState, QualityPreset, SlotId};
use pdvmon_protocol::RelayCommand;

use crate::presenter::PresentationPort;
use crate::registry::Registry;
use crate::transport::{Connector, Duplex, TransportError};

use super::peer::{PeerMedia, PeerMediaFactory, PeerSignals};
use super::{MediaEvent, MediaEventKind};

/// Errors returned by [`MediaSessionManager`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    /// The operation needs an established media session.
    #[error("camera {slot} is not connected (state: {state})")]
    NotConnected { slot: SlotId, state: MediaState },
}

/// A relay frame handed back to the caller for routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayFrameIn {
    pub slot: SlotId,
    /// Relay generation the frame arrived on.
    pub generation: u64,
    pub frame: String,
}

struct MediaSession {
    generation: u64,
    negotiation: Option<u64>,
    state: MediaState,
    source_url: String,
    quality: Option<QualityPreset>,
    relay: Option<mpsc::UnboundedSender<String>>,
    peer: Option<Arc<dyn PeerMedia>>,
    relay_task: Option<AbortHandle>,
    negotiation_task: Option<AbortHandle>,
    answer_sent: bool,
}

impl MediaSession {
    fn send(&self, command: &RelayCommand) -> bool {
        let Some(relay) = &self.relay else {
            return false;
        };
        match command.to_frame() {
            Ok(frame) => relay.send(frame).is_ok(),
            Err(e) => {
                warn!(error = %e, "Failed to encode relay frame");
                false
            }
        }
    }

    fn drop_peer(&mut self) {
        if let Some(task) = self.negotiation_task.take() {
            task.abort();
        }
        if let Some(peer) = self.peer.take() {
            close_detached(peer);
        }
        self.negotiation = None;
        self.answer_sent = false;
    }

    /// Releases every resource and parks the session in `state`.
    fn retire(&mut self, state: MediaState) {
        if let Some(task) = self.relay_task.take() {
            task.abort();
        }
        self.drop_peer();
        self.relay = None;
        self.generation = 0;
        self.state = state;
    }
}

fn close_detached(peer: Arc<dyn PeerMedia>) {
    tokio::spawn(async move {
        peer.close().await;
    });
}

fn camera(slot: SlotId) -> String {
    format!("Camera {slot}")
}

fn camera_label(slot: SlotId, registry: &Registry) -> String {
    match registry.resolve_address(slot) {
        Some(address) => format!("Camera {slot} ({})", address.label()),
        None => camera(slot),
    }
}

// ============================================================================
// Media Session Manager
// ============================================================================

/// Owns every slot's media session.
pub struct MediaSessionManager {
    connector: Arc<dyn Connector>,
    peers: Arc<dyn PeerMediaFactory>,
    events: mpsc::UnboundedSender<MediaEvent>,
    sessions: HashMap<SlotId, MediaSession>,
    next_generation: u64,
}

impl MediaSessionManager {
    /// Creates a manager whose spawned tasks report on `events`.
    pub fn new(
        connector: Arc<dyn Connector>,
        peers: Arc<dyn PeerMediaFactory>,
        events: mpsc::UnboundedSender<MediaEvent>,
    ) -> Self {
        Self {
            connector,
            peers,
            events,
            sessions: HashMap::new(),
            next_generation: 1,
        }
    }

    fn allocate_generation(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1).max(1);
        generation
    }

    fn relay_session(&mut self, slot: SlotId, generation: u64) -> Option<&mut MediaSession> {
        self.sessions
            .get_mut(&slot)
            .filter(|s| generation != 0 && s.generation == generation)
    }

    fn peer_session(&mut self, slot: SlotId, generation: u64) -> Option<&mut MediaSession> {
        self.sessions
            .get_mut(&slot)
            .filter(|s| s.negotiation == Some(generation))
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Starts a media session for `slot`, replacing any existing one.
    ///
    /// The previous session is torn down before the new relay transport is
    /// opened, so two sessions for one slot never coexist.
    pub fn connect(
        &mut self,
        slot: SlotId,
        relay_url: &str,
        source_url: String,
        quality: Option<QualityPreset>,
        port: &mut dyn PresentationPort,
    ) {
        if let Some(previous) = self.sessions.get_mut(&slot) {
            if previous.state.is_live() {
                debug!(slot = %slot, state = %previous.state, "Replacing media session");
            }
            previous.retire(MediaState::Closed);
        }

        let generation = self.allocate_generation();
        let signals = PeerSignals::new(slot, generation, self.events.clone());
        let relay_task = spawn_relay(Arc::clone(&self.connector), relay_url.to_string(), signals);

        info!(slot = %slot, generation, relay = %relay_url, source = %source_url, "Media session connecting");

        port.update_slot_status(slot, &format!("{}: connecting...", camera(slot)));
        port.append_slot_log(
            slot,
            LogEntry::info(format!("Requesting stream {source_url}")),
        );

        self.sessions.insert(
            slot,
            MediaSession {
                generation,
                negotiation: None,
                state: MediaState::Connecting,
                source_url,
                quality,
                relay: None,
                peer: None,
                relay_task: Some(relay_task),
                negotiation_task: None,
                answer_sent: false,
            },
        );
    }

    /// Applies one asynchronous completion.
    ///
    /// Relay frames are returned to the caller for routing; everything else
    /// is handled here.
    pub fn handle_event(
        &mut self,
        event: MediaEvent,
        registry: &Registry,
        port: &mut dyn PresentationPort,
    ) -> Option<RelayFrameIn> {
        let MediaEvent {
            slot,
            generation,
            kind,
        } = event;

        match kind {
            MediaEventKind::RelayOpened { outbound } => self.on_relay_opened(slot, generation, outbound, port),
            MediaEventKind::RelayFrame(frame) => {
                if self.relay_session(slot, generation).is_some() {
                    return Some(RelayFrameIn {
                        slot,
                        generation,
                        frame,
                    });
                }
                debug!(slot = %slot, generation, "Dropping stale relay frame");
            }
            MediaEventKind::RelayClosed { error } => self.on_relay_closed(slot, generation, error, port),
            MediaEventKind::PeerCreated(peer) => match self.peer_session(slot, generation) {
                Some(session) => session.peer = Some(peer),
                None => {
                    debug!(slot = %slot, generation, "Closing peer from superseded negotiation");
                    close_detached(peer);
                }
            },
            MediaEventKind::GatheringComplete { sdp } => {
                self.on_ice_gathering_complete(slot, generation, sdp, port)
            }
            MediaEventKind::NegotiationFailed(reason) => {
                if self.peer_session(slot, generation).is_some() {
                    self.fail_session(slot, &reason, port);
                }
            }
            MediaEventKind::Connectivity(state) => {
                self.on_connectivity_change(slot, generation, state, registry, port)
            }
            MediaEventKind::TrackAttached { kind } => {
                if self.peer_session(slot, generation).is_some() {
                    port.append_slot_log(
                        slot,
                        LogEntry::info(format!("{}: {kind} stream attached", camera(slot))),
                    );
                }
            }
        }
        None
    }

    fn on_relay_opened(
        &mut self,
        slot: SlotId,
        generation: u64,
        outbound: mpsc::UnboundedSender<String>,
        port: &mut dyn PresentationPort,
    ) {
        let Some(session) = self.relay_session(slot, generation) else {
            debug!(slot = %slot, generation, "Relay opened for superseded session");
            return;
        };
        if session.state != MediaState::Connecting {
            return;
        }

        session.relay = Some(outbound);
        session.send(&RelayCommand::Source(session.source_url.clone()));
        if let Some(quality) = session.quality {
            session.send(&RelayCommand::Quality(quality));
        }
        session.state = MediaState::AwaitingOffer;

        debug!(slot = %slot, generation, "Relay open, awaiting offer");
        port.update_slot_status(slot, &format!("{}: waiting for stream...", camera(slot)));
    }

    fn on_relay_closed(
        &mut self,
        slot: SlotId,
        generation: u64,
        error: Option<TransportError>,
        port: &mut dyn PresentationPort,
    ) {
        let Some(session) = self.relay_session(slot, generation) else {
            return;
        };

        if session.state == MediaState::Connected {
            session.retire(MediaState::Closed);
            info!(slot = %slot, "Relay closed");
            port.update_slot_status(slot, "Disconnected");
            port.append_slot_log(slot, LogEntry::info(format!("{}: stream closed", camera(slot))));
        } else {
            let reason = match error {
                Some(e) => e.to_string(),
                None => "relay closed before the stream was established".to_string(),
            };
            self.fail_session(slot, &reason, port);
        }
    }

    /// Accepts a remote offer and starts negotiating.
    ///
    /// Ignored with a warning unless the session is waiting for an offer.
    pub fn on_offer_received(
        &mut self,
        slot: SlotId,
        generation: u64,
        sdp: String,
        port: &mut dyn PresentationPort,
    ) {
        let negotiation = self.allocate_generation();
        let factory = Arc::clone(&self.peers);
        let events = self.events.clone();

        let Some(session) = self.relay_session(slot, generation) else {
            debug!(slot = %slot, generation, "Offer for superseded session");
            return;
        };
        if !session.state.accepts_offer() {
            warn!(slot = %slot, state = %session.state, "Unexpected offer, ignoring");
            return;
        }

        session.drop_peer();
        session.negotiation = Some(negotiation);
        session.state = MediaState::Negotiating;

        let signals = PeerSignals::new(slot, negotiation, events);
        session.negotiation_task = Some(spawn_negotiation(factory, signals, sdp));

        debug!(slot = %slot, generation, negotiation, "Offer received, negotiating");
        port.update_slot_status(slot, &format!("{}: negotiating...", camera(slot)));
    }

    /// Sends the answer once candidate gathering is complete.
    pub fn on_ice_gathering_complete(
        &mut self,
        slot: SlotId,
        generation: u64,
        sdp: String,
        port: &mut dyn PresentationPort,
    ) {
        let Some(session) = self.peer_session(slot, generation) else {
            debug!(slot = %slot, generation, "Gathering finished for superseded negotiation");
            return;
        };
        if session.answer_sent
            || !matches!(session.state, MediaState::Negotiating | MediaState::Connected)
        {
            return;
        }

        if session.send(&RelayCommand::Answer { sdp }) {
            session.answer_sent = true;
            debug!(slot = %slot, generation, "Answer sent");
            port.append_slot_log(slot, LogEntry::info(format!("{}: answer sent", camera(slot))));
        }
    }

    /// Maps a peer connectivity change onto the session.
    pub fn on_connectivity_change(
        &mut self,
        slot: SlotId,
        generation: u64,
        state: ConnectivityState,
        registry: &Registry,
        port: &mut dyn PresentationPort,
    ) {
        let Some(session) = self.peer_session(slot, generation) else {
            return;
        };

        debug!(slot = %slot, generation, connectivity = %state, "Peer connectivity changed");
        let label = camera_label(slot, registry);

        match state {
            ConnectivityState::Connected | ConnectivityState::Completed => {
                if session.state == MediaState::Connected {
                    return;
                }
                session.state = MediaState::Connected;
                info!(slot = %slot, "Media session connected");
                port.update_slot_status(slot, &format!("Connected - {label}"));
                port.append_slot_log(slot, LogEntry::info(format!("{label}: video connected")));
            }
            ConnectivityState::Failed => {
                session.retire(MediaState::Failed);
                warn!(slot = %slot, "Peer connectivity failed");
                port.update_slot_status(slot, &format!("{label}: failed"));
                port.append_slot_log(slot, LogEntry::error(format!("{label}: connection failed")));
            }
            ConnectivityState::Closed => {
                session.retire(MediaState::Closed);
                port.update_slot_status(slot, &format!("{label}: closed"));
            }
            ConnectivityState::Disconnected => {
                port.update_slot_status(slot, &format!("{label}: disconnected"));
            }
            ConnectivityState::New | ConnectivityState::Checking => {}
        }
    }

    /// Fails the slot's session if `generation` is its relay generation.
    pub fn fail(
        &mut self,
        slot: SlotId,
        generation: u64,
        reason: &str,
        port: &mut dyn PresentationPort,
    ) {
        if self.relay_session(slot, generation).is_some() {
            self.fail_session(slot, reason, port);
        }
    }

    fn fail_session(&mut self, slot: SlotId, reason: &str, port: &mut dyn PresentationPort) {
        if let Some(session) = self.sessions.get_mut(&slot) {
            session.retire(MediaState::Failed);
        }
        warn!(slot = %slot, reason, "Media session failed");
        port.update_slot_status(slot, &format!("{}: error", camera(slot)));
        port.append_slot_log(slot, LogEntry::error(format!("{}: {reason}", camera(slot))));
    }

    /// Closes the slot's session. Safe when none exists.
    pub fn disconnect(&mut self, slot: SlotId, port: &mut dyn PresentationPort) {
        let Some(session) = self.sessions.get_mut(&slot) else {
            return;
        };

        let was_live = session.state.is_live();
        session.send(&RelayCommand::Close);
        session.retire(MediaState::Closed);

        port.update_slot_status(slot, "Disconnected");
        if was_live {
            info!(slot = %slot, "Media session closed");
            port.append_slot_log(slot, LogEntry::info(format!("{}: disconnected", camera(slot))));
        }
    }

    /// Closes every session.
    pub fn disconnect_all(&mut self, port: &mut dyn PresentationPort) {
        let mut slots: Vec<SlotId> = self.sessions.keys().copied().collect();
        slots.sort();
        for slot in slots {
            self.disconnect(slot, port);
        }
    }

    /// Asks the relay for a different preset and renegotiates.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::NotConnected` unless the session is `Connected`.
    pub fn change_quality(
        &mut self,
        slot: SlotId,
        preset: QualityPreset,
        port: &mut dyn PresentationPort,
    ) -> Result<(), MediaError> {
        let state = self.state(slot);
        let session = match self.sessions.get_mut(&slot) {
            Some(session) if session.state == MediaState::Connected => session,
            _ => return Err(MediaError::NotConnected { slot, state }),
        };

        session.send(&RelayCommand::ChangeQuality(preset));
        session.quality = Some(preset);
        session.drop_peer();
        session.state = MediaState::AwaitingOffer;

        info!(slot = %slot, quality = %preset, "Quality change requested");
        port.update_slot_status(slot, &format!("{}: switching to {preset}...", camera(slot)));
        port.append_slot_log(slot, LogEntry::info(format!("Quality changed to {preset}")));
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Current state of the slot's session (`Idle` if none).
    pub fn state(&self, slot: SlotId) -> MediaState {
        self.sessions
            .get(&slot)
            .map(|s| s.state)
            .unwrap_or_default()
    }

    /// Quality preset last requested for the slot.
    pub fn quality(&self, slot: SlotId) -> Option<QualityPreset> {
        self.sessions.get(&slot).and_then(|s| s.quality)
    }

    /// Number of sessions in a live state.
    pub fn live_sessions(&self) -> usize {
        self.sessions.values().filter(|s| s.state.is_live()).count()
    }

    /// State of every slot that ever had a session.
    pub fn states(&self) -> BTreeMap<SlotId, MediaState> {
        self.sessions.iter().map(|(slot, s)| (*slot, s.state)).collect()
    }
}

// ============================================================================
// Spawned Tasks
// ============================================================================

fn spawn_relay(connector: Arc<dyn Connector>, url: String, signals: PeerSignals) -> AbortHandle {
    tokio::spawn(async move {
        let Duplex {
            outbound,
            mut inbound,
        } = match connector.open(&url).await {
            Ok(duplex) => duplex,
            Err(e) => {
                signals.emit(MediaEventKind::RelayClosed { error: Some(e) });
                return;
            }
        };

        signals.emit(MediaEventKind::RelayOpened { outbound });

        while let Some(item) = inbound.recv().await {
            match item {
                Ok(frame) => signals.emit(MediaEventKind::RelayFrame(frame)),
                Err(e) => {
                    signals.emit(MediaEventKind::RelayClosed { error: Some(e) });
                    return;
                }
            }
        }
        signals.emit(MediaEventKind::RelayClosed { error: None });
    })
    .abort_handle()
}

fn spawn_negotiation(
    factory: Arc<dyn PeerMediaFactory>,
    signals: PeerSignals,
    offer: String,
) -> AbortHandle {
    tokio::spawn(async move {
        let peer = match factory.create(signals.slot(), signals.clone()).await {
            Ok(peer) => peer,
            Err(e) => {
                signals.emit(MediaEventKind::NegotiationFailed(e.to_string()));
                return;
            }
        };
        // Hand ownership over before anything else can suspend, so an abort
        // never leaks the peer.
        signals.emit(MediaEventKind::PeerCreated(Arc::clone(&peer)));

        if let Err(e) = peer.accept_offer(offer).await {
            signals.emit(MediaEventKind::NegotiationFailed(e.to_string()));
            return;
        }

        match peer.gathering_complete().await {
            Ok(sdp) => signals.emit(MediaEventKind::GatheringComplete { sdp }),
            Err(e) => signals.emit(MediaEventKind::NegotiationFailed(e.to_string())),
        }
    })
    .abort_handle()
}
