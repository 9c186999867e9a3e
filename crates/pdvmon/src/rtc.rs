//! WebRTC peer media built on the `webrtc` crate.
//!
//! Each slot's negotiation gets its own `RTCPeerConnection` configured
//! with a single receive-only video transceiver. ICE connectivity changes
//! and remote tracks are reported through [`PeerSignals`]; decoded media
//! is not rendered in the terminal, so RTP packets are read and dropped.
//!
//! # Panic-Free Guarantees
//!
//! Every webrtc call is mapped into a [`PeerError`]; callbacks only send on
//! channels and never fail.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;

use pdvmon_core::{ConnectivityState, SlotId};
use pdvmon_session::{PeerError, PeerMedia, PeerMediaFactory, PeerSignals};

use crate::error::{Result, TuiError};

// ============================================================================
// Factory
// ============================================================================

/// Creates one receive-only peer connection per negotiation.
pub struct RtcPeerFactory {
    api: API,
    ice_servers: Vec<String>,
}

impl RtcPeerFactory {
    /// Builds the shared media engine and interceptor registry.
    ///
    /// # Errors
    ///
    /// Returns `TuiError::Media` if codec or interceptor registration fails.
    pub fn new(ice_servers: Vec<String>) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| TuiError::Media(e.to_string()))?;

        let registry = register_default_interceptors(Registry::new(), &mut media_engine)
            .map_err(|e| TuiError::Media(e.to_string()))?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        Ok(Self { api, ice_servers })
    }

    fn configuration(&self) -> RTCConfiguration {
        let ice_servers = if self.ice_servers.is_empty() {
            Vec::new()
        } else {
            vec![RTCIceServer {
                urls: self.ice_servers.clone(),
                ..Default::default()
            }]
        };
        RTCConfiguration {
            ice_servers,
            ..Default::default()
        }
    }
}

#[async_trait]
impl PeerMediaFactory for RtcPeerFactory {
    async fn create(
        &self,
        slot: SlotId,
        signals: PeerSignals,
    ) -> std::result::Result<Arc<dyn PeerMedia>, PeerError> {
        let pc = self
            .api
            .new_peer_connection(self.configuration())
            .await
            .map_err(setup_error)?;
        let pc = Arc::new(pc);
        add_video_receiver(&pc).await?;

        let ice_signals = signals.clone();
        pc.on_ice_connection_state_change(Box::new(move |state: RTCIceConnectionState| {
            debug!(slot = %ice_signals.slot(), %state, "ICE connection state changed");
            if let Some(state) = connectivity(state) {
                ice_signals.connectivity(state);
            }
            Box::pin(async {})
        }));

        let track_signals = signals;
        pc.on_track(Box::new(move |track, _receiver, _transceiver| {
            let kind = track.kind().to_string();
            info!(slot = %track_signals.slot(), kind = %kind, "Remote track attached");
            track_signals.track_attached(kind);
            Box::pin(async move {
                tokio::spawn(async move {
                    while track.read_rtp().await.is_ok() {}
                });
            })
        }));

        debug!(%slot, "Peer connection created");
        Ok(Arc::new(RtcPeer::new(pc)))
    }
}

/// Adds the receive-only video transceiver, closing `pc` if that fails.
async fn add_video_receiver(pc: &RTCPeerConnection) -> std::result::Result<(), PeerError> {
    let added = pc
        .add_transceiver_from_kind(
            RTPCodecType::Video,
            Some(RTCRtpTransceiverInit {
                direction: RTCRtpTransceiverDirection::Recvonly,
                send_encodings: Vec::new(),
            }),
        )
        .await;

    if let Err(e) = added {
        if let Err(close) = pc.close().await {
            warn!(error = %close, "Failed to close peer connection after setup error");
        }
        return Err(setup_error(e));
    }
    Ok(())
}

fn setup_error(e: webrtc::Error) -> PeerError {
    PeerError::Setup(e.to_string())
}

fn negotiation_error(e: webrtc::Error) -> PeerError {
    PeerError::Negotiation(e.to_string())
}

/// Maps ICE states onto the session's connectivity states.
fn connectivity(state: RTCIceConnectionState) -> Option<ConnectivityState> {
    match state {
        RTCIceConnectionState::New => Some(ConnectivityState::New),
        RTCIceConnectionState::Checking => Some(ConnectivityState::Checking),
        RTCIceConnectionState::Connected => Some(ConnectivityState::Connected),
        RTCIceConnectionState::Completed => Some(ConnectivityState::Completed),
        RTCIceConnectionState::Failed => Some(ConnectivityState::Failed),
        RTCIceConnectionState::Disconnected => Some(ConnectivityState::Disconnected),
        RTCIceConnectionState::Closed => Some(ConnectivityState::Closed),
        RTCIceConnectionState::Unspecified => None,
    }
}

// ============================================================================
// Peer
// ============================================================================

/// One negotiation's peer connection.
pub struct RtcPeer {
    pc: Arc<RTCPeerConnection>,
    /// Gathering signal for the answer set by `accept_offer`.
    gathered: Mutex<Option<mpsc::Receiver<()>>>,
}

impl RtcPeer {
    fn new(pc: Arc<RTCPeerConnection>) -> Self {
        Self {
            pc,
            gathered: Mutex::new(None),
        }
    }
}

#[async_trait]
impl PeerMedia for RtcPeer {
    async fn accept_offer(&self, sdp: String) -> std::result::Result<(), PeerError> {
        let offer = RTCSessionDescription::offer(sdp).map_err(negotiation_error)?;
        self.pc
            .set_remote_description(offer)
            .await
            .map_err(negotiation_error)?;

        let answer = self.pc.create_answer(None).await.map_err(negotiation_error)?;

        // Must be taken before the local description starts gathering.
        let gathered = self.pc.gathering_complete_promise().await;
        self.pc
            .set_local_description(answer)
            .await
            .map_err(negotiation_error)?;

        *self.gathered.lock().await = Some(gathered);
        Ok(())
    }

    async fn gathering_complete(&self) -> std::result::Result<String, PeerError> {
        let Some(mut gathered) = self.gathered.lock().await.take() else {
            return Err(PeerError::Negotiation(
                "no local answer to gather candidates for".to_string(),
            ));
        };

        if gathered.recv().await.is_none() {
            return Err(PeerError::GatheringAborted);
        }

        match self.pc.local_description().await {
            Some(description) => Ok(description.sdp),
            None => Err(PeerError::Negotiation(
                "no local description after gathering".to_string(),
            )),
        }
    }

    async fn close(&self) {
        if let Err(e) = self.pc.close().await {
            warn!(error = %e, "Failed to close peer connection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

    #[test]
    fn test_connectivity_mapping() {
        assert_eq!(
            connectivity(RTCIceConnectionState::Completed),
            Some(ConnectivityState::Completed)
        );
        assert_eq!(
            connectivity(RTCIceConnectionState::Disconnected),
            Some(ConnectivityState::Disconnected)
        );
        assert_eq!(connectivity(RTCIceConnectionState::Unspecified), None);
    }

    #[test]
    fn test_factory_builds_with_default_stun() {
        let factory = RtcPeerFactory::new(vec!["stun:stun.l.google.com:19302".to_string()]).unwrap();
        let config = factory.configuration();
        assert_eq!(config.ice_servers.len(), 1);
        assert_eq!(config.ice_servers[0].urls.len(), 1);
    }

    #[test]
    fn test_no_ice_servers_means_host_candidates_only() {
        let factory = RtcPeerFactory::new(Vec::new()).unwrap();
        assert!(factory.configuration().ice_servers.is_empty());
    }

    #[tokio::test]
    async fn test_video_receiver_added_to_open_connection() {
        let factory = RtcPeerFactory::new(Vec::new()).unwrap();
        let pc = factory
            .api
            .new_peer_connection(factory.configuration())
            .await
            .unwrap();

        add_video_receiver(&pc).await.unwrap();
        assert_eq!(pc.get_transceivers().await.len(), 1);
        assert_eq!(pc.connection_state(), RTCPeerConnectionState::New);
        pc.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_video_receiver_failure_leaves_connection_closed() {
        let factory = RtcPeerFactory::new(Vec::new()).unwrap();
        let pc = factory
            .api
            .new_peer_connection(factory.configuration())
            .await
            .unwrap();
        pc.close().await.unwrap();

        let err = add_video_receiver(&pc).await.unwrap_err();
        assert!(matches!(err, PeerError::Setup(_)));
        assert_eq!(pc.connection_state(), RTCPeerConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_gathering_needs_accepted_offer() {
        let factory = RtcPeerFactory::new(Vec::new()).unwrap();
        let pc = factory
            .api
            .new_peer_connection(factory.configuration())
            .await
            .unwrap();
        let peer = RtcPeer::new(Arc::new(pc));

        let err = peer.gathering_complete().await.unwrap_err();
        assert!(matches!(err, PeerError::Negotiation(_)));
        peer.close().await;
    }

    #[test]
    fn test_errors_map_to_peer_errors() {
        let err = setup_error(webrtc::Error::ErrConnectionClosed);
        assert!(matches!(err, PeerError::Setup(_)));
        let err = negotiation_error(webrtc::Error::ErrConnectionClosed);
        assert!(matches!(err, PeerError::Negotiation(_)));
    }
}
