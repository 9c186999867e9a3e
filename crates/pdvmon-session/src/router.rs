//! Signaling router - single inbound dispatch point.
//!
//! Control-channel frames are parsed and routed by `type` to the registry
//! lookups, slot logs and the alert scheduler. Relay frames are routed to
//! the media session manager. Each frame is handled in isolation: a
//! malformed one is rejected before anything is mutated and leaves later
//! frames unaffected.

use thiserror::Error;
use tracing::{debug, warn};

use pdvmon_core::{LogEntry, SlotId, TerminalAddress};
use pdvmon_protocol::{ControlEvent, ProtocolError, RelayEvent};

use crate::alerts::{Alert, AlertDisposition, AlertScheduler};
use crate::media::{MediaSessionManager, RelayFrameIn};
use crate::presenter::PresentationPort;
use crate::registry::Registry;

/// Errors returned when a frame cannot be routed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The frame failed to parse or validate.
    #[error("malformed message: {0}")]
    Malformed(#[from] ProtocolError),
}

/// What a routed frame did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Backend answered a register command for this slot.
    RegisterAck { slot: SlotId, success: bool },
    /// A terminal data line was appended to this slot's log.
    Data { slot: SlotId },
    /// An inactivity alert was submitted for this slot.
    Alert {
        slot: SlotId,
        disposition: AlertDisposition,
    },
    /// The address is not registered to any slot; dropped.
    Unresolved { kind: String, address: TerminalAddress },
    /// A relay offer was handed to the media manager.
    Offer { slot: SlotId },
    /// Well-formed but not acted upon.
    Ignored { kind: String },
}

/// Counters kept by the router.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    pub routed: u64,
    pub unresolved: u64,
    pub malformed: u64,
    pub ignored: u64,
}

/// Components a frame may touch while being routed.
pub struct RouteContext<'a> {
    pub registry: &'a Registry,
    pub alerts: &'a mut AlertScheduler,
    pub media: &'a mut MediaSessionManager,
    pub port: &'a mut dyn PresentationPort,
}

/// Demultiplexes inbound frames.
#[derive(Debug, Default)]
pub struct SignalingRouter {
    stats: RouterStats,
}

impl SignalingRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> RouterStats {
        self.stats
    }

    /// Routes one control-channel frame.
    ///
    /// # Errors
    ///
    /// Returns `RouteError::Malformed` if the frame does not parse. Nothing
    /// is mutated in that case.
    pub fn dispatch_control(
        &mut self,
        frame: &str,
        ctx: RouteContext<'_>,
    ) -> Result<Routed, RouteError> {
        let event = match ControlEvent::parse(frame) {
            Ok(event) => event,
            Err(e) => {
                self.stats.malformed += 1;
                return Err(e.into());
            }
        };

        let kind = event.kind().to_string();
        let resolved = event
            .address()
            .map(|address| (address.clone(), ctx.registry.resolve_slot(address)));

        let routed = match (event, resolved) {
            (ControlEvent::Unknown { kind }, _) => {
                debug!(kind = %kind, "Ignoring unknown control message");
                Routed::Ignored { kind }
            }
            (_, Some((address, None))) => {
                if kind == pdvmon_protocol::REGISTER_RESPONSE {
                    warn!(address = %address, "Register response for unregistered terminal");
                } else {
                    debug!(kind = %kind, address = %address, "No slot for terminal, dropping");
                }
                Routed::Unresolved { kind, address }
            }
            (event, Some((_, Some(slot)))) => Self::apply(event, slot, ctx),
            (_, None) => Routed::Ignored { kind },
        };

        match routed {
            Routed::Unresolved { .. } => self.stats.unresolved += 1,
            Routed::Ignored { .. } => self.stats.ignored += 1,
            _ => self.stats.routed += 1,
        }
        Ok(routed)
    }

    fn apply(event: ControlEvent, slot: SlotId, ctx: RouteContext<'_>) -> Routed {
        match event {
            ControlEvent::RegisterResponse { address, success } => {
                let label = address.label();
                if success {
                    debug!(slot = %slot, address = %address, "Terminal registered");
                    ctx.port
                        .update_slot_status(slot, &format!("Connected - {label} ({address})"));
                    ctx.port
                        .append_slot_log(slot, LogEntry::info(format!("Connected to {label}")));
                } else {
                    warn!(slot = %slot, address = %address, "Backend rejected registration");
                    ctx.port.update_slot_status(slot, &format!("Failed - {label}"));
                    ctx.port.append_slot_log(
                        slot,
                        LogEntry::error(format!("Failed to register {label} ({address})")),
                    );
                }
                Routed::RegisterAck { slot, success }
            }
            ControlEvent::TerminalData { data, .. } => {
                ctx.port.append_slot_log(slot, LogEntry::data(data));
                Routed::Data { slot }
            }
            ControlEvent::InactivityTimeout { address, inactive } => {
                let disposition = ctx.alerts.add(Alert::new(slot, address, inactive), ctx.port);
                Routed::Alert { slot, disposition }
            }
            ControlEvent::Unknown { kind } => Routed::Ignored { kind },
        }
    }

    /// Routes one relay frame for a slot's media session.
    ///
    /// An unparseable frame or an offer without `sdp` fails that slot only.
    ///
    /// # Errors
    ///
    /// Returns `RouteError::Malformed` after failing the slot.
    pub fn dispatch_relay(
        &mut self,
        frame: RelayFrameIn,
        ctx: RouteContext<'_>,
    ) -> Result<Routed, RouteError> {
        let RelayFrameIn {
            slot,
            generation,
            frame,
        } = frame;

        match RelayEvent::parse(&frame) {
            Ok(RelayEvent::Offer { sdp }) => {
                ctx.media.on_offer_received(slot, generation, sdp, ctx.port);
                self.stats.routed += 1;
                Ok(Routed::Offer { slot })
            }
            Ok(RelayEvent::Other { kind }) => {
                let kind = kind.unwrap_or_else(|| "<untyped>".to_string());
                debug!(slot = %slot, kind = %kind, "Ignoring relay frame");
                self.stats.ignored += 1;
                Ok(Routed::Ignored { kind })
            }
            Err(e) => {
                warn!(slot = %slot, error = %e, "Malformed relay frame");
                ctx.media.fail(slot, generation, &e.to_string(), ctx.port);
                self.stats.malformed += 1;
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use pdvmon_core::{LogLevel, SlotLayout};
    use tokio::sync::mpsc;

    use crate::media::{MediaEvent, PeerError, PeerMedia, PeerMediaFactory, PeerSignals};
    use crate::presenter::SlotBoard;
    use crate::transport::{Connector, Duplex, TransportError};

    // ========================================================================
    // Test Helpers
    // ========================================================================

    struct NoConnector;

    #[async_trait]
    impl Connector for NoConnector {
        async fn open(&self, url: &str) -> Result<Duplex, TransportError> {
            Err(TransportError::Connect {
                url: url.to_string(),
                reason: "offline".to_string(),
            })
        }
    }

    struct NoPeers;

    #[async_trait]
    impl PeerMediaFactory for NoPeers {
        async fn create(
            &self,
            _slot: SlotId,
            _signals: PeerSignals,
        ) -> Result<Arc<dyn PeerMedia>, PeerError> {
            Err(PeerError::Setup("offline".to_string()))
        }
    }

    struct Fixture {
        router: SignalingRouter,
        registry: Registry,
        alerts: AlertScheduler,
        media: MediaSessionManager,
        board: SlotBoard,
        _events: mpsc::UnboundedReceiver<MediaEvent>,
    }

    impl Fixture {
        fn new() -> Self {
            let (tx, rx) = mpsc::unbounded_channel();
            Self {
                router: SignalingRouter::new(),
                registry: Registry::new(),
                alerts: AlertScheduler::new(),
                media: MediaSessionManager::new(Arc::new(NoConnector), Arc::new(NoPeers), tx),
                board: SlotBoard::new(SlotLayout::default()),
                _events: rx,
            }
        }

        fn control(&mut self, frame: &str) -> Result<Routed, RouteError> {
            let ctx = RouteContext {
                registry: &self.registry,
                alerts: &mut self.alerts,
                media: &mut self.media,
                port: &mut self.board,
            };
            self.router.dispatch_control(frame, ctx)
        }

        fn register(&mut self, slot: u8, address: &str) {
            self.registry
                .register(SlotId::new(slot), TerminalAddress::parse(address).unwrap());
        }
    }

    fn slot(n: u8) -> SlotId {
        SlotId::new(n)
    }

    // ========================================================================
    // Tests
    // ========================================================================

    #[test]
    fn test_register_response_success_updates_status() {
        let mut f = Fixture::new();
        f.register(1, "10.0.0.5");

        let routed = f
            .control(r#"{"type":"register_response","pdv_ip":"10.0.0.5","success":true}"#)
            .unwrap();
        assert_eq!(
            routed,
            Routed::RegisterAck {
                slot: slot(1),
                success: true
            }
        );

        let view = f.board.slot(slot(1)).unwrap();
        assert!(view.status.contains("Connected"));
        assert!(view.status.contains("10.0.0.5"));
        assert_eq!(view.log.back().unwrap().level, LogLevel::Info);
    }

    #[test]
    fn test_register_response_failure() {
        let mut f = Fixture::new();
        f.register(2, "10.0.0.7");
        f.control(r#"{"type":"register_response","pdv_ip":"10.0.0.7","success":false}"#)
            .unwrap();

        let view = f.board.slot(slot(2)).unwrap();
        assert_eq!(view.status, "Failed - PDV 07");
        assert_eq!(view.log.back().unwrap().level, LogLevel::Error);
    }

    #[test]
    fn test_data_appends_one_entry() {
        let mut f = Fixture::new();
        f.register(1, "10.0.0.5");
        f.control(r#"{"type":"pdv_data","pdv_ip":"10.0.0.5","data":"VENDA 12.50"}"#)
            .unwrap();

        let log = f.board.slot(slot(1)).unwrap().log;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].level, LogLevel::Data);
        assert!(log[0].render().contains("VENDA 12.50"));
    }

    #[test]
    fn test_unresolved_address_is_dropped() {
        let mut f = Fixture::new();
        let routed = f
            .control(r#"{"type":"pdv_data","pdv_ip":"10.0.0.99","data":"x"}"#)
            .unwrap();
        assert!(matches!(routed, Routed::Unresolved { .. }));
        assert!(f.board.snapshot().slots.values().all(|v| v.log.is_empty()));
        assert_eq!(f.router.stats().unresolved, 1);
    }

    #[test]
    fn test_malformed_frame_is_isolated() {
        let mut f = Fixture::new();
        f.register(1, "10.0.0.5");
        f.register(2, "10.0.0.6");

        let err = f
            .control(r#"{"type":"pdv_data","pdv_ip":"10.0.0.5"}"#)
            .unwrap_err();
        assert!(matches!(err, RouteError::Malformed(ProtocolError::MissingField { .. })));
        assert!(f.control("not json").is_err());

        f.control(r#"{"type":"pdv_data","pdv_ip":"10.0.0.6","data":"NOVA VENDA"}"#)
            .unwrap();

        assert!(f.board.slot(slot(1)).unwrap().log.is_empty());
        assert_eq!(f.board.slot(slot(2)).unwrap().log.len(), 1);
        assert_eq!(f.router.stats().malformed, 2);
        assert_eq!(f.router.stats().routed, 1);
    }

    #[test]
    fn test_timeout_raises_exclusive_alert() {
        let mut f = Fixture::new();
        f.register(1, "10.0.0.5");

        let routed = f
            .control(r#"{"type":"pdv_inativo_timeout","pdv_ip":"10.0.0.5","inactive_time":90}"#)
            .unwrap();
        assert_eq!(
            routed,
            Routed::Alert {
                slot: slot(1),
                disposition: AlertDisposition::Exclusive
            }
        );
        assert_eq!(f.alerts.exclusive_slot(), Some(slot(1)));
        assert!(f.board.slot(slot(1)).unwrap().exclusive);
    }

    #[test]
    fn test_fractional_timeout_banner() {
        let mut f = Fixture::new();
        f.register(3, "10.0.0.12");
        f.control(r#"{"type":"pdv_inativo_timeout","pdv_ip":"10.0.0.12","inactive_time":12.5}"#)
            .unwrap();
        assert_eq!(
            f.board.slot(slot(3)).unwrap().banner.as_deref(),
            Some("PDV 12 inactive for 12.5s")
        );
    }

    #[test]
    fn test_unknown_type_is_ignored() {
        let mut f = Fixture::new();
        let routed = f.control(r#"{"type":"heartbeat"}"#).unwrap();
        assert_eq!(
            routed,
            Routed::Ignored {
                kind: "heartbeat".to_string()
            }
        );
        assert_eq!(f.router.stats().ignored, 1);
    }

    #[tokio::test]
    async fn test_relay_offer_without_sdp_fails_slot() {
        let mut f = Fixture::new();
        f.media
            .connect(slot(1), "ws://relay", "rtsp://cam".to_string(), None, &mut f.board);

        // Generation 1 is the first one the manager issues
        let frame = RelayFrameIn {
            slot: slot(1),
            generation: 1,
            frame: r#"{"type":"offer"}"#.to_string(),
        };
        let ctx = RouteContext {
            registry: &f.registry,
            alerts: &mut f.alerts,
            media: &mut f.media,
            port: &mut f.board,
        };
        assert!(f.router.dispatch_relay(frame, ctx).is_err());
        assert_eq!(f.media.state(slot(1)), pdvmon_core::MediaState::Failed);
        assert_eq!(f.board.slot(slot(1)).unwrap().status, "Camera 1: error");
    }
}
