//! Session actor - owns the control link and every per-slot component.
//!
//! The actor is the single owner of the registry, alert scheduler, media
//! session manager, router and presentation port. It handles one input at a
//! time from three sources: operator commands, control-link signals, and
//! media completions. Handlers never block; anything that suspends runs in a
//! spawned task that reports back through a channel.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the crate's panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Response and event send failures are ignored (the requester went away)

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use pdvmon_core::{LogEntry, SlotId, TerminalAddress};
use pdvmon_protocol::ControlCommand;

use crate::alerts::AlertScheduler;
use crate::media::{MediaEvent, MediaSessionManager};
use crate::presenter::PresentationPort;
use crate::registry::Registry;
use crate::router::{RouteContext, SignalingRouter};
use crate::transport::Connector;

use super::commands::{LinkState, SessionCommand, SessionError, SessionEvent, SessionSnapshot};
use super::link::{control_url, relay_url, spawn_control_link, ControlSignal, ControlSignalKind};
use super::{SessionConfig, Transports};

/// Control-channel lifecycle.
enum ControlLink {
    Down,
    Opening {
        generation: u64,
        task: AbortHandle,
        relay_url: String,
    },
    Up {
        generation: u64,
        task: AbortHandle,
        outbound: mpsc::UnboundedSender<String>,
        relay_url: String,
    },
}

impl ControlLink {
    fn generation(&self) -> Option<u64> {
        match self {
            Self::Down => None,
            Self::Opening { generation, .. } | Self::Up { generation, .. } => Some(*generation),
        }
    }

    fn state(&self) -> LinkState {
        match self {
            Self::Down => LinkState::Disconnected,
            Self::Opening { .. } => LinkState::Connecting,
            Self::Up { .. } => LinkState::Connected,
        }
    }
}

// ============================================================================
// Session Actor
// ============================================================================

/// The session actor.
///
/// Spawn it with [`spawn_session`](super::spawn_session) and talk to it
/// through a [`SessionHandle`](super::SessionHandle).
pub struct SessionActor<P: PresentationPort> {
    commands: mpsc::Receiver<SessionCommand>,
    control_tx: mpsc::UnboundedSender<ControlSignal>,
    control_rx: mpsc::UnboundedReceiver<ControlSignal>,
    media_rx: mpsc::UnboundedReceiver<MediaEvent>,
    event_publisher: broadcast::Sender<SessionEvent>,

    config: SessionConfig,
    connector: Arc<dyn Connector>,
    link: ControlLink,
    next_link_generation: u64,

    registry: Registry,
    alerts: AlertScheduler,
    media: MediaSessionManager,
    router: SignalingRouter,
    port: P,
}

impl<P: PresentationPort> SessionActor<P> {
    pub(crate) fn new(
        commands: mpsc::Receiver<SessionCommand>,
        event_publisher: broadcast::Sender<SessionEvent>,
        config: SessionConfig,
        port: P,
        transports: Transports,
    ) -> Self {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (media_tx, media_rx) = mpsc::unbounded_channel();
        let media = MediaSessionManager::new(Arc::clone(&transports.connector), transports.peers, media_tx);

        Self {
            commands,
            control_tx,
            control_rx,
            media_rx,
            event_publisher,
            config,
            connector: transports.connector,
            link: ControlLink::Down,
            next_link_generation: 1,
            registry: Registry::new(),
            alerts: AlertScheduler::new(),
            media,
            router: SignalingRouter::new(),
            port,
        }
    }

    /// Runs the actor until every handle is dropped.
    pub async fn run(mut self) {
        info!(slots = self.config.layout.count(), "Session actor starting");

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                Some(signal) = self.control_rx.recv() => self.handle_control(signal),
                Some(event) = self.media_rx.recv() => self.handle_media(event),
            }
            let _ = self.event_publisher.send(SessionEvent::Updated);
        }

        self.close_link();
        self.reset_to_baseline("Disconnected");
        info!(
            live_media = self.media.live_sessions(),
            "Session actor stopped"
        );
    }

    fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::ConnectServer { respond_to } => {
                let _ = respond_to.send(self.handle_connect_server());
            }
            SessionCommand::DisconnectServer { respond_to } => {
                self.handle_disconnect_server();
                let _ = respond_to.send(Ok(()));
            }
            SessionCommand::RegisterTerminal { slot, respond_to } => {
                let _ = respond_to.send(self.handle_register_terminal(slot));
            }
            SessionCommand::StartFeed { slot, respond_to } => {
                let _ = respond_to.send(self.handle_start_feed(slot));
            }
            SessionCommand::StopFeed { slot, respond_to } => {
                let result = self.check_slot(slot).map(|()| {
                    self.media.disconnect(slot, &mut self.port);
                    self.port.update_slot_status(slot, "Disconnected");
                });
                let _ = respond_to.send(result);
            }
            SessionCommand::ChangeQuality {
                slot,
                preset,
                respond_to,
            } => {
                let result = self.check_slot(slot).and_then(|()| {
                    self.media
                        .change_quality(slot, preset, &mut self.port)
                        .map_err(SessionError::from)
                });
                let _ = respond_to.send(result);
            }
            SessionCommand::DismissAlert { slot, respond_to } => {
                let result = self.check_slot(slot).map(|()| {
                    self.alerts.clear(slot, &mut self.port);
                });
                let _ = respond_to.send(result);
            }
            SessionCommand::Snapshot { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    fn check_slot(&self, slot: SlotId) -> Result<(), SessionError> {
        self.config.layout.slot(slot.get())?;
        Ok(())
    }

    fn handle_connect_server(&mut self) -> Result<(), SessionError> {
        let server = self
            .port
            .server_address_input()
            .ok_or(SessionError::MissingInput("server address"))?;

        if !matches!(self.link, ControlLink::Down) {
            self.close_link();
            self.reset_to_baseline("Disconnected");
        }

        let generation = self.next_link_generation;
        self.next_link_generation += 1;

        let url = control_url(&server, self.config.control_port);
        let task = spawn_control_link(
            Arc::clone(&self.connector),
            url.clone(),
            generation,
            self.control_tx.clone(),
        );
        self.link = ControlLink::Opening {
            generation,
            task,
            relay_url: relay_url(&server),
        };

        info!(url = %url, generation, "Connecting to backend");
        self.port
            .update_server_status(&format!("Connecting to {url}..."), false);
        self.publish_link();
        Ok(())
    }

    fn handle_disconnect_server(&mut self) {
        if !matches!(self.link, ControlLink::Down) {
            info!("Disconnecting from backend");
        }
        self.close_link();
        self.reset_to_baseline("Disconnected");
        self.publish_link();
    }

    fn handle_register_terminal(&mut self, slot: SlotId) -> Result<(), SessionError> {
        self.check_slot(slot)?;

        let outbound = match &self.link {
            ControlLink::Up { outbound, .. } => outbound.clone(),
            _ => {
                self.port.append_slot_log(
                    slot,
                    LogEntry::error("Not connected to the backend"),
                );
                return Err(SessionError::NotConnected);
            }
        };

        let input = self
            .port
            .terminal_address_input(slot)
            .ok_or(SessionError::MissingInput("terminal address"))?;
        let address = TerminalAddress::parse(&input)?;
        let frame = ControlCommand::register(address.clone()).to_frame()?;

        self.alerts.clear(slot, &mut self.port);
        let displaced = self.registry.register(slot, address.clone());
        if let Some(previous) = displaced.previous_slot.filter(|s| *s != slot) {
            self.alerts.clear(previous, &mut self.port);
            self.port.update_slot_status(previous, "Unassigned");
            self.port.append_slot_log(
                previous,
                LogEntry::info(format!("{} moved to slot {slot}", address.label())),
            );
        }

        let _ = outbound.send(frame);

        let label = address.label();
        info!(slot = %slot, address = %address, "Registering terminal");
        self.port
            .update_slot_status(slot, &format!("Connecting {label}..."));
        self.port
            .append_slot_log(slot, LogEntry::info(format!("Registering {label} ({address})")));
        Ok(())
    }

    fn handle_start_feed(&mut self, slot: SlotId) -> Result<(), SessionError> {
        self.check_slot(slot)?;

        let relay = match &self.link {
            ControlLink::Up { relay_url, .. } => relay_url.clone(),
            _ => {
                self.port.append_slot_log(
                    slot,
                    LogEntry::error("Connect to the backend before starting a camera"),
                );
                return Err(SessionError::NotConnected);
            }
        };

        let source = self
            .port
            .source_url(slot)
            .ok_or(SessionError::MissingInput("source URL"))?;
        let quality = self
            .media
            .quality(slot)
            .or_else(|| self.config.slot_quality.get(&slot).copied())
            .or(self.config.default_quality);

        self.media
            .connect(slot, &relay, source, quality, &mut self.port);
        Ok(())
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            link: self.link.state(),
            registrations: self.registry.registrations(),
            media: self.media.states(),
            live_media: self.media.live_sessions(),
            alerts: self.alerts.active(),
            exclusive: self.alerts.exclusive_slot(),
            queued_alerts: self.alerts.queued_len(),
            router: self.router.stats(),
        }
    }

    // ========================================================================
    // Control Link
    // ========================================================================

    fn handle_control(&mut self, signal: ControlSignal) {
        if self.link.generation() != Some(signal.generation) {
            debug!(generation = signal.generation, "Ignoring signal from old control link");
            return;
        }

        match signal.kind {
            ControlSignalKind::Opened(outbound) => {
                if let ControlLink::Opening {
                    generation,
                    task,
                    relay_url,
                } = std::mem::replace(&mut self.link, ControlLink::Down)
                {
                    self.link = ControlLink::Up {
                        generation,
                        task,
                        outbound,
                        relay_url,
                    };
                    info!(generation, "Connected to backend");
                    self.port.update_server_status("Connected", true);
                    self.publish_link();
                }
            }
            ControlSignalKind::Frame(frame) => {
                debug!(len = frame.len(), "Control frame received");
                let ctx = RouteContext {
                    registry: &self.registry,
                    alerts: &mut self.alerts,
                    media: &mut self.media,
                    port: &mut self.port,
                };
                if let Err(e) = self.router.dispatch_control(&frame, ctx) {
                    warn!(error = %e, "Dropping control message");
                }
            }
            ControlSignalKind::Failed(e) => {
                error!(error = %e, "Backend connection failed");
                self.link = ControlLink::Down;
                self.reset_to_baseline(&format!("Connection failed: {e}"));
                self.publish_link();
            }
            ControlSignalKind::Closed(reason) => {
                let status = match reason {
                    Some(e) => {
                        error!(error = %e, "Backend connection lost");
                        format!("Connection lost: {e}")
                    }
                    None => {
                        error!("Backend closed the connection");
                        "Connection lost".to_string()
                    }
                };
                self.link = ControlLink::Down;
                self.reset_to_baseline(&status);
                self.publish_link();
            }
        }
    }

    fn close_link(&mut self) {
        match std::mem::replace(&mut self.link, ControlLink::Down) {
            ControlLink::Down => {}
            ControlLink::Opening { task, .. } | ControlLink::Up { task, .. } => task.abort(),
        }
    }

    /// Returns every component to its initial state.
    fn reset_to_baseline(&mut self, server_status: &str) {
        self.media.disconnect_all(&mut self.port);
        self.alerts.clear_all(&mut self.port);
        self.registry.clear_all();
        for slot in self.config.layout.slots() {
            self.port.update_slot_status(slot, "Disconnected");
            self.port.clear_slot_log(slot);
        }
        self.port.update_server_status(server_status, false);
    }

    fn publish_link(&self) {
        let _ = self
            .event_publisher
            .send(SessionEvent::LinkChanged(self.link.state()));
    }

    // ========================================================================
    // Media
    // ========================================================================

    fn handle_media(&mut self, event: MediaEvent) {
        let Some(frame) = self
            .media
            .handle_event(event, &self.registry, &mut self.port)
        else {
            return;
        };

        let ctx = RouteContext {
            registry: &self.registry,
            alerts: &mut self.alerts,
            media: &mut self.media,
            port: &mut self.port,
        };
        if let Err(e) = self.router.dispatch_relay(frame, ctx) {
            debug!(error = %e, "Relay frame rejected");
        }
    }
}
