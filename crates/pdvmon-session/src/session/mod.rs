//! Connection session using the actor pattern.
//!
//! The session owns the control-channel lifecycle and fans connect and
//! disconnect out to the registry, alert scheduler and media manager.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐  SessionCommand  ┌────────────────┐  PresentationPort  ┌────────────┐
//! │ SessionHandle │─────────────────▶│  SessionActor  │───────────────────▶│ SlotBoard  │
//! └───────────────┘   (mpsc)         └────────────────┘                    └────────────┘
//!                                      ▲          ▲
//!                        ControlSignal │          │ MediaEvent
//!                      (control link)  │          │ (relay + peer tasks)
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All operations in this module follow the panic-free policy:
//! - No `.unwrap()` or `.expect()` in production code
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use pdvmon_core::{QualityPreset, SlotId, SlotLayout};

use crate::media::PeerMediaFactory;
use crate::presenter::PresentationPort;
use crate::transport::Connector;

mod actor;
mod commands;
mod handle;
mod link;

pub use actor::SessionActor;
pub use commands::{LinkState, SessionCommand, SessionError, SessionEvent, SessionSnapshot};
pub use handle::SessionHandle;
pub use link::{control_url, relay_url};

/// Default backend control-channel port.
pub const DEFAULT_CONTROL_PORT: u16 = 8765;

/// Channel buffer sizes
const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 256;

/// Static session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub layout: SlotLayout,
    /// Port substituted into the backend address for the control channel.
    pub control_port: u16,
    /// Preset requested when a slot has none of its own.
    pub default_quality: Option<QualityPreset>,
    pub slot_quality: BTreeMap<SlotId, QualityPreset>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            layout: SlotLayout::default(),
            control_port: DEFAULT_CONTROL_PORT,
            default_quality: None,
            slot_quality: BTreeMap::new(),
        }
    }
}

/// Network primitives used by the session.
#[derive(Clone)]
pub struct Transports {
    /// Opens the control channel and relay links.
    pub connector: Arc<dyn Connector>,
    /// Creates peer media for negotiations.
    pub peers: Arc<dyn PeerMediaFactory>,
}

/// Spawns the session actor and returns a handle for interaction.
///
/// The actor stops, closing every link and feed, when the last handle is
/// dropped.
///
/// # Example
///
/// ```ignore
/// let board = SlotBoard::new(SlotLayout::default());
/// let handle = spawn_session(SessionConfig::default(), board.clone(), transports);
/// board.set_server_address("10.0.0.1:8080");
/// handle.connect_server().await?;
/// ```
pub fn spawn_session<P>(config: SessionConfig, port: P, transports: Transports) -> SessionHandle
where
    P: PresentationPort + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, _) = broadcast::channel(EVENT_BUFFER);

    let actor = SessionActor::new(cmd_rx, event_tx.clone(), config, port, transports);
    tokio::spawn(actor.run());

    SessionHandle::new(cmd_tx, event_tx)
}
