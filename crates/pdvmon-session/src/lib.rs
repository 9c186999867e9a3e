//! pdvmon Session - Slot multiplexing and negotiation layer
//!
//! This crate is the core of the dashboard:
//! - `registry` - slot ↔ terminal address bijection
//! - `router` - inbound control and relay frame dispatch
//! - `media` - per-slot offer/answer state machine
//! - `alerts` - inactivity alert queue and exclusive presentation
//! - `session` - control-channel lifecycle actor tying the above together
//! - `presenter` - presentation port and the shared board projection
//! - `transport` - connector seam for the control channel and relays
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       SessionActor                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  control link ──▶ SignalingRouter ──┬──▶ Registry (lookup)  │
//! │                                     ├──▶ AlertScheduler     │
//! │  relay tasks  ──▶ MediaSessionManager ◀┘                    │
//! │                                                             │
//! │                 all effects ──▶ PresentationPort            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod alerts;
pub mod media;
pub mod presenter;
pub mod registry;
pub mod router;
pub mod session;
pub mod transport;

pub use alerts::{Alert, AlertDisposition, AlertScheduler, AlertView};
pub use media::{
    MediaError, MediaEvent, MediaEventKind, MediaSessionManager, PeerError, PeerMedia,
    PeerMediaFactory, PeerSignals, RelayFrameIn,
};
pub use presenter::{BoardState, PresentationPort, SlotBoard, SlotView, MAX_LOG_ENTRIES};
pub use registry::{Displaced, Registry};
pub use router::{RouteContext, RouteError, Routed, RouterStats, SignalingRouter};
pub use session::{
    spawn_session, LinkState, SessionConfig, SessionError, SessionEvent, SessionHandle,
    SessionSnapshot, Transports, DEFAULT_CONTROL_PORT,
};
pub use transport::{Connector, Duplex, DuplexPeer, Inbound, TransportError};
