//! pdvmon front-end - library modules
//!
//! Wires the session core to a terminal: config loading, the WebSocket
//! and WebRTC implementations of the session's transport seams, and a
//! ratatui board rendered from the session's [`SlotBoard`] projection.
//!
//! # Architecture
//!
//! The binary runs three tasks:
//!
//! 1. **Keyboard Task**: polls crossterm for input and forwards key events
//! 2. **Session Watcher**: forwards `SessionEvent`s so the board redraws
//! 3. **Main Event Loop**: applies keys to [`App`], dispatches actions to
//!    the [`SessionHandle`] and renders
//!
//! All tasks respect a shared `CancellationToken` for graceful shutdown.
//!
//! [`SlotBoard`]: pdvmon_session::SlotBoard
//! [`SessionHandle`]: pdvmon_session::SessionHandle

pub mod app;
pub mod config;
pub mod error;
pub mod input;
pub mod rtc;
pub mod ui;
pub mod ws;

pub use app::App;
pub use config::DashboardConfig;
pub use error::{Result, TuiError};
pub use rtc::RtcPeerFactory;
pub use ws::WsConnector;
