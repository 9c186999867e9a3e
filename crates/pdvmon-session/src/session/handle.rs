//! Client interface for interacting with the session actor.
//!
//! # Panic-Free Guarantees
//!
//! Channel errors are mapped to `SessionError::ChannelClosed`.

use tokio::sync::{broadcast, mpsc, oneshot};

use pdvmon_core::{QualityPreset, SlotId};

use super::commands::{LinkState, SessionCommand, SessionError, SessionEvent, SessionSnapshot};

// ============================================================================
// Session Handle
// ============================================================================

/// Cheap-to-clone handle to the session actor.
///
/// The actor shuts down, tearing every link and feed down, once all
/// handles are dropped.
///
/// ```ignore
/// let handle = spawn_session(config, board.clone(), transports);
/// handle.connect_server().await?;
/// handle.register_terminal(SlotId::new(1)).await?;
/// ```
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionCommand>,
    event_sender: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    pub(crate) fn new(
        sender: mpsc::Sender<SessionCommand>,
        event_sender: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            sender,
            event_sender,
        }
    }

    async fn request(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<(), SessionError>>) -> SessionCommand,
    ) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(build(tx))
            .await
            .map_err(|_| SessionError::ChannelClosed)?;

        rx.await.map_err(|_| SessionError::ChannelClosed)?
    }

    /// Opens the control channel to the backend address input.
    ///
    /// # Errors
    ///
    /// - `SessionError::MissingInput` if no backend address was entered
    /// - `SessionError::ChannelClosed` if the actor has shut down
    pub async fn connect_server(&self) -> Result<(), SessionError> {
        self.request(|respond_to| SessionCommand::ConnectServer { respond_to })
            .await
    }

    /// Closes the control channel and resets every slot.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ChannelClosed` if the actor has shut down.
    pub async fn disconnect_server(&self) -> Result<(), SessionError> {
        self.request(|respond_to| SessionCommand::DisconnectServer { respond_to })
            .await
    }

    /// Registers the slot's terminal address input with the backend.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotConnected` without an open control channel
    /// - `SessionError::MissingInput` if no address was entered
    /// - `SessionError::Domain` if the slot is out of range
    /// - `SessionError::ChannelClosed` if the actor has shut down
    pub async fn register_terminal(&self, slot: SlotId) -> Result<(), SessionError> {
        self.request(|respond_to| SessionCommand::RegisterTerminal { slot, respond_to })
            .await
    }

    /// Starts the slot's video feed.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotConnected` without an open control channel
    /// - `SessionError::MissingInput` if no source URL was entered
    /// - `SessionError::ChannelClosed` if the actor has shut down
    pub async fn start_feed(&self, slot: SlotId) -> Result<(), SessionError> {
        self.request(|respond_to| SessionCommand::StartFeed { slot, respond_to })
            .await
    }

    /// Stops the slot's video feed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ChannelClosed` if the actor has shut down.
    pub async fn stop_feed(&self, slot: SlotId) -> Result<(), SessionError> {
        self.request(|respond_to| SessionCommand::StopFeed { slot, respond_to })
            .await
    }

    /// Renegotiates the slot's feed with `preset`.
    ///
    /// # Errors
    ///
    /// - `SessionError::Media` unless the feed is connected
    /// - `SessionError::ChannelClosed` if the actor has shut down
    pub async fn change_quality(
        &self,
        slot: SlotId,
        preset: QualityPreset,
    ) -> Result<(), SessionError> {
        self.request(|respond_to| SessionCommand::ChangeQuality {
            slot,
            preset,
            respond_to,
        })
        .await
    }

    /// Dismisses the slot's inactivity alert.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ChannelClosed` if the actor has shut down.
    pub async fn dismiss_alert(&self, slot: SlotId) -> Result<(), SessionError> {
        self.request(|respond_to| SessionCommand::DismissAlert { slot, respond_to })
            .await
    }

    /// Returns the current session state.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ChannelClosed` if the actor has shut down.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(SessionCommand::Snapshot { respond_to: tx })
            .await
            .map_err(|_| SessionError::ChannelClosed)?;

        rx.await.map_err(|_| SessionError::ChannelClosed)
    }

    /// Returns true if the control channel is open.
    pub async fn is_connected(&self) -> bool {
        matches!(
            self.snapshot().await,
            Ok(SessionSnapshot {
                link: LinkState::Connected,
                ..
            })
        )
    }

    /// Subscribes to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_sender.subscribe()
    }
}
