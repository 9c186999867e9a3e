//! Message transport seam shared by the control channel and relay links.
//!
//! A [`Connector`] turns a URL into a [`Duplex`]: an ordered, reliable pair
//! of text channels. Dropping the outbound sender closes the connection;
//! the inbound receiver ends when the remote side goes away. Concrete
//! connectors (WebSocket in the front-end, in-memory fakes in tests) only
//! have to pump frames between the network and a [`DuplexPeer`].
//!
//! # Panic-Free Guarantees
//!
//! Channel send failures mean the other half was dropped and are treated
//! as a closed connection, never as a fault.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised by transports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("failed to connect to {url}: {reason}")]
    Connect {
        /// Target URL
        url: String,
        /// Underlying failure
        reason: String,
    },

    /// Connecting took longer than the configured timeout.
    #[error("connection to {url} timed out after {timeout:?}")]
    Timeout {
        /// Target URL
        url: String,
        /// Timeout that elapsed
        timeout: Duration,
    },

    /// The established connection failed.
    #[error("transport error: {0}")]
    Io(String),
}

/// Item delivered on the inbound side of a [`Duplex`].
pub type Inbound = Result<String, TransportError>;

/// Local end of an open connection.
#[derive(Debug)]
pub struct Duplex {
    /// Frames to send. Dropping this closes the connection.
    pub outbound: mpsc::UnboundedSender<String>,
    /// Frames received. An `Err` item is followed by the end of the stream.
    pub inbound: mpsc::UnboundedReceiver<Inbound>,
}

/// Transport-side end of a [`Duplex`].
#[derive(Debug)]
pub struct DuplexPeer {
    /// Frames the local side asked to send. Yields `None` once the local
    /// side dropped its outbound sender.
    pub outgoing: mpsc::UnboundedReceiver<String>,
    /// Sink for frames received from the network.
    pub incoming: mpsc::UnboundedSender<Inbound>,
}

impl Duplex {
    /// Creates a connected duplex and its transport-side peer.
    pub fn channel() -> (Duplex, DuplexPeer) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        (
            Duplex {
                outbound: out_tx,
                inbound: in_rx,
            },
            DuplexPeer {
                outgoing: out_rx,
                incoming: in_tx,
            },
        )
    }
}

/// Opens message transports.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a connection to `url`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Connect` or `TransportError::Timeout` if the
    /// connection cannot be established.
    async fn open(&self, url: &str) -> Result<Duplex, TransportError>;
}
