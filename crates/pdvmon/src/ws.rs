//! WebSocket connector for the control channel and relay links.
//!
//! Each opened socket gets a pump task that moves text frames between the
//! network and the session's [`DuplexPeer`]. Binary frames are ignored;
//! pings are answered by tungstenite itself.
//!
//! # Panic-Free Guarantees
//!
//! The pump never unwraps. A failed send to either side ends the pump and
//! drops the socket.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use pdvmon_session::{Connector, Duplex, DuplexPeer, TransportError};

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens WebSocket connections with tokio-tungstenite.
#[derive(Debug, Clone)]
pub struct WsConnector {
    timeout: Duration,
}

impl WsConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, url: &str) -> Result<Duplex, TransportError> {
        debug!(url, "Opening WebSocket");

        let (ws, _response) = match timeout(self.timeout, connect_async(url)).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                return Err(TransportError::Connect {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(TransportError::Timeout {
                    url: url.to_string(),
                    timeout: self.timeout,
                })
            }
        };

        info!(url, "WebSocket connected");
        let (local, peer) = Duplex::channel();
        tokio::spawn(pump(ws, peer, url.to_string()));
        Ok(local)
    }
}

// ============================================================================
// Frame Pump
// ============================================================================

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn pump(ws: Socket, mut peer: DuplexPeer, url: String) {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            outgoing = peer.outgoing.recv() => {
                match outgoing {
                    Some(text) => {
                        if let Err(e) = sink.send(Message::Text(text)).await {
                            warn!(url = %url, error = %e, "WebSocket send failed");
                            let _ = peer.incoming.send(Err(TransportError::Io(e.to_string())));
                            break;
                        }
                    }
                    None => {
                        debug!(url = %url, "Closing WebSocket");
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if peer.incoming.send(Ok(text)).is_err() {
                            let _ = sink.send(Message::Close(None)).await;
                            break;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!(url = %url, ?frame, "WebSocket closed by remote");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(url = %url, error = %e, "WebSocket receive failed");
                        let _ = peer.incoming.send(Err(TransportError::Io(e.to_string())));
                        break;
                    }
                    None => break,
                }
            }
        }
    }
}
