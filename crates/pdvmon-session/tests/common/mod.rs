//! Shared fakes for the session integration tests.
//!
//! Tests CAN use `.unwrap()` and `.expect()`.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::{sleep, timeout};

use pdvmon_core::{SlotId, SlotLayout};
use pdvmon_session::{
    spawn_session, Connector, Duplex, DuplexPeer, PeerError, PeerMedia, PeerMediaFactory,
    PeerSignals, SessionConfig, SessionHandle, SlotBoard, TransportError, Transports,
};

pub const SERVER: &str = "10.0.0.1:8080";
pub const CONTROL_URL: &str = "ws://10.0.0.1:8765";
pub const RELAY_URL: &str = "ws://10.0.0.1:8080";

const WAIT: Duration = Duration::from_secs(2);

// ============================================================================
// Fake Connector
// ============================================================================

/// Hands every opened link to the test.
pub struct FakeConnector {
    opened: mpsc::UnboundedSender<(String, DuplexPeer)>,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open(&self, url: &str) -> Result<Duplex, TransportError> {
        let (local, peer) = Duplex::channel();
        self.opened
            .send((url.to_string(), peer))
            .map_err(|_| TransportError::Connect {
                url: url.to_string(),
                reason: "test finished".to_string(),
            })?;
        Ok(local)
    }
}

// ============================================================================
// Fake Peer Media
// ============================================================================

/// Peer whose gathering completes only when the test releases it.
pub struct FakePeer {
    offer: Mutex<Option<String>>,
    gate: Semaphore,
    closed: AtomicBool,
}

impl FakePeer {
    pub fn release_gathering(&self) {
        self.gate.add_permits(1);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PeerMedia for FakePeer {
    async fn accept_offer(&self, sdp: String) -> Result<(), PeerError> {
        *self.offer.lock().unwrap() = Some(sdp);
        Ok(())
    }

    async fn gathering_complete(&self) -> Result<String, PeerError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| PeerError::GatheringAborted)?;
        let offer = self.offer.lock().unwrap().clone().unwrap_or_default();
        Ok(format!("answer-to:{offer}"))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.gate.close();
    }
}

pub struct FakePeers {
    created: mpsc::UnboundedSender<(PeerSignals, Arc<FakePeer>)>,
}

#[async_trait]
impl PeerMediaFactory for FakePeers {
    async fn create(
        &self,
        _slot: SlotId,
        signals: PeerSignals,
    ) -> Result<Arc<dyn PeerMedia>, PeerError> {
        let fake = Arc::new(FakePeer {
            offer: Mutex::new(None),
            gate: Semaphore::new(0),
            closed: AtomicBool::new(false),
        });
        let _ = self.created.send((signals, Arc::clone(&fake)));
        let peer: Arc<dyn PeerMedia> = fake;
        Ok(peer)
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub handle: SessionHandle,
    pub board: SlotBoard,
    pub links: mpsc::UnboundedReceiver<(String, DuplexPeer)>,
    pub peers: mpsc::UnboundedReceiver<(PeerSignals, Arc<FakePeer>)>,
}

impl Harness {
    pub fn spawn() -> Self {
        Self::spawn_with(SessionConfig::default())
    }

    pub fn spawn_with(config: SessionConfig) -> Self {
        let (links_tx, links) = mpsc::unbounded_channel();
        let (peers_tx, peers) = mpsc::unbounded_channel();
        let board = SlotBoard::new(config.layout);
        let transports = Transports {
            connector: Arc::new(FakeConnector { opened: links_tx }),
            peers: Arc::new(FakePeers { created: peers_tx }),
        };
        let handle = spawn_session(config, board.clone(), transports);
        Self {
            handle,
            board,
            links,
            peers,
        }
    }

    /// Next link opened by the session.
    pub async fn next_link(&mut self) -> (String, DuplexPeer) {
        timeout(WAIT, self.links.recv())
            .await
            .expect("link opened in time")
            .expect("connector alive")
    }

    /// Next peer created by the session.
    pub async fn next_peer(&mut self) -> (PeerSignals, Arc<FakePeer>) {
        timeout(WAIT, self.peers.recv())
            .await
            .expect("peer created in time")
            .expect("factory alive")
    }

    /// Connects to the backend and returns the control link.
    pub async fn connect(&mut self) -> DuplexPeer {
        self.board.set_server_address(SERVER);
        self.handle.connect_server().await.unwrap();
        let (url, control) = self.next_link().await;
        assert_eq!(url, CONTROL_URL);
        let handle = self.handle.clone();
        eventually(|| {
            let handle = handle.clone();
            async move { handle.is_connected().await }
        })
        .await;
        control
    }

    /// Registers `address` on `slot` and consumes the register frame.
    pub async fn register(&mut self, control: &mut DuplexPeer, slot: u8, address: &str) {
        self.board.set_terminal_input(SlotId::new(slot), address);
        self.handle.register_terminal(SlotId::new(slot)).await.unwrap();
        let frame = recv(control).await.expect("register frame");
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["command"], "register");
        assert_eq!(value["pdv_ip"], address);
    }

    /// Starts the slot's feed and returns its relay link after the source
    /// frame.
    pub async fn start_feed(&mut self, slot: u8, source: &str) -> DuplexPeer {
        self.board.set_source_url(SlotId::new(slot), source);
        self.handle.start_feed(SlotId::new(slot)).await.unwrap();
        let (url, mut relay) = self.next_link().await;
        assert_eq!(url, RELAY_URL);
        assert_eq!(recv(&mut relay).await.as_deref(), Some(source));
        relay
    }

    pub fn status(&self, slot: u8) -> String {
        self.board.slot(SlotId::new(slot)).unwrap().status
    }

    /// Waits until the board satisfies `check`.
    pub async fn wait_board(&self, check: impl Fn(&pdvmon_session::BoardState) -> bool) {
        let board = self.board.clone();
        timeout(WAIT, async {
            while !check(&board.snapshot()) {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("board condition reached in time");
    }
}

/// Sends one JSON frame to the session.
pub fn push(link: &DuplexPeer, frame: &str) {
    link.incoming.send(Ok(frame.to_string())).unwrap();
}

/// Next frame the session sent on `link`; `None` once it closed the link.
pub async fn recv(link: &mut DuplexPeer) -> Option<String> {
    timeout(WAIT, link.outgoing.recv())
        .await
        .expect("frame or close in time")
}

/// Waits for the link to be closed by the session, returning the frames
/// sent before closing.
pub async fn drain_until_closed(link: &mut DuplexPeer) -> Vec<String> {
    let mut frames = Vec::new();
    while let Some(frame) = recv(link).await {
        frames.push(frame);
    }
    frames
}

/// Polls `condition` until it holds.
pub async fn eventually<F, Fut>(condition: F)
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    timeout(WAIT, async {
        while !condition().await {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition reached in time");
}

pub fn layout(count: u8) -> SlotLayout {
    SlotLayout::new(count).unwrap()
}
