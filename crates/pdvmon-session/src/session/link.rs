//! Control-channel link task and backend URL helpers.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::transport::{Connector, Duplex, TransportError};

/// Event posted by the control link task, tagged with its link generation.
#[derive(Debug)]
pub(crate) struct ControlSignal {
    pub generation: u64,
    pub kind: ControlSignalKind,
}

#[derive(Debug)]
pub(crate) enum ControlSignalKind {
    /// Connected; frames for the backend go to this sender.
    Opened(mpsc::UnboundedSender<String>),
    /// One inbound text frame.
    Frame(String),
    /// The connection could not be established.
    Failed(TransportError),
    /// The established connection ended.
    Closed(Option<TransportError>),
}

/// Opens the control channel and pumps its frames into `tx`.
pub(crate) fn spawn_control_link(
    connector: Arc<dyn Connector>,
    url: String,
    generation: u64,
    tx: mpsc::UnboundedSender<ControlSignal>,
) -> AbortHandle {
    tokio::spawn(async move {
        let emit = |kind| {
            let _ = tx.send(ControlSignal { generation, kind });
        };

        let Duplex {
            outbound,
            mut inbound,
        } = match connector.open(&url).await {
            Ok(duplex) => duplex,
            Err(e) => {
                emit(ControlSignalKind::Failed(e));
                return;
            }
        };
        emit(ControlSignalKind::Opened(outbound));

        while let Some(item) = inbound.recv().await {
            match item {
                Ok(frame) => emit(ControlSignalKind::Frame(frame)),
                Err(e) => {
                    emit(ControlSignalKind::Closed(Some(e)));
                    return;
                }
            }
        }
        debug!(generation, "Control link ended");
        emit(ControlSignalKind::Closed(None));
    })
    .abort_handle()
}

fn strip_scheme(address: &str) -> &str {
    let address = address.trim();
    address
        .strip_prefix("ws://")
        .or_else(|| address.strip_prefix("wss://"))
        .unwrap_or(address)
        .trim_end_matches('/')
}

/// Control-channel URL: the operator's `host[:port]` with the port replaced
/// by `control_port`.
pub fn control_url(server: &str, control_port: u16) -> String {
    let address = strip_scheme(server);
    let host = match address.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => host,
        _ => address,
    };
    format!("ws://{host}:{control_port}")
}

/// Relay URL: the operator's address as typed.
pub fn relay_url(server: &str) -> String {
    format!("ws://{}", strip_scheme(server))
}
