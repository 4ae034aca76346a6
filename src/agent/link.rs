//! Agent-side transport link: a persistent WebSocket connection to the
//! control server.
//!
//! Spawns a tokio task that connects, forwards inbound text frames to the
//! agent event loop in receipt order, and on any termination sleeps a fixed
//! delay and reconnects -- indefinitely, until the process is torn down.
//! Commands in flight during a disconnect are considered lost; the next
//! connection's first frame re-establishes ground truth.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::MaybeTlsStream;
use tokio_util::sync::CancellationToken;

use crate::agent::AgentEvent;
use crate::protocol::LinkId;

type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Baseline delay between reconnect attempts. Fixed, no backoff or jitter:
/// this is a LAN control link with one connection per agent, and a constant
/// delay recovers fastest.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// WebSocket URL of the control server's agent endpoint.
    pub url: String,
    /// Delay between reconnect attempts.
    pub reconnect_delay: Duration,
}

impl LinkConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

/// Spawn the persistent link task for the given control server.
pub fn spawn(
    config: LinkConfig,
    events: mpsc::Sender<AgentEvent>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(link_loop(config, events, cancel))
}

async fn link_loop(
    config: LinkConfig,
    events: mpsc::Sender<AgentEvent>,
    cancel: CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            return;
        }

        match tokio_tungstenite::connect_async(&config.url).await {
            Ok((stream, _)) => {
                // Every connection gets a fresh identity; nothing in flight
                // survives a disconnect.
                let link = LinkId::fresh();
                tracing::info!(%link, url = %config.url, "control link connected");
                if events.send(AgentEvent::LinkOpened { link }).await.is_err() {
                    return;
                }

                let reason = run_link(stream, &events, &cancel).await;

                if cancel.is_cancelled() {
                    return;
                }
                tracing::warn!(%link, %reason, "control link lost");
                if events
                    .send(AgentEvent::LinkClosed { reason })
                    .await
                    .is_err()
                {
                    return;
                }
            }
            Err(e) => {
                tracing::debug!(url = %config.url, error = %e, "connect failed");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(config.reconnect_delay) => {}
            _ = cancel.cancelled() => return,
        }
    }
}

/// Drive one open connection until it terminates. Returns the close reason.
async fn run_link(
    stream: WsStream,
    events: &mpsc::Sender<AgentEvent>,
    cancel: &CancellationToken,
) -> String {
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            msg = source.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if events
                            .send(AgentEvent::Frame { text: text.to_string() })
                            .await
                            .is_err()
                        {
                            return "event loop gone".to_string();
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sink.send(Message::Pong(data)).await.is_err() {
                            return "pong send failed".to_string();
                        }
                    }
                    Some(Ok(Message::Close(_))) => return "closed by peer".to_string(),
                    None => return "stream ended".to_string(),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return e.to_string(),
                }
            }
            _ = cancel.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                return "cancelled".to_string();
            }
        }
    }
}
