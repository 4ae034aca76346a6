#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::net::TcpListener;

use tabcast::agent::ports::{BadgePort, DeliveryError, InspectorPort};
use tabcast::agent::tabs::TabId;
use tabcast::api::{self, AppState};
use tabcast::hub::Hub;
use tabcast::protocol::{BadgeState, TabInstruction};

/// Inspector double that records every delivered instruction.
#[derive(Default)]
pub struct RecordingInspector {
    delivered: Mutex<Vec<(TabId, TabInstruction)>>,
}

impl RecordingInspector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn delivered(&self) -> Vec<(TabId, TabInstruction)> {
        self.delivered.lock().clone()
    }
}

#[async_trait]
impl InspectorPort for RecordingInspector {
    async fn deliver(&self, tab: TabId, instruction: TabInstruction) -> Result<(), DeliveryError> {
        self.delivered.lock().push((tab, instruction));
        Ok(())
    }
}

/// Badge double that records every state change.
#[derive(Default)]
pub struct RecordingBadge {
    states: Mutex<Vec<BadgeState>>,
}

impl RecordingBadge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn states(&self) -> Vec<BadgeState> {
        self.states.lock().clone()
    }

    pub fn on_count(&self) -> usize {
        self.states
            .lock()
            .iter()
            .filter(|s| **s == BadgeState::On)
            .count()
    }
}

impl BadgePort for RecordingBadge {
    fn set(&self, state: BadgeState) {
        self.states.lock().push(state);
    }
}

/// Start a control server on an ephemeral port. Returns its address and a
/// handle on the hub so tests can observe the live-link set directly.
pub async fn start_control_server() -> (SocketAddr, Hub) {
    let hub = Hub::new();
    let app = api::router(AppState { hub: hub.clone() });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, hub)
}

pub fn agent_ws_url(addr: SocketAddr) -> String {
    format!("ws://{}/ws/agent", addr)
}

/// Poll until `predicate` holds or the timeout elapses.
pub async fn wait_for(what: &str, timeout: Duration, mut predicate: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + timeout;
    while !predicate() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {}",
            what
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
