//! Control-plane HTTP/WS surface.
//!
//! Agents connect to `/ws/agent` and receive command tokens as text frames.
//! The operator surface is two POST actions, `start` and `stop`, each of
//! which triggers exactly one broadcast; the response is an acknowledgement
//! carrying the token echoed and the number of links it was queued to.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use tower_http::trace::TraceLayer;

use crate::hub::Hub;
use crate::protocol::Command;

#[derive(Clone)]
pub struct AppState {
    pub hub: Hub,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws/agent", get(ws_agent))
        .route("/control/start", post(control_start))
        .route("/control/stop", post(control_stop))
        .route("/agents", get(agent_list))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn control_start(State(state): State<AppState>) -> impl IntoResponse {
    broadcast_ack(&state, Command::Recording)
}

async fn control_stop(State(state): State<AppState>) -> impl IntoResponse {
    broadcast_ack(&state, Command::Idle)
}

fn broadcast_ack(state: &AppState, command: Command) -> Json<serde_json::Value> {
    let queued = state.hub.broadcast(command);
    tracing::info!(command = command.token(), links = queued, "broadcast");
    Json(serde_json::json!({
        "broadcast": command.token(),
        "links": queued,
    }))
}

async fn agent_list(State(state): State<AppState>) -> impl IntoResponse {
    let agents: Vec<String> = state
        .hub
        .link_ids()
        .iter()
        .map(|id| id.to_string())
        .collect();
    Json(serde_json::json!({ "agents": agents }))
}

async fn ws_agent(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_agent_link(socket, state))
}

/// Drive one agent link: drain its outbound queue into the socket and watch
/// the socket for termination. Agents never send commands; inbound traffic
/// beyond ping/close is ignored. Unregisters exactly once, from this close
/// path.
async fn handle_agent_link(socket: WebSocket, state: AppState) {
    let (link, mut outbound) = state.hub.register();
    tracing::info!(%link, "agent link open");

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            command = outbound.recv() => {
                match command {
                    Some(command) => {
                        if ws_tx
                            .send(Message::Text(command.token().into()))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    None => break,
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if ws_tx.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    state.hub.unregister(link);
    tracing::info!(%link, "agent link closed");
}
