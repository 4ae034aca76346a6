//! tabcast - recording session coordinator.
//!
//! ## Modes
//!
//! **Server mode** (`tabcast server`): runs the control plane. Agents
//! connect over WebSocket; `start`/`stop` operator actions are broadcast to
//! every connected agent.
//!
//! **Agent mode** (`tabcast agent`): connects to the control server,
//! reconnecting forever on a fixed delay, and drives tab activation from the
//! last received command. Tab focus/close events are read from stdin
//! (`focus <id>` / `close <id>`) in place of a real browser tab service.
//!
//! **Operator commands** (`tabcast start|stop|status`): drive the control
//! surface over HTTP.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser as ClapParser, Subcommand};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tabcast::{
    agent::{
        self,
        link::{self, LinkConfig},
        ports::{LogBadge, LogInspector},
        tabs::TabId,
        AgentContext, AgentEvent,
    },
    api,
    config::{default_config_path, Config},
    hub::Hub,
};

/// Default control surface address. Loopback only; the transport carries no
/// authentication.
const DEFAULT_BIND: &str = "127.0.0.1:18000";

/// tabcast - recording session coordinator
///
/// Broadcasts start/stop commands from a control plane to browser-resident
/// agents over persistent WebSocket links, and keeps each agent's tab
/// activation consistent with the last received command.
#[derive(ClapParser, Debug)]
#[command(name = "tabcast", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file
    #[arg(long, global = true, env = "TABCAST_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the control-plane server
    Server {
        /// Address to bind the HTTP/WS control surface
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Run an agent connected to the control server
    Agent {
        /// WebSocket URL of the control server's agent endpoint
        #[arg(long)]
        server: Option<String>,

        /// Delay between reconnect attempts, in milliseconds
        #[arg(long)]
        reconnect_delay_ms: Option<u64>,
    },

    /// Broadcast a start command to every connected agent
    Start {
        /// Address of the control surface
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Broadcast a stop command to every connected agent
    Stop {
        /// Address of the control surface
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Show connected agents
    Status {
        /// Address of the control surface
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
}

#[derive(Error, Debug)]
pub enum TabcastError {
    #[error("config error: {0}")]
    Config(#[from] tabcast::config::ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

#[tokio::main]
async fn main() -> Result<(), TabcastError> {
    let cli = Cli::parse();
    init_tracing();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = Config::load(&config_path)?.unwrap_or_default();

    match cli.command {
        Commands::Server { bind } => run_server(resolve_bind(bind, &config)).await,
        Commands::Agent {
            server,
            reconnect_delay_ms,
        } => {
            let url = resolve_server_url(server, &config);
            let delay = resolve_reconnect_delay(reconnect_delay_ms, &config);
            run_agent(url, delay).await
        }
        Commands::Start { bind } => run_control(resolve_bind(bind, &config), "start").await,
        Commands::Stop { bind } => run_control(resolve_bind(bind, &config), "stop").await,
        Commands::Status { bind } => run_status(resolve_bind(bind, &config)).await,
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "tabcast=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// ── Option resolution: flag > config file > built-in default ──────

fn resolve_bind(flag: Option<SocketAddr>, config: &Config) -> SocketAddr {
    flag.or_else(|| config.control.as_ref().and_then(|c| c.bind))
        .unwrap_or_else(|| DEFAULT_BIND.parse().unwrap())
}

fn resolve_server_url(flag: Option<String>, config: &Config) -> String {
    flag.or_else(|| config.agent.as_ref().and_then(|a| a.server.clone()))
        .unwrap_or_else(|| format!("ws://{}/ws/agent", DEFAULT_BIND))
}

fn resolve_reconnect_delay(flag: Option<u64>, config: &Config) -> Duration {
    flag.or_else(|| config.agent.as_ref().and_then(|a| a.reconnect_delay_ms))
        .map(Duration::from_millis)
        .unwrap_or(link::RECONNECT_DELAY)
}

// ── Server mode ────────────────────────────────────────────────────

async fn run_server(bind: SocketAddr) -> Result<(), TabcastError> {
    tracing::info!("tabcast control server starting");

    let state = api::AppState { hub: Hub::new() };
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %bind, "control surface listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}

// ── Agent mode ─────────────────────────────────────────────────────

async fn run_agent(server: String, reconnect_delay: Duration) -> Result<(), TabcastError> {
    tracing::info!(server = %server, "tabcast agent starting");

    let (events_tx, events_rx) = mpsc::channel(agent::EVENT_QUEUE_CAPACITY);
    let cancel = CancellationToken::new();

    let link_task = link::spawn(
        LinkConfig {
            url: server,
            reconnect_delay,
        },
        events_tx.clone(),
        cancel.clone(),
    );

    // Stand-in for the browser tab service: `focus <id>` / `close <id>`
    // lines on stdin become tab lifecycle events.
    spawn_stdin_tab_events(events_tx);

    let ctx = AgentContext::new(Arc::new(LogInspector), Arc::new(LogBadge));
    let run_task = tokio::spawn(agent::run(ctx, events_rx, cancel.clone()));

    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutting down");
    cancel.cancel();

    link_task.await?;
    run_task.await?;
    Ok(())
}

/// Read tab lifecycle events from stdin in a blocking thread.
fn spawn_stdin_tab_events(events: mpsc::Sender<AgentEvent>) {
    tokio::task::spawn_blocking(move || {
        use std::io::BufRead;
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match parse_tab_event(&line) {
                Some(event) => {
                    if events.blocking_send(event).is_err() {
                        break;
                    }
                }
                None => eprintln!("tabcast: expected `focus <id>` or `close <id>`"),
            }
        }
    });
}

fn parse_tab_event(line: &str) -> Option<AgentEvent> {
    let mut parts = line.split_whitespace();
    let verb = parts.next()?;
    let id: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    match verb {
        "focus" => Some(AgentEvent::TabFocused { tab: TabId(id) }),
        "close" => Some(AgentEvent::TabRemoved { tab: TabId(id) }),
        _ => None,
    }
}

// ── Operator commands ──────────────────────────────────────────────

async fn run_control(bind: SocketAddr, action: &str) -> Result<(), TabcastError> {
    let url = format!("http://{}/control/{}", bind, action);
    let client = reqwest::Client::new();

    let resp = client
        .post(&url)
        .send()
        .await
        .map_err(|e| reqwest_to_io_error(&bind, e))?;
    if !resp.status().is_success() {
        return Err(io::Error::other(format!("server returned status {}", resp.status())).into());
    }

    let ack: serde_json::Value = resp
        .json()
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    println!(
        "{} -> {} agent(s)",
        ack["broadcast"].as_str().unwrap_or(action),
        ack["links"]
    );
    Ok(())
}

async fn run_status(bind: SocketAddr) -> Result<(), TabcastError> {
    let url = format!("http://{}/agents", bind);
    let client = reqwest::Client::new();

    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|e| reqwest_to_io_error(&bind, e))?;
    if !resp.status().is_success() {
        return Err(io::Error::other(format!("server returned status {}", resp.status())).into());
    }

    let body: serde_json::Value = resp
        .json()
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let agents = body["agents"].as_array().cloned().unwrap_or_default();
    println!("{} agent(s) connected", agents.len());
    for agent in agents {
        if let Some(id) = agent.as_str() {
            println!("  {}", id);
        }
    }
    Ok(())
}

/// Convert a reqwest error into a human-friendly `io::Error`.
fn reqwest_to_io_error(bind: &SocketAddr, e: reqwest::Error) -> io::Error {
    if e.is_connect() {
        io::Error::new(
            io::ErrorKind::ConnectionRefused,
            format!(
                "could not connect to tabcast server at {} — is the server running?",
                bind
            ),
        )
    } else if e.is_timeout() {
        io::Error::new(
            io::ErrorKind::TimedOut,
            format!("connection to tabcast server at {} timed out", bind),
        )
    } else {
        io::Error::other(e)
    }
}
