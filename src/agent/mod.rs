//! The agent process: one session state machine, one tab registry, one
//! event loop.
//!
//! All agent state lives in an [`AgentContext`] created at process start and
//! mutated only by [`run`], which drains a single event channel -- the link
//! task and the tab service feed the same channel, so every interleaving of
//! frames and tab notifications is processed one event at a time. There are
//! no ambient singletons and no locks.

pub mod dispatch;
pub mod link;
pub mod ports;
pub mod session;
pub mod tabs;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::protocol::{BadgeState, Command, LinkId};
use ports::{BadgePort, InspectorPort};
use session::Session;
use tabs::{TabId, TabRegistry};

/// Capacity of the agent's event channel.
pub const EVENT_QUEUE_CAPACITY: usize = 64;

/// Everything that can happen to an agent, from either event source.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// The transport link connected. Carries the connection's fresh id.
    LinkOpened { link: LinkId },
    /// A text frame arrived on the link, in receipt order.
    Frame { text: String },
    /// The transport link terminated for any reason.
    LinkClosed { reason: String },
    /// The tab service reports a tab gained focus.
    TabFocused { tab: TabId },
    /// The tab service reports a tab was closed.
    TabRemoved { tab: TabId },
}

/// Process-wide agent state plus the ports to the excluded collaborators.
pub struct AgentContext {
    session: Session,
    tabs: TabRegistry,
    inspector: Arc<dyn InspectorPort>,
    badge: Arc<dyn BadgePort>,
}

impl AgentContext {
    pub fn new(inspector: Arc<dyn InspectorPort>, badge: Arc<dyn BadgePort>) -> Self {
        // Disconnected until the link says otherwise.
        badge.set(BadgeState::Off);
        Self {
            session: Session::new(),
            tabs: TabRegistry::new(),
            inspector,
            badge,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn tabs(&self) -> &TabRegistry {
        &self.tabs
    }

    /// The single transition function. Every event, real or synthetic, goes
    /// through here; reconciliation runs exactly once per session transition
    /// and once per focus change, never on no-ops.
    pub async fn dispatch(&mut self, event: AgentEvent) {
        match event {
            AgentEvent::LinkOpened { link } => {
                tracing::info!(%link, "control link open");
                self.badge.set(BadgeState::On);
                // Fresh connection: assume not recording until told
                // otherwise. Anything lost in flight stays lost.
                if self.session.reset() {
                    dispatch::reconcile(
                        self.session.current(),
                        &mut self.tabs,
                        self.inspector.as_ref(),
                    )
                    .await;
                }
            }
            AgentEvent::LinkClosed { reason } => {
                // No new information for the session or the registry.
                tracing::warn!(%reason, "control link closed");
                self.badge.set(BadgeState::Off);
            }
            AgentEvent::Frame { text } => {
                let command = Command::parse_token(&text);
                if self.session.apply(command) {
                    dispatch::reconcile(
                        self.session.current(),
                        &mut self.tabs,
                        self.inspector.as_ref(),
                    )
                    .await;
                }
            }
            AgentEvent::TabFocused { tab } => {
                self.tabs.observe_focus(tab, self.session.current());
                dispatch::reconcile(
                    self.session.current(),
                    &mut self.tabs,
                    self.inspector.as_ref(),
                )
                .await;
            }
            AgentEvent::TabRemoved { tab } => {
                self.tabs.remove(tab);
            }
        }
    }
}

/// Drain events into the context until the channel closes or `cancel`
/// fires. Returns the context so callers can inspect final state.
pub async fn run(
    mut ctx: AgentContext,
    mut events: mpsc::Receiver<AgentEvent>,
    cancel: CancellationToken,
) -> AgentContext {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => ctx.dispatch(event).await,
                None => break,
            },
            _ = cancel.cancelled() => break,
        }
    }
    ctx
}
