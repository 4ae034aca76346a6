//! Boundaries to the excluded collaborators: the in-tab inspector and the
//! operator-visible connectivity badge.
//!
//! The real implementations live outside this crate (content scripts and
//! browser chrome); the defaults here surface everything through tracing so
//! the agent binary can run standalone.

use async_trait::async_trait;
use thiserror::Error;

use crate::agent::tabs::TabId;
use crate::protocol::{BadgeState, TabInstruction};

/// Failure to deliver an instruction to a tab. Always non-fatal: the
/// dispatcher logs and swallows these.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The tab exists but nothing in it is listening for instructions
    /// (navigated away, no content script injected).
    #[error("no receiver in tab {0}")]
    NoReceiver(TabId),
    /// The tab disappeared before or during delivery.
    #[error("tab {0} is gone")]
    TabGone(TabId),
}

/// Delivers directed instructions to a specific tab context.
///
/// Implementations must tolerate repeated activate/deactivate calls; the
/// dispatcher does not suppress redundant ones.
#[async_trait]
pub trait InspectorPort: Send + Sync {
    async fn deliver(&self, tab: TabId, instruction: TabInstruction) -> Result<(), DeliveryError>;
}

/// The operator-visible connectivity indicator.
pub trait BadgePort: Send + Sync {
    fn set(&self, state: BadgeState);
}

/// Logs every instruction instead of delivering it to a real tab.
pub struct LogInspector;

#[async_trait]
impl InspectorPort for LogInspector {
    async fn deliver(&self, tab: TabId, instruction: TabInstruction) -> Result<(), DeliveryError> {
        tracing::info!(%tab, instruction = instruction.name(), "tab instruction");
        Ok(())
    }
}

/// Logs badge changes instead of painting real chrome.
pub struct LogBadge;

impl BadgePort for LogBadge {
    fn set(&self, state: BadgeState) {
        tracing::info!(badge = state.text(), "badge");
    }
}
