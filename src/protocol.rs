//! Wire tokens and instruction names shared by the control plane and agents.
//!
//! The transport is WebSocket text frames, one frame = one command token.
//! Parsing is total: anything unrecognized collapses to [`Command::Idle`],
//! so a garbled or stale frame can only ever deactivate, never activate.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Wire token broadcast when the operator starts a recording session.
pub const TOKEN_START: &str = "start";
/// Wire token broadcast when the operator stops a recording session.
pub const TOKEN_STOP: &str = "stop";

/// The operator's session intent, as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    Recording,
    #[default]
    Idle,
}

impl Command {
    /// Total parse of an inbound wire token.
    ///
    /// Unrecognized tokens are treated as [`Command::Idle`] and logged; the
    /// protocol favors deactivating over guessing.
    pub fn parse_token(token: &str) -> Self {
        match token {
            TOKEN_START => Command::Recording,
            TOKEN_STOP => Command::Idle,
            other => {
                tracing::warn!(token = %other, "unrecognized command token, treating as stop");
                Command::Idle
            }
        }
    }

    /// The wire token for this command.
    pub fn token(&self) -> &'static str {
        match self {
            Command::Recording => TOKEN_START,
            Command::Idle => TOKEN_STOP,
        }
    }
}

/// Instructions the agent delivers to a specific tab context.
///
/// The serialized names are the message names the in-tab inspector and
/// notification receivers listen for; there is no payload beyond the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TabInstruction {
    ActivateInspector,
    ActivateNotification,
    DeactivateInspector,
    DeactivateNotification,
}

impl TabInstruction {
    /// The instruction name as delivered to the tab.
    pub fn name(&self) -> &'static str {
        match self {
            TabInstruction::ActivateInspector => "activateInspector",
            TabInstruction::ActivateNotification => "activateNotification",
            TabInstruction::DeactivateInspector => "deactivateInspector",
            TabInstruction::DeactivateNotification => "deactivateNotification",
        }
    }
}

/// Connectivity indicator surfaced to the operator. Observability only,
/// never part of the coordination contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeState {
    /// A transport link is open.
    On,
    /// No transport link is open.
    Off,
}

impl BadgeState {
    /// The constant badge text shown for this state.
    pub fn text(&self) -> &'static str {
        match self {
            BadgeState::On => "ON",
            BadgeState::Off => "OFF",
        }
    }
}

/// Identifier for one transport link.
///
/// Every connection gets a fresh one, including every reconnect attempt:
/// nothing in-flight survives a disconnect, so ids are never reused to
/// suggest continuity that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(Uuid);

impl LinkId {
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
