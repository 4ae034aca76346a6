//! Agent-local session state machine.
//!
//! Two states, `Idle` (initial) and `Recording`, driven only by frames
//! received on the transport link. Last write wins; there is no terminal
//! state. Every fresh connection resets the machine to `Idle` -- the agent
//! assumes it is not recording until told otherwise.

use std::time::Instant;

use crate::protocol::Command;

#[derive(Debug)]
pub struct Session {
    current: Command,
    last_updated: Option<Instant>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            current: Command::Idle,
            last_updated: None,
        }
    }

    pub fn current(&self) -> Command {
        self.current
    }

    /// When the last frame was received, if any has been.
    pub fn last_updated(&self) -> Option<Instant> {
        self.last_updated
    }

    /// Apply a received command. Returns true if the machine transitioned;
    /// re-receiving the current command is a no-op (idempotent), though it
    /// still counts as an update.
    pub fn apply(&mut self, command: Command) -> bool {
        self.last_updated = Some(Instant::now());
        if command == self.current {
            return false;
        }
        tracing::debug!(from = ?self.current, to = ?command, "session transition");
        self.current = command;
        true
    }

    /// Return to `Idle`, as on every fresh connection acquisition. Returns
    /// true if the machine was in `Recording` and actually changed.
    pub fn reset(&mut self) -> bool {
        if self.current == Command::Idle {
            return false;
        }
        self.current = Command::Idle;
        true
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
