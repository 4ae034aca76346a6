//! Activation dispatcher: reconciles the session's current command against
//! the tab registry and issues instructions to the inspector.
//!
//! Stateless -- every decision derives from the command and the registry.
//! Invoked whenever the session transitions or a tab gains focus.

use crate::agent::ports::InspectorPort;
use crate::agent::tabs::{ActivationState, TabId, TabRegistry};
use crate::protocol::{Command, TabInstruction};

/// Instruction order is part of the contract: inspector first, then
/// notification.
const ACTIVATE: [TabInstruction; 2] = [
    TabInstruction::ActivateInspector,
    TabInstruction::ActivateNotification,
];
const DEACTIVATE: [TabInstruction; 2] = [
    TabInstruction::DeactivateInspector,
    TabInstruction::DeactivateNotification,
];

/// Reconcile the registry with `command`.
///
/// The target set is the currently focused tab only -- inspection runs on
/// exactly the tab the user is looking at. Any other record still marked
/// active is retired first so at most one tab is ever active. Redundant
/// activates/deactivates are not suppressed; the inspector tolerates them.
pub async fn reconcile(command: Command, tabs: &mut TabRegistry, inspector: &dyn InspectorPort) {
    let Some(target) = tabs.focused() else {
        return;
    };

    for stale in tabs.active_tabs() {
        if stale == target {
            continue;
        }
        deliver_pair(inspector, stale, &DEACTIVATE).await;
        tabs.mark(stale, ActivationState::Inactive);
    }

    match command {
        Command::Recording => {
            deliver_pair(inspector, target, &ACTIVATE).await;
            tabs.mark(target, ActivationState::Active);
        }
        Command::Idle => {
            deliver_pair(inspector, target, &DEACTIVATE).await;
            tabs.mark(target, ActivationState::Inactive);
        }
    }
}

/// Deliver an instruction pair in order. Failures are logged and swallowed:
/// a tab that navigated away or disappeared mid-flight must never crash the
/// agent or block later events.
async fn deliver_pair(
    inspector: &dyn InspectorPort,
    tab: TabId,
    instructions: &[TabInstruction; 2],
) {
    for instruction in instructions {
        if let Err(e) = inspector.deliver(tab, *instruction).await {
            tracing::warn!(%tab, instruction = instruction.name(), error = %e, "tab delivery failed");
        }
    }
}
