//! Per-tab activation records, maintained from the browser tab service's
//! focus and removal notifications.

use std::collections::HashMap;
use std::fmt;

use crate::protocol::Command;

/// Opaque identifier for one browser tab, as assigned by the tab service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(pub u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    Active,
    Inactive,
}

#[derive(Debug, Clone)]
pub struct TabRecord {
    pub id: TabId,
    pub activation: ActivationState,
}

/// Every tab observed since agent startup, plus which one is focused.
///
/// Owned exclusively by the agent event loop; no locking. Records are
/// created on first observation and destroyed on removal, and all mutations
/// are idempotent against duplicate or stale notifications.
#[derive(Debug, Default)]
pub struct TabRegistry {
    records: HashMap<TabId, TabRecord>,
    focused: Option<TabId>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `tab` gained focus. A previously unseen tab gets a record
    /// whose activation is derived from the current session command -- this
    /// is how a newly focused tab picks up recording intent. An existing
    /// record is left untouched; reconciliation corrects it.
    pub fn observe_focus(&mut self, tab: TabId, current: Command) {
        self.records.entry(tab).or_insert_with(|| TabRecord {
            id: tab,
            activation: match current {
                Command::Recording => ActivationState::Active,
                Command::Idle => ActivationState::Inactive,
            },
        });
        self.focused = Some(tab);
    }

    /// Delete the record for `tab` unconditionally. Removing an absent id is
    /// a no-op, not an error. Clears focus if the focused tab went away.
    pub fn remove(&mut self, tab: TabId) {
        self.records.remove(&tab);
        if self.focused == Some(tab) {
            self.focused = None;
        }
    }

    pub fn focused(&self) -> Option<TabId> {
        self.focused
    }

    pub fn get(&self, tab: TabId) -> Option<&TabRecord> {
        self.records.get(&tab)
    }

    /// Set a tab's activation state. A no-op for unknown tabs, which covers
    /// a tab removed while an activation call to it was in flight.
    pub fn mark(&mut self, tab: TabId, activation: ActivationState) {
        if let Some(record) = self.records.get_mut(&tab) {
            record.activation = activation;
        }
    }

    /// Tabs whose records are currently marked active.
    pub fn active_tabs(&self) -> Vec<TabId> {
        self.records
            .values()
            .filter(|r| r.activation == ActivationState::Active)
            .map(|r| r.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_creates_record_derived_from_idle() {
        let mut tabs = TabRegistry::new();
        tabs.observe_focus(TabId(1), Command::Idle);
        assert_eq!(tabs.get(TabId(1)).unwrap().activation, ActivationState::Inactive);
        assert_eq!(tabs.focused(), Some(TabId(1)));
    }

    #[test]
    fn focus_creates_record_derived_from_recording() {
        let mut tabs = TabRegistry::new();
        tabs.observe_focus(TabId(2), Command::Recording);
        assert_eq!(tabs.get(TabId(2)).unwrap().activation, ActivationState::Active);
    }

    #[test]
    fn refocus_does_not_overwrite_existing_record() {
        let mut tabs = TabRegistry::new();
        tabs.observe_focus(TabId(1), Command::Idle);
        tabs.observe_focus(TabId(1), Command::Recording);
        assert_eq!(tabs.get(TabId(1)).unwrap().activation, ActivationState::Inactive);
    }

    #[test]
    fn focus_moves_between_tabs() {
        let mut tabs = TabRegistry::new();
        tabs.observe_focus(TabId(1), Command::Idle);
        tabs.observe_focus(TabId(2), Command::Idle);
        assert_eq!(tabs.focused(), Some(TabId(2)));
        assert_eq!(tabs.len(), 2);
    }

    #[test]
    fn remove_deletes_record() {
        let mut tabs = TabRegistry::new();
        tabs.observe_focus(TabId(1), Command::Idle);
        tabs.remove(TabId(1));
        assert!(tabs.get(TabId(1)).is_none());
        assert!(tabs.is_empty());
    }

    #[test]
    fn remove_absent_tab_is_noop() {
        let mut tabs = TabRegistry::new();
        tabs.remove(TabId(42));
        assert!(tabs.is_empty());
    }

    #[test]
    fn removing_focused_tab_clears_focus() {
        let mut tabs = TabRegistry::new();
        tabs.observe_focus(TabId(1), Command::Idle);
        tabs.remove(TabId(1));
        assert_eq!(tabs.focused(), None);
    }

    #[test]
    fn removing_unfocused_tab_keeps_focus() {
        let mut tabs = TabRegistry::new();
        tabs.observe_focus(TabId(1), Command::Idle);
        tabs.observe_focus(TabId(2), Command::Idle);
        tabs.remove(TabId(1));
        assert_eq!(tabs.focused(), Some(TabId(2)));
    }

    #[test]
    fn mark_unknown_tab_is_noop() {
        let mut tabs = TabRegistry::new();
        tabs.mark(TabId(9), ActivationState::Active);
        assert!(tabs.active_tabs().is_empty());
    }

    #[test]
    fn active_tabs_lists_only_active_records() {
        let mut tabs = TabRegistry::new();
        tabs.observe_focus(TabId(1), Command::Idle);
        tabs.observe_focus(TabId(2), Command::Recording);
        assert_eq!(tabs.active_tabs(), vec![TabId(2)]);
    }
}
