//! Control-side broadcast hub: the set of currently live transport links.
//!
//! Each registered link owns a bounded, ordered outbound queue. Broadcasts
//! are queued to every live link best-effort; a slow or dead consumer never
//! blocks delivery to the others, and no acknowledgement is collected --
//! agents are idempotent against lost or duplicated commands.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::protocol::{Command, LinkId};

/// Capacity of each link's outbound queue. Commands are tiny and rare; a
/// link that falls this far behind is effectively dead and will be dropped
/// by its own connection task.
pub const LINK_QUEUE_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct Hub {
    links: Arc<RwLock<HashMap<LinkId, mpsc::Sender<Command>>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            links: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Add a newly accepted connection to the live set.
    ///
    /// Returns the link's fresh id and the receiving end of its outbound
    /// queue, which the connection task drains into the socket.
    pub fn register(&self) -> (LinkId, mpsc::Receiver<Command>) {
        let id = LinkId::fresh();
        let (tx, rx) = mpsc::channel(LINK_QUEUE_CAPACITY);
        self.links.write().insert(id, tx);
        (id, rx)
    }

    /// Remove a link from the live set.
    ///
    /// Invoked from the link's own close path. Removing an id that is
    /// already gone is a no-op.
    pub fn unregister(&self, id: LinkId) {
        self.links.write().remove(&id);
    }

    /// Queue `command` to every live link, best-effort.
    ///
    /// A full or closed queue is skipped (and logged) without affecting the
    /// others. Returns the number of links the command was queued to.
    pub fn broadcast(&self, command: Command) -> usize {
        let links = self.links.read();
        let mut queued = 0;
        for (id, tx) in links.iter() {
            match tx.try_send(command) {
                Ok(()) => queued += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(link = %id, "link queue full, dropping command");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(link = %id, "link queue closed (connection tearing down)");
                }
            }
        }
        queued
    }

    /// Ids of the currently live links.
    pub fn link_ids(&self) -> Vec<LinkId> {
        self.links.read().keys().copied().collect()
    }

    pub fn link_count(&self) -> usize {
        self.links.read().len()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_adds_link_to_live_set() {
        let hub = Hub::new();
        let (id, _rx) = hub.register();
        assert_eq!(hub.link_count(), 1);
        assert_eq!(hub.link_ids(), vec![id]);
    }

    #[tokio::test]
    async fn unregister_removes_link() {
        let hub = Hub::new();
        let (id, _rx) = hub.register();
        hub.unregister(id);
        assert_eq!(hub.link_count(), 0);
    }

    #[tokio::test]
    async fn unregister_absent_link_is_noop() {
        let hub = Hub::new();
        let (id, _rx) = hub.register();
        hub.unregister(id);
        hub.unregister(id);
        assert_eq!(hub.link_count(), 0);
    }

    #[tokio::test]
    async fn broadcast_with_no_links_queues_nothing() {
        let hub = Hub::new();
        assert_eq!(hub.broadcast(Command::Recording), 0);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_live_link_exactly_once() {
        let hub = Hub::new();
        let (_id1, mut rx1) = hub.register();
        let (_id2, mut rx2) = hub.register();
        let (_id3, mut rx3) = hub.register();

        assert_eq!(hub.broadcast(Command::Recording), 3);

        for rx in [&mut rx1, &mut rx2, &mut rx3] {
            assert_eq!(rx.recv().await, Some(Command::Recording));
            assert!(rx.try_recv().is_err(), "each link receives exactly once");
        }
    }

    #[tokio::test]
    async fn per_link_order_follows_broadcast_order() {
        let hub = Hub::new();
        let (_id, mut rx) = hub.register();

        hub.broadcast(Command::Recording);
        hub.broadcast(Command::Idle);
        hub.broadcast(Command::Recording);

        assert_eq!(rx.recv().await, Some(Command::Recording));
        assert_eq!(rx.recv().await, Some(Command::Idle));
        assert_eq!(rx.recv().await, Some(Command::Recording));
    }

    #[tokio::test]
    async fn dead_link_does_not_block_delivery_to_others() {
        let hub = Hub::new();
        let (_id1, mut rx1) = hub.register();
        let (_id2, rx2) = hub.register();
        let (_id3, mut rx3) = hub.register();

        // One consumer dies without unregistering first.
        drop(rx2);

        assert_eq!(hub.broadcast(Command::Recording), 2);
        assert_eq!(rx1.recv().await, Some(Command::Recording));
        assert_eq!(rx3.recv().await, Some(Command::Recording));
    }

    #[tokio::test]
    async fn full_queue_is_skipped_without_blocking_others() {
        let hub = Hub::new();
        let (_slow, _slow_rx) = hub.register();

        // Fill the slow link's queue to capacity without draining it.
        for _ in 0..LINK_QUEUE_CAPACITY {
            hub.broadcast(Command::Idle);
        }

        let (_live, mut live_rx) = hub.register();
        assert_eq!(hub.broadcast(Command::Recording), 1);
        assert_eq!(live_rx.recv().await, Some(Command::Recording));
    }

    #[tokio::test]
    async fn clone_shares_live_set() {
        let hub = Hub::new();
        let hub2 = hub.clone();
        let (_id, mut rx) = hub.register();

        assert_eq!(hub2.broadcast(Command::Recording), 1);
        assert_eq!(rx.recv().await, Some(Command::Recording));
    }
}
