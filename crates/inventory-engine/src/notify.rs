//! Notification sinks receiving the events of committed mutations.

use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::debug;

use inventory_core::InventoryEvent;

/// Receives the events of one mutation, in order, after it has completed.
///
/// The engine never waits on delivery; implementations must not block.
pub trait NotificationSink: Send + Sync {
    fn publish(&self, events: Vec<InventoryEvent>);
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn publish(&self, _events: Vec<InventoryEvent>) {}
}

/// Fans events out to any number of subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<InventoryEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InventoryEvent> {
        self.sender.subscribe()
    }
}

impl NotificationSink for BroadcastSink {
    fn publish(&self, events: Vec<InventoryEvent>) {
        for event in events {
            if self.sender.send(event).is_err() {
                debug!("No subscribers for inventory events");
                return;
            }
        }
    }
}

/// Keeps every published event in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<InventoryEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything collected so far.
    pub fn take(&self) -> Vec<InventoryEvent> {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *events)
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NotificationSink for CollectingSink {
    fn publish(&self, events: Vec<InventoryEvent>) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventory_core::{CanonicalPath, InventoryEntity, Properties, Tenant};

    fn created() -> InventoryEvent {
        InventoryEvent::entity_created(
            Tenant {
                path: CanonicalPath::tenant("acme").unwrap(),
                properties: Properties::new(),
            }
            .into_entity(),
        )
    }

    #[test]
    fn collecting_sink_drains() {
        let sink = CollectingSink::new();
        sink.publish(vec![created(), created()]);
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn broadcast_sink_delivers_to_subscribers() {
        let sink = BroadcastSink::new(8);
        let mut rx = sink.subscribe();
        sink.publish(vec![created()]);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.action(), inventory_core::Action::Created);
    }

    #[test]
    fn broadcast_without_subscribers_is_silent() {
        BroadcastSink::new(1).publish(vec![created()]);
    }
}
