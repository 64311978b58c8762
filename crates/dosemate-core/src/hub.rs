//! Fan-out hub for real-time client notifications.
//!
//! Holds the set of live client connections and broadcasts JSON events to
//! all of them. Fire-and-forget: no acknowledgment, no retry, no per-client
//! queue. A disconnected client simply misses events sent while it was
//! offline.

use dashmap::DashMap;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use crate::events::NotificationEvent;

pub type ClientId = Uuid;

/// Thread-safe registry of connected clients.
///
/// Injected and lifecycle-scoped rather than a process-wide static; its
/// only operations are subscribe, unsubscribe and broadcast. Internal
/// synchronization comes from the concurrent map, so callers never lock.
#[derive(Debug, Default)]
pub struct NotificationHub {
    clients: DashMap<ClientId, UnboundedSender<String>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client connection. The returned receiver yields each
    /// broadcast event as a JSON string.
    pub fn subscribe(&self) -> (ClientId, UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.clients.insert(id, tx);
        tracing::debug!(client = %id, total = self.clients.len(), "client connected");
        (id, rx)
    }

    /// Remove a client connection.
    pub fn unsubscribe(&self, id: ClientId) {
        self.clients.remove(&id);
        tracing::debug!(client = %id, total = self.clients.len(), "client disconnected");
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Serialize `event` once and deliver it to every connected client.
    ///
    /// A send failure on one connection is logged and does not prevent
    /// delivery to the others or propagate to the caller. Clients whose
    /// receiver was dropped are pruned.
    pub fn broadcast(&self, event: &NotificationEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize notification event");
                return;
            }
        };

        let mut dead = Vec::new();
        for entry in self.clients.iter() {
            if entry.value().send(payload.clone()).is_err() {
                dead.push(*entry.key());
            }
        }
        for id in dead {
            tracing::debug!(client = %id, "dropping disconnected client");
            self.clients.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReminderStatus;
    use chrono::Utc;

    fn sample_event() -> NotificationEvent {
        NotificationEvent::IntakeRecorded {
            reminder_id: 1,
            medicine_id: 2,
            medicine_name: "Aspirin".into(),
            status: ReminderStatus::Taken,
            timestamp: Utc::now(),
            latency_seconds: None,
        }
    }

    #[test]
    fn broadcast_reaches_all_subscribers() {
        let hub = NotificationHub::new();
        let (_a, mut rx_a) = hub.subscribe();
        let (_b, mut rx_b) = hub.subscribe();
        assert_eq!(hub.client_count(), 2);

        hub.broadcast(&sample_event());
        let msg_a = rx_a.try_recv().unwrap();
        let msg_b = rx_b.try_recv().unwrap();
        assert_eq!(msg_a, msg_b);
        assert!(msg_a.contains("INTAKE_RECORDED"));
    }

    #[test]
    fn dropped_client_is_pruned_on_next_broadcast() {
        let hub = NotificationHub::new();
        let (_a, rx_a) = hub.subscribe();
        let (_b, mut rx_b) = hub.subscribe();
        drop(rx_a);

        hub.broadcast(&sample_event());
        assert_eq!(hub.client_count(), 1);
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let hub = NotificationHub::new();
        let (id, mut rx) = hub.subscribe();
        hub.unsubscribe(id);
        hub.broadcast(&sample_event());
        assert!(rx.try_recv().is_err());
        assert_eq!(hub.client_count(), 0);
    }
}
