//! Live connection registry.
//!
//! Explicit component tracking which users currently hold a live
//! (websocket) connection. The transport layer owns the lifecycle: it
//! registers a sender on connect and removes it on disconnect. The
//! notification path only looks connections up; it never creates them.

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Events pushed to a live client.
pub type ConnectionSender = mpsc::UnboundedSender<serde_json::Value>;

/// Map from user id to that user's live connection.
///
/// One connection per user: a reconnect replaces the previous sender.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<Uuid, ConnectionSender>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the live connection for a user.
    pub fn add(&self, user_id: Uuid, sender: ConnectionSender) {
        self.connections.insert(user_id, sender);
    }

    /// Removes a user's connection; returns whether one existed.
    pub fn remove(&self, user_id: Uuid) -> bool {
        self.connections.remove(&user_id).is_some()
    }

    pub fn is_connected(&self, user_id: Uuid) -> bool {
        self.connections.contains_key(&user_id)
    }

    /// Sends an event to the user's live connection, if any. A closed
    /// channel counts as no connection and is pruned.
    pub fn send_to(&self, user_id: Uuid, event: serde_json::Value) -> bool {
        let delivered = match self.connections.get(&user_id) {
            Some(sender) => sender.send(event).is_ok(),
            None => return false,
        };
        if !delivered {
            self.connections.remove(&user_id);
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_reaches_registered_connection() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();

        registry.add(user, tx);
        assert!(registry.is_connected(user));
        assert!(registry.send_to(user, serde_json::json!({"hello": 1})));
        assert_eq!(rx.recv().await.unwrap()["hello"], 1);

        assert!(registry.remove(user));
        assert!(!registry.send_to(user, serde_json::json!({})));
    }

    #[tokio::test]
    async fn test_closed_channel_is_pruned() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.add(user, tx);
        drop(rx);

        assert!(!registry.send_to(user, serde_json::json!({})));
        assert!(!registry.is_connected(user));
    }
}
