//! In-process registry of open notification streams, keyed by user id.
//!
//! The registry is advisory: notifications are persisted first and the push
//! is best effort. A user may hold several connections (multiple tabs); each
//! one is deregistered when its stream is dropped. Nothing survives a
//! process restart, which is acceptable because a poll endpoint exists.

use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};

use axum::response::sse::Event;
use tokio::sync::mpsc;
use uuid::Uuid;

struct Client {
    id: u64,
    tx: mpsc::UnboundedSender<Event>,
}

#[derive(Default)]
struct Inner {
    clients: Mutex<HashMap<Uuid, Vec<Client>>>,
    next_id: AtomicU64,
}

#[derive(Clone, Default)]
pub struct SseRegistry {
    inner: Arc<Inner>,
}

impl SseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `user_id`. The returned guard deregisters
    /// it on drop, so it must live as long as the stream built from the
    /// receiver.
    pub fn subscribe(&self, user_id: Uuid) -> (mpsc::UnboundedReceiver<Event>, SseConnection) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let mut clients = self.inner.clients.lock().unwrap_or_else(|e| e.into_inner());
        let connections = clients.entry(user_id).or_default();
        connections.push(Client { id, tx });
        tracing::debug!(
            %user_id,
            connections = connections.len(),
            "sse client added"
        );

        (
            rx,
            SseConnection {
                registry: self.clone(),
                user_id,
                id,
            },
        )
    }

    /// Push a JSON payload to every open connection of `user_id`. Senders
    /// whose peer has gone away are pruned; a failed push is only logged.
    pub fn publish(&self, user_id: Uuid, payload: &serde_json::Value) {
        let event = match serde_json::to_string(payload) {
            Ok(json) => Event::default().data(json),
            Err(err) => {
                tracing::warn!(%user_id, error = %err, "sse payload serialization failed");
                return;
            }
        };

        let mut clients = self.inner.clients.lock().unwrap_or_else(|e| e.into_inner());
        let Some(connections) = clients.get_mut(&user_id) else {
            return;
        };

        connections.retain(|client| {
            if client.tx.send(event.clone()).is_ok() {
                true
            } else {
                tracing::debug!(%user_id, "dropping closed sse connection");
                false
            }
        });

        if connections.is_empty() {
            clients.remove(&user_id);
        }
    }

    pub fn connection_count(&self, user_id: Uuid) -> usize {
        let clients = self.inner.clients.lock().unwrap_or_else(|e| e.into_inner());
        clients.get(&user_id).map_or(0, Vec::len)
    }

    fn remove(&self, user_id: Uuid, id: u64) {
        let mut clients = self.inner.clients.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(connections) = clients.get_mut(&user_id) {
            connections.retain(|client| client.id != id);
            let remaining = connections.len();
            if remaining == 0 {
                clients.remove(&user_id);
            }
            tracing::debug!(%user_id, remaining, "sse client removed");
        }
    }
}

/// RAII handle for one registered connection.
pub struct SseConnection {
    registry: SseRegistry,
    user_id: Uuid,
    id: u64,
}

impl Drop for SseConnection {
    fn drop(&mut self) {
        self.registry.remove(self.user_id, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_every_connection() {
        let registry = SseRegistry::new();
        let user = Uuid::new_v4();
        let (mut rx1, _guard1) = registry.subscribe(user);
        let (mut rx2, _guard2) = registry.subscribe(user);
        assert_eq!(registry.connection_count(user), 2);

        registry.publish(user, &serde_json::json!({ "content": "hello" }));
        assert!(rx1.recv().await.is_some());
        assert!(rx2.recv().await.is_some());
    }

    #[tokio::test]
    async fn publish_to_unknown_user_is_a_no_op() {
        let registry = SseRegistry::new();
        registry.publish(Uuid::new_v4(), &serde_json::json!({}));
    }

    #[tokio::test]
    async fn dropping_the_guard_deregisters() {
        let registry = SseRegistry::new();
        let user = Uuid::new_v4();
        let (_rx, guard) = registry.subscribe(user);
        assert_eq!(registry.connection_count(user), 1);
        drop(guard);
        assert_eq!(registry.connection_count(user), 0);
    }

    #[tokio::test]
    async fn closed_receivers_are_pruned_on_publish() {
        let registry = SseRegistry::new();
        let user = Uuid::new_v4();
        let (rx, _guard) = registry.subscribe(user);
        drop(rx);
        registry.publish(user, &serde_json::json!({ "content": "gone" }));
        assert_eq!(registry.connection_count(user), 0);
    }
}
