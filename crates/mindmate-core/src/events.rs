use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Per-connection buffer. A subscriber that falls this far behind misses
/// events instead of stalling the sender.
pub const SUBSCRIBER_BUFFER: usize = 256;

#[derive(Debug, Clone)]
pub struct ServerEvent {
    pub event_type: String,
    pub payload: serde_json::Value,
}

impl ServerEvent {
    pub fn new(event_type: &str, payload: serde_json::Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            payload,
        }
    }
}

pub type EventReceiver = mpsc::Receiver<Arc<ServerEvent>>;

/// Channel name for an identity.
pub fn channel_name(identity: i64) -> String {
    identity.to_string()
}

/// Process-local rooms: channel name -> live connections subscribed to it.
/// Delivery is at-most-once; nothing is queued for absent subscribers.
#[derive(Default)]
pub struct ChannelRegistry {
    rooms: DashMap<String, HashMap<Uuid, mpsc::Sender<Arc<ServerEvent>>>>,
}

impl ChannelRegistry {
    pub fn join(&self, channel: &str, connection_id: Uuid) -> EventReceiver {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.rooms
            .entry(channel.to_string())
            .or_default()
            .insert(connection_id, tx);
        rx
    }

    pub fn leave(&self, channel: &str, connection_id: Uuid) {
        if let Some(mut members) = self.rooms.get_mut(channel) {
            members.remove(&connection_id);
        }
        self.rooms.remove_if(channel, |_, members| members.is_empty());
    }

    /// Push `event` to every connection in `channel`, returning how many
    /// accepted it.
    pub fn emit(&self, channel: &str, event: Arc<ServerEvent>) -> usize {
        let mut reached = 0;
        let mut closed = Vec::new();
        if let Some(members) = self.rooms.get(channel) {
            for (connection_id, tx) in members.iter() {
                match tx.try_send(event.clone()) {
                    Ok(()) => reached += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!(
                            channel,
                            %connection_id,
                            "subscriber buffer full; dropping {}",
                            event.event_type
                        );
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*connection_id),
                }
            }
        }
        for connection_id in closed {
            self.leave(channel, connection_id);
        }
        reached
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.rooms.get(channel).map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_subscribed(&self, channel: &str, connection_id: Uuid) -> bool {
        self.rooms
            .get(channel)
            .map(|m| m.contains_key(&connection_id))
            .unwrap_or(false)
    }

    pub fn channel_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event() -> Arc<ServerEvent> {
        Arc::new(ServerEvent::new("receive_message", json!({"message": "hi"})))
    }

    #[tokio::test]
    async fn every_connection_in_a_channel_receives_the_event() {
        let registry = ChannelRegistry::default();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut rx_a = registry.join("42", a);
        let mut rx_b = registry.join("42", b);

        assert_eq!(registry.emit("42", event()), 2);
        assert_eq!(rx_a.recv().await.unwrap().payload["message"], "hi");
        assert_eq!(rx_b.recv().await.unwrap().payload["message"], "hi");
    }

    #[test]
    fn emitting_to_an_empty_channel_reaches_nobody() {
        let registry = ChannelRegistry::default();
        assert_eq!(registry.emit("7", event()), 0);
        assert_eq!(registry.channel_count(), 0);
    }

    #[test]
    fn leaving_last_member_removes_the_channel() {
        let registry = ChannelRegistry::default();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let _rx_a = registry.join("1", a);
        let _rx_b = registry.join("1", b);

        registry.leave("1", a);
        assert_eq!(registry.subscriber_count("1"), 1);
        assert!(!registry.is_subscribed("1", a));
        assert!(registry.is_subscribed("1", b));

        registry.leave("1", b);
        assert_eq!(registry.channel_count(), 0);
    }

    #[test]
    fn dropped_receivers_are_pruned_on_emit() {
        let registry = ChannelRegistry::default();
        let id = Uuid::new_v4();
        drop(registry.join("9", id));
        assert_eq!(registry.emit("9", event()), 0);
        assert_eq!(registry.subscriber_count("9"), 0);
    }

    #[test]
    fn full_buffer_drops_instead_of_blocking() {
        let registry = ChannelRegistry::default();
        let _rx = registry.join("5", Uuid::new_v4());
        for _ in 0..SUBSCRIBER_BUFFER {
            assert_eq!(registry.emit("5", event()), 1);
        }
        assert_eq!(registry.emit("5", event()), 0);
        assert_eq!(registry.subscriber_count("5"), 1);
    }
}
