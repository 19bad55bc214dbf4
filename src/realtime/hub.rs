use crate::models::Message;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

const ROOM_BUFFER: usize = 64;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    Message { message: Message },
    Typing { account_id: Uuid, typing: bool },
}

/// Ephemeral connection state: presence, typing, and per-conversation
/// broadcast channels. Nothing here is persisted; it is rebuilt as clients
/// reconnect after a restart.
#[derive(Clone, Default)]
pub struct ChatHub {
    inner: Arc<HubInner>,
}

#[derive(Default)]
struct HubInner {
    rooms: RwLock<HashMap<Uuid, broadcast::Sender<ChatEvent>>>,
    online: RwLock<HashMap<Uuid, usize>>,
    typing: RwLock<HashMap<Uuid, HashSet<Uuid>>>,
}

impl ChatHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, conversation_id: Uuid) -> broadcast::Receiver<ChatEvent> {
        let mut rooms = self.inner.rooms.write().await;
        rooms
            .entry(conversation_id)
            .or_insert_with(|| broadcast::channel(ROOM_BUFFER).0)
            .subscribe()
    }

    pub async fn publish(&self, conversation_id: Uuid, event: ChatEvent) {
        let mut rooms = self.inner.rooms.write().await;
        if let Some(sender) = rooms.get(&conversation_id) {
            if sender.receiver_count() == 0 {
                rooms.remove(&conversation_id);
            } else {
                // A send error means every receiver dropped between the
                // count check and the send; nothing to deliver to.
                let _ = sender.send(event);
            }
        }
    }

    pub async fn connect(&self, account_id: Uuid) {
        let mut online = self.inner.online.write().await;
        *online.entry(account_id).or_insert(0) += 1;
    }

    pub async fn disconnect(&self, account_id: Uuid) {
        let mut online = self.inner.online.write().await;
        if let Some(count) = online.get_mut(&account_id) {
            *count -= 1;
            if *count == 0 {
                online.remove(&account_id);
            }
        }
    }

    pub async fn is_online(&self, account_id: Uuid) -> bool {
        self.inner.online.read().await.contains_key(&account_id)
    }

    pub async fn set_typing(&self, conversation_id: Uuid, account_id: Uuid, typing: bool) {
        {
            let mut map = self.inner.typing.write().await;
            if typing {
                map.entry(conversation_id).or_default().insert(account_id);
            } else if let Some(set) = map.get_mut(&conversation_id) {
                set.remove(&account_id);
                if set.is_empty() {
                    map.remove(&conversation_id);
                }
            }
        }
        self.publish(
            conversation_id,
            ChatEvent::Typing {
                account_id,
                typing,
            },
        )
        .await;
    }

    pub async fn typing_in(&self, conversation_id: Uuid) -> Vec<Uuid> {
        self.inner
            .typing
            .read()
            .await
            .get(&conversation_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(conversation_id: Uuid) -> Message {
        Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: Uuid::new_v4(),
            body: "hello".to_string(),
            is_broadcast: false,
            sent_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let hub = ChatHub::new();
        let room = Uuid::new_v4();
        let mut rx = hub.subscribe(room).await;

        hub.publish(room, ChatEvent::Message { message: message(room) })
            .await;

        match rx.recv().await.unwrap() {
            ChatEvent::Message { message } => assert_eq!(message.conversation_id, room),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let hub = ChatHub::new();
        let room_a = Uuid::new_v4();
        let room_b = Uuid::new_v4();
        let mut rx_a = hub.subscribe(room_a).await;
        let _rx_b = hub.subscribe(room_b).await;

        hub.publish(room_b, ChatEvent::Message { message: message(room_b) })
            .await;

        assert!(matches!(
            rx_a.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_presence_refcounts_connections() {
        let hub = ChatHub::new();
        let account = Uuid::new_v4();

        hub.connect(account).await;
        hub.connect(account).await;
        assert!(hub.is_online(account).await);

        hub.disconnect(account).await;
        assert!(hub.is_online(account).await);

        hub.disconnect(account).await;
        assert!(!hub.is_online(account).await);
    }

    #[tokio::test]
    async fn test_typing_set_and_clear() {
        let hub = ChatHub::new();
        let room = Uuid::new_v4();
        let account = Uuid::new_v4();

        hub.set_typing(room, account, true).await;
        assert_eq!(hub.typing_in(room).await, vec![account]);

        hub.set_typing(room, account, false).await;
        assert!(hub.typing_in(room).await.is_empty());
    }
}
