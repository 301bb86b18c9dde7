use std::collections::HashMap;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of chat message payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    Pdf,
}

/// A direct message between two users. Append-only except for the read
/// flag and bulk/selective deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub kind: MessageKind,
    pub created_at: Timestamp,
    pub read: bool,
}

impl Message {
    pub fn new(
        sender_id: Uuid,
        receiver_id: Uuid,
        content: String,
        kind: MessageKind,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            content,
            kind,
            created_at,
            read: false,
        }
    }
}

/// Unordered participant pair identifying a conversation.
///
/// Constructed sorted so `(a, b)` and `(b, a)` key the same summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey([Uuid; 2]);

impl ConversationKey {
    pub fn new(a: Uuid, b: Uuid) -> Self {
        if a <= b { Self([a, b]) } else { Self([b, a]) }
    }

    pub fn participants(&self) -> [Uuid; 2] {
        self.0
    }

    pub fn contains(&self, user_id: Uuid) -> bool {
        self.0[0] == user_id || self.0[1] == user_id
    }

    /// The participant that is not `user_id`.
    pub fn other(&self, user_id: Uuid) -> Uuid {
        if self.0[0] == user_id { self.0[1] } else { self.0[0] }
    }
}

/// Denormalized per-pair conversation state: last message snippet and
/// per-user unread counts.
///
/// Fully derived from the message log. It may be deleted and rebuilt at
/// any time and is never the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub key: ConversationKey,
    pub last_message: String,
    pub last_message_time: Timestamp,
    pub unread: HashMap<Uuid, u64>,
}

impl ConversationSummary {
    pub fn unread_for(&self, user_id: Uuid) -> u64 {
        self.unread.get(&user_id).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_key_is_unordered() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(ConversationKey::new(a, b), ConversationKey::new(b, a));
        assert_eq!(ConversationKey::new(a, b).other(a), b);
        assert_eq!(ConversationKey::new(a, b).other(b), a);
    }
}
