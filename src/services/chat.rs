//! Direct messaging.
//!
//! The message log is the source of truth; conversation summaries are a
//! derived view. Sending keeps delivery robust: once the message row is
//! persisted, summary upsert and live delivery failures are logged and
//! swallowed. Deletion paths rebuild the affected summaries from the
//! surviving log.

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::clock::Clock;
use crate::config::ChatConfig;
use crate::error::{AppError, AppResult};
use crate::models::{
    ConversationKey, ConversationSummary, Message, MessageKind, Role, User,
};
use crate::notify::ConnectionRegistry;
use crate::policy;
use crate::store::{ConversationStore, MessageStore, UserFilter, UserStore};

/// A conversation as seen by one participant.
#[derive(Debug, Clone)]
pub struct ConversationEntry {
    pub other: User,
    pub last_message: String,
    pub last_message_time: jiff::Timestamp,
    pub unread: u64,
}

pub struct ChatService {
    users: Arc<dyn UserStore>,
    messages: Arc<dyn MessageStore>,
    conversations: Arc<dyn ConversationStore>,
    registry: Arc<ConnectionRegistry>,
    clock: Arc<dyn Clock>,
    config: ChatConfig,
}

impl ChatService {
    pub fn new(
        users: Arc<dyn UserStore>,
        messages: Arc<dyn MessageStore>,
        conversations: Arc<dyn ConversationStore>,
        registry: Arc<ConnectionRegistry>,
        clock: Arc<dyn Clock>,
        config: ChatConfig,
    ) -> Self {
        Self {
            users,
            messages,
            conversations,
            registry,
            clock,
            config,
        }
    }

    /// Char-safe prefix of the message content for the summary view.
    fn snippet(&self, content: &str) -> String {
        content.chars().take(self.config.snippet_len).collect()
    }

    async fn require_user(&self, id: Uuid) -> AppResult<User> {
        self.users
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("user", "id", id))
    }

    /// Persists a message after the chat policy admits the pair, then
    /// updates the summary and delivers to the receiver's live connection.
    pub async fn send_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: String,
        kind: MessageKind,
    ) -> AppResult<Message> {
        let sender = self.require_user(sender_id).await?;
        let receiver = self.require_user(receiver_id).await?;
        policy::can_chat(&sender, &receiver).map_err(AppError::forbidden)?;

        if content.trim().is_empty() {
            return Err(AppError::Validation {
                field: "content".to_string(),
                reason: "message content cannot be empty".to_string(),
            });
        }

        let message = Message::new(sender_id, receiver_id, content, kind, self.clock.now());
        self.messages.insert(message.clone()).await?;

        // The message row is persisted; everything below must not fail the send.
        let key = ConversationKey::new(sender_id, receiver_id);
        if let Err(e) = self
            .conversations
            .record_message(
                key,
                self.snippet(&message.content),
                message.created_at,
                receiver_id,
            )
            .await
        {
            tracing::error!(message_id = %message.id, error = %e, "conversation update failed");
        }

        match serde_json::to_value(&message) {
            Ok(event) => {
                self.registry.send_to(receiver_id, event);
            }
            Err(e) => {
                tracing::error!(message_id = %message.id, error = %e, "message serialization failed");
            }
        }

        Ok(message)
    }

    /// The full thread with `other_id`, oldest first. Opening the thread
    /// marks the other side's messages read and clears the viewer's
    /// unread counter.
    pub async fn thread(&self, viewer_id: Uuid, other_id: Uuid) -> AppResult<Vec<Message>> {
        let viewer = self.require_user(viewer_id).await?;
        let other = self.require_user(other_id).await?;
        policy::can_chat(&viewer, &other).map_err(AppError::forbidden)?;

        let messages = self.messages.between(viewer_id, other_id).await?;
        self.messages.mark_read(other_id, viewer_id).await?;
        self.conversations
            .reset_unread(ConversationKey::new(viewer_id, other_id), viewer_id)
            .await?;
        Ok(messages)
    }

    /// The viewer's conversations, most recent first.
    ///
    /// The chat policy is re-checked from the viewer's side on every
    /// listing, so a conversation goes invisible to a party that can no
    /// longer reach the other one, without any deletion.
    pub async fn conversations(&self, viewer_id: Uuid) -> AppResult<Vec<ConversationEntry>> {
        let viewer = self.require_user(viewer_id).await?;
        let summaries = self.conversations.for_user(viewer_id).await?;

        let mut entries = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let other_id = summary.key.other(viewer_id);
            let Some(other) = self.users.get(other_id).await? else {
                continue;
            };
            if policy::can_chat(&viewer, &other).is_err() {
                continue;
            }
            entries.push(ConversationEntry {
                unread: summary.unread_for(viewer_id),
                other,
                last_message: summary.last_message,
                last_message_time: summary.last_message_time,
            });
        }
        Ok(entries)
    }

    /// Everyone the viewer is currently allowed to message, admins first,
    /// then trainers, then members, each sorted by name.
    pub async fn contacts(&self, viewer_id: Uuid) -> AppResult<Vec<User>> {
        let viewer = self.require_user(viewer_id).await?;
        let candidates = self
            .users
            .list(UserFilter::default().active_approved().excluding(viewer_id))
            .await?;

        let mut contacts: Vec<User> = candidates
            .into_iter()
            .filter(|c| policy::can_chat(&viewer, c).is_ok())
            .collect();
        contacts.sort_by_key(|c| (role_rank(&c.role), c.full_name.to_lowercase()));
        Ok(contacts)
    }

    /// Deletes the subset of `message_ids` the actor participates in and
    /// rebuilds the summary of every affected pair. Returns the number of
    /// messages removed.
    pub async fn delete_selected(&self, actor_id: Uuid, message_ids: &[Uuid]) -> AppResult<u64> {
        if message_ids.is_empty() {
            return Ok(0);
        }

        let deletable = self
            .messages
            .find_participating(message_ids, actor_id)
            .await?;
        if deletable.is_empty() {
            return Ok(0);
        }

        let ids: Vec<Uuid> = deletable.iter().map(|m| m.id).collect();
        let affected: HashSet<ConversationKey> = deletable
            .iter()
            .map(|m| ConversationKey::new(m.sender_id, m.receiver_id))
            .collect();

        let deleted = self.messages.delete_ids(&ids).await?;
        for key in affected {
            self.rebuild_conversation(key).await?;
        }
        Ok(deleted)
    }

    /// Removes every message between the actor and `other_id`, plus the
    /// summary. Returns the number of messages removed.
    pub async fn delete_conversation(&self, actor_id: Uuid, other_id: Uuid) -> AppResult<u64> {
        if actor_id == other_id {
            return Err(AppError::Validation {
                field: "other_id".to_string(),
                reason: "invalid conversation".to_string(),
            });
        }

        let deleted = self.messages.delete_between(actor_id, other_id).await?;
        self.conversations
            .delete(ConversationKey::new(actor_id, other_id))
            .await?;
        Ok(deleted)
    }

    /// Recomputes one pair's summary from the surviving message log.
    /// An empty log deletes the summary outright.
    pub async fn rebuild_conversation(&self, key: ConversationKey) -> AppResult<()> {
        let [a, b] = key.participants();
        let Some(latest) = self.messages.latest_between(a, b).await? else {
            self.conversations.delete(key).await?;
            return Ok(());
        };

        let unread = [
            (a, self.messages.count_unread(b, a).await?),
            (b, self.messages.count_unread(a, b).await?),
        ]
        .into_iter()
        .collect();

        self.conversations
            .replace(ConversationSummary {
                key,
                last_message: self.snippet(&latest.content),
                last_message_time: latest.created_at,
                unread,
            })
            .await?;
        Ok(())
    }
}

fn role_rank(role: &Role) -> u8 {
    match role {
        Role::Admin { .. } => 0,
        Role::Trainer { .. } => 1,
        Role::Member { .. } => 2,
    }
}
