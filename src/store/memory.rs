//! In-process store implementation.
//!
//! Backs every store trait with maps behind `tokio::sync::RwLock`. Each
//! method takes the lock once, which gives the single-document atomicity
//! the contracts require; conditional updates check-and-mutate under the
//! write lock.

use std::collections::HashMap;

use async_trait::async_trait;
use jiff::Timestamp;
use jiff::civil::Date;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    ApprovalStore, ConversationStore, MessageStore, NotificationStore, ProfilePatch, ProfileStore,
    RequestFilter, ReviewPatch, UserFilter, UserPatch, UserStore,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    ApprovalRequest, ApprovalStatus, ConversationKey, ConversationSummary, MemberProfile, Message,
    Notification, User,
};

/// Map-backed store for tests and single-process runs.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    profiles: RwLock<HashMap<Uuid, MemberProfile>>,
    requests: RwLock<HashMap<Uuid, ApprovalRequest>>,
    messages: RwLock<HashMap<Uuid, Message>>,
    conversations: RwLock<HashMap<ConversationKey, ConversationSummary>>,
    notifications: RwLock<HashMap<Uuid, Notification>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_oldest_first(messages: &mut [Message]) {
    messages.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn is_between(m: &Message, a: Uuid, b: Uuid) -> bool {
    (m.sender_id == a && m.receiver_id == b) || (m.sender_id == b && m.receiver_id == a)
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: User) -> AppResult<()> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(AppError::Duplicate {
                entity: "user".to_string(),
                field: "id".to_string(),
                value: user.id.to_string(),
            });
        }
        users.insert(user.id, user);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.phone == phone).cloned())
    }

    async fn list(&self, filter: UserFilter) -> AppResult<Vec<User>> {
        let users = self.users.read().await;
        let mut matched: Vec<User> = users.values().filter(|u| filter.matches(u)).cloned().collect();
        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(matched)
    }

    async fn count(&self, filter: UserFilter) -> AppResult<u64> {
        let users = self.users.read().await;
        Ok(users.values().filter(|u| filter.matches(u)).count() as u64)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> AppResult<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(&id) {
            Some(user) => {
                patch.apply(user);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn insert(&self, profile: MemberProfile) -> AppResult<()> {
        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(&profile.user_id) {
            return Err(AppError::Duplicate {
                entity: "member_profile".to_string(),
                field: "user_id".to_string(),
                value: profile.user_id.to_string(),
            });
        }
        profiles.insert(profile.user_id, profile);
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> AppResult<Option<MemberProfile>> {
        Ok(self.profiles.read().await.get(&user_id).cloned())
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.profiles.read().await.len() as u64)
    }

    async fn update(&self, user_id: Uuid, patch: ProfilePatch) -> AppResult<bool> {
        let mut profiles = self.profiles.write().await;
        match profiles.get_mut(&user_id) {
            Some(profile) => {
                patch.apply(profile);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_assigned_trainers(&self, user_id: Uuid, trainers: Vec<Uuid>) -> AppResult<bool> {
        let mut profiles = self.profiles.write().await;
        match profiles.get_mut(&user_id) {
            Some(profile) => {
                profile.assigned_trainers = trainers;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_assigned(&self, trainer_id: Uuid) -> AppResult<u64> {
        let profiles = self.profiles.read().await;
        Ok(profiles
            .values()
            .filter(|p| p.assigned_trainers.contains(&trainer_id))
            .count() as u64)
    }

    async fn due_for_reminder(&self, horizon: Date) -> AppResult<Vec<MemberProfile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles
            .values()
            .filter(|p| {
                p.membership.as_ref().is_some_and(|m| {
                    m.payment_status.needs_reminder()
                        && m.next_payment_date.is_some_and(|due| due <= horizon)
                })
            })
            .cloned()
            .collect())
    }

    async fn stamp_reminder(&self, user_id: Uuid, at: Timestamp) -> AppResult<bool> {
        let mut profiles = self.profiles.write().await;
        match profiles.get_mut(&user_id).and_then(|p| p.membership.as_mut()) {
            Some(membership) => {
                membership.last_reminder_sent = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ApprovalStore for MemoryStore {
    async fn insert(&self, request: ApprovalRequest) -> AppResult<()> {
        let mut requests = self.requests.write().await;
        if requests.contains_key(&request.id) {
            return Err(AppError::Duplicate {
                entity: "approval_request".to_string(),
                field: "id".to_string(),
                value: request.id.to_string(),
            });
        }
        requests.insert(request.id, request);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<ApprovalRequest>> {
        Ok(self.requests.read().await.get(&id).cloned())
    }

    async fn list_pending(&self, filter: RequestFilter) -> AppResult<Vec<ApprovalRequest>> {
        let requests = self.requests.read().await;
        let mut pending: Vec<ApprovalRequest> = requests
            .values()
            .filter(|r| r.status == ApprovalStatus::Pending)
            .filter(|r| filter.role.is_none_or(|role| r.requested_role == role))
            .filter(|r| filter.branch.is_none_or(|branch| r.branch == Some(branch)))
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(pending)
    }

    async fn settle_if_pending(&self, id: Uuid, review: ReviewPatch) -> AppResult<bool> {
        // Check-and-mutate under the write lock: this is the CAS the
        // approval workflow relies on.
        let mut requests = self.requests.write().await;
        match requests.get_mut(&id) {
            Some(request) if request.status == ApprovalStatus::Pending => {
                request.status = review.status;
                request.reviewed_by = Some(review.reviewed_by);
                request.reviewed_at = Some(review.reviewed_at);
                request.rejection_reason = review.rejection_reason;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn insert(&self, message: Message) -> AppResult<()> {
        let mut messages = self.messages.write().await;
        messages.insert(message.id, message);
        Ok(())
    }

    async fn between(&self, a: Uuid, b: Uuid) -> AppResult<Vec<Message>> {
        let messages = self.messages.read().await;
        let mut found: Vec<Message> = messages
            .values()
            .filter(|m| is_between(m, a, b))
            .cloned()
            .collect();
        sort_oldest_first(&mut found);
        Ok(found)
    }

    async fn latest_between(&self, a: Uuid, b: Uuid) -> AppResult<Option<Message>> {
        let mut found = self.between(a, b).await?;
        Ok(found.pop())
    }

    async fn count_unread(&self, from: Uuid, to: Uuid) -> AppResult<u64> {
        let messages = self.messages.read().await;
        Ok(messages
            .values()
            .filter(|m| m.sender_id == from && m.receiver_id == to && !m.read)
            .count() as u64)
    }

    async fn mark_read(&self, from: Uuid, to: Uuid) -> AppResult<u64> {
        let mut messages = self.messages.write().await;
        let mut updated = 0;
        for message in messages.values_mut() {
            if message.sender_id == from && message.receiver_id == to && !message.read {
                message.read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn find_participating(&self, ids: &[Uuid], participant: Uuid) -> AppResult<Vec<Message>> {
        let messages = self.messages.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| messages.get(id))
            .filter(|m| m.sender_id == participant || m.receiver_id == participant)
            .cloned()
            .collect())
    }

    async fn delete_ids(&self, ids: &[Uuid]) -> AppResult<u64> {
        let mut messages = self.messages.write().await;
        let mut deleted = 0;
        for id in ids {
            if messages.remove(id).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn delete_between(&self, a: Uuid, b: Uuid) -> AppResult<u64> {
        let mut messages = self.messages.write().await;
        let before = messages.len();
        messages.retain(|_, m| !is_between(m, a, b));
        Ok((before - messages.len()) as u64)
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn get(&self, key: ConversationKey) -> AppResult<Option<ConversationSummary>> {
        Ok(self.conversations.read().await.get(&key).cloned())
    }

    async fn record_message(
        &self,
        key: ConversationKey,
        snippet: String,
        at: Timestamp,
        unread_for: Uuid,
    ) -> AppResult<()> {
        let mut conversations = self.conversations.write().await;
        let summary = conversations
            .entry(key)
            .or_insert_with(|| ConversationSummary {
                key,
                last_message: String::new(),
                last_message_time: at,
                unread: HashMap::new(),
            });
        summary.last_message = snippet;
        summary.last_message_time = at;
        *summary.unread.entry(unread_for).or_insert(0) += 1;
        Ok(())
    }

    async fn replace(&self, summary: ConversationSummary) -> AppResult<()> {
        let mut conversations = self.conversations.write().await;
        conversations.insert(summary.key, summary);
        Ok(())
    }

    async fn reset_unread(&self, key: ConversationKey, user_id: Uuid) -> AppResult<()> {
        let mut conversations = self.conversations.write().await;
        if let Some(summary) = conversations.get_mut(&key) {
            summary.unread.insert(user_id, 0);
        }
        Ok(())
    }

    async fn delete(&self, key: ConversationKey) -> AppResult<bool> {
        let mut conversations = self.conversations.write().await;
        Ok(conversations.remove(&key).is_some())
    }

    async fn for_user(&self, user_id: Uuid) -> AppResult<Vec<ConversationSummary>> {
        let conversations = self.conversations.read().await;
        let mut found: Vec<ConversationSummary> = conversations
            .values()
            .filter(|s| s.key.contains(user_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.last_message_time.cmp(&a.last_message_time));
        Ok(found)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert(&self, notification: Notification) -> AppResult<()> {
        let mut notifications = self.notifications.write().await;
        notifications.insert(notification.id, notification);
        Ok(())
    }

    async fn for_user(&self, user_id: Uuid) -> AppResult<Vec<Notification>> {
        let notifications = self.notifications.read().await;
        let mut found: Vec<Notification> = notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn unread_count(&self, user_id: Uuid) -> AppResult<u64> {
        let notifications = self.notifications.read().await;
        Ok(notifications
            .values()
            .filter(|n| n.user_id == user_id && !n.read)
            .count() as u64)
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let mut notifications = self.notifications.write().await;
        match notifications.get_mut(&id) {
            Some(n) if n.user_id == user_id => {
                n.read = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64> {
        let mut notifications = self.notifications.write().await;
        let mut updated = 0;
        for n in notifications.values_mut() {
            if n.user_id == user_id && !n.read {
                n.read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }
}
