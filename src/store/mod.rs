//! Storage seams.
//!
//! The persistent document store is an external collaborator; this module
//! defines the per-entity contracts the services depend on. Each trait
//! exposes the operations of the store contract that matter for its entity:
//! point lookup, filtered list, atomic single-document update, conditional
//! (compare-and-swap) update, count, and delete.
//!
//! `memory::MemoryStore` implements every trait over in-process maps and is
//! what tests and local runs use. A real deployment plugs a database-backed
//! implementation in behind the same traits.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use jiff::civil::Date;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    ApprovalRequest, ApprovalStatus, Branch, ConversationKey, ConversationSummary, MemberProfile,
    MembershipPlan, Message, Notification, RoleKind, User,
};

// ============================================================================
// Filters and patches
// ============================================================================

/// Filter for user listing and counting.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<RoleKind>,
    pub branch: Option<Branch>,
    pub active: Option<bool>,
    pub approval: Option<ApprovalStatus>,
    pub primary_admin: Option<bool>,
    pub exclude: Option<Uuid>,
}

impl UserFilter {
    pub fn role(kind: RoleKind) -> Self {
        Self {
            role: Some(kind),
            ..Self::default()
        }
    }

    pub fn in_branch(mut self, branch: Branch) -> Self {
        self.branch = Some(branch);
        self
    }

    /// Restricts to active, approval-approved users.
    pub fn active_approved(mut self) -> Self {
        self.active = Some(true);
        self.approval = Some(ApprovalStatus::Approved);
        self
    }

    pub fn primary(mut self, primary: bool) -> Self {
        self.primary_admin = Some(primary);
        self
    }

    pub fn excluding(mut self, user_id: Uuid) -> Self {
        self.exclude = Some(user_id);
        self
    }

    pub fn matches(&self, user: &User) -> bool {
        if let Some(role) = self.role
            && user.role.kind() != role
        {
            return false;
        }
        if let Some(branch) = self.branch
            && user.branch() != Some(branch)
        {
            return false;
        }
        if let Some(active) = self.active
            && user.active != active
        {
            return false;
        }
        if let Some(approval) = self.approval
            && user.approval_status != approval
        {
            return false;
        }
        if let Some(primary) = self.primary_admin
            && user.is_primary_admin() != primary
        {
            return false;
        }
        if let Some(excluded) = self.exclude
            && user.id == excluded
        {
            return false;
        }
        true
    }
}

/// Partial update of a user record. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    /// Moves the user to this branch, preserving role and primary flag.
    pub branch: Option<Branch>,
    pub active: Option<bool>,
    pub approval_status: Option<ApprovalStatus>,
    pub push_token: Option<String>,
}

impl UserPatch {
    pub fn apply(self, user: &mut User) {
        if let Some(v) = self.full_name {
            user.full_name = v;
        }
        if let Some(v) = self.phone {
            user.phone = v;
        }
        if let Some(b) = self.branch {
            user.role = user.role_at(b);
        }
        if let Some(v) = self.active {
            user.active = v;
        }
        if let Some(v) = self.approval_status {
            user.approval_status = v;
        }
        if let Some(v) = self.push_token {
            user.push_token = Some(v);
        }
    }
}

/// Partial update of a member profile. `assigned_trainers` is deliberately
/// absent: only the assignment synchronizer writes it, through
/// [`ProfileStore::set_assigned_trainers`].
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub goals: Option<String>,
    pub medical_notes: Option<String>,
    pub membership: Option<MembershipPlan>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.goals.is_none() && self.medical_notes.is_none() && self.membership.is_none()
    }

    pub fn apply(self, profile: &mut MemberProfile) {
        if let Some(v) = self.goals {
            profile.goals = Some(v);
        }
        if let Some(v) = self.medical_notes {
            profile.medical_notes = Some(v);
        }
        if let Some(v) = self.membership {
            profile.membership = Some(v);
        }
    }
}

/// Filter for pending approval request listings.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub role: Option<RoleKind>,
    pub branch: Option<Branch>,
}

/// Review outcome applied to a pending request via compare-and-swap.
#[derive(Debug, Clone)]
pub struct ReviewPatch {
    pub status: ApprovalStatus,
    pub reviewed_by: Uuid,
    pub reviewed_at: Timestamp,
    pub rejection_reason: Option<String>,
}

// ============================================================================
// Store traits
// ============================================================================

/// User records.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: User) -> AppResult<()>;
    async fn get(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<User>>;
    async fn list(&self, filter: UserFilter) -> AppResult<Vec<User>>;
    async fn count(&self, filter: UserFilter) -> AppResult<u64>;
    /// Atomic single-document update. Returns whether a record matched.
    async fn update(&self, id: Uuid, patch: UserPatch) -> AppResult<bool>;
}

/// Member profiles, keyed by user id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn insert(&self, profile: MemberProfile) -> AppResult<()>;
    async fn get(&self, user_id: Uuid) -> AppResult<Option<MemberProfile>>;
    async fn count(&self) -> AppResult<u64>;
    async fn update(&self, user_id: Uuid, patch: ProfilePatch) -> AppResult<bool>;
    /// Overwrites the derived assignment set. Synchronizer use only.
    async fn set_assigned_trainers(&self, user_id: Uuid, trainers: Vec<Uuid>) -> AppResult<bool>;
    /// Number of profiles currently carrying `trainer_id` in their
    /// assignment set.
    async fn count_assigned(&self, trainer_id: Uuid) -> AppResult<u64>;
    /// Profiles with a pending/overdue payment due on or before `horizon`.
    async fn due_for_reminder(&self, horizon: Date) -> AppResult<Vec<MemberProfile>>;
    async fn stamp_reminder(&self, user_id: Uuid, at: Timestamp) -> AppResult<bool>;
}

/// Approval requests.
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    async fn insert(&self, request: ApprovalRequest) -> AppResult<()>;
    async fn get(&self, id: Uuid) -> AppResult<Option<ApprovalRequest>>;
    async fn list_pending(&self, filter: RequestFilter) -> AppResult<Vec<ApprovalRequest>>;
    /// Applies `review` only if the stored status is still pending.
    /// Returns `true` when the transition applied, `false` when a
    /// concurrent reviewer already settled the request.
    async fn settle_if_pending(&self, id: Uuid, review: ReviewPatch) -> AppResult<bool>;
}

/// The append-only message log.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert(&self, message: Message) -> AppResult<()>;
    /// Both directions between the pair, oldest first.
    async fn between(&self, a: Uuid, b: Uuid) -> AppResult<Vec<Message>>;
    async fn latest_between(&self, a: Uuid, b: Uuid) -> AppResult<Option<Message>>;
    /// Unread messages sent by `from` to `to`.
    async fn count_unread(&self, from: Uuid, to: Uuid) -> AppResult<u64>;
    /// Marks unread messages from `from` to `to` as read; returns how many.
    async fn mark_read(&self, from: Uuid, to: Uuid) -> AppResult<u64>;
    /// The subset of `ids` in which `participant` is sender or receiver.
    async fn find_participating(&self, ids: &[Uuid], participant: Uuid) -> AppResult<Vec<Message>>;
    async fn delete_ids(&self, ids: &[Uuid]) -> AppResult<u64>;
    async fn delete_between(&self, a: Uuid, b: Uuid) -> AppResult<u64>;
}

/// Conversation summaries (materialized view over the message log).
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn get(&self, key: ConversationKey) -> AppResult<Option<ConversationSummary>>;
    /// Upserts the summary on message send: snippet, timestamp, and a +1
    /// on the receiver's unread counter.
    async fn record_message(
        &self,
        key: ConversationKey,
        snippet: String,
        at: Timestamp,
        unread_for: Uuid,
    ) -> AppResult<()>;
    /// Replaces the whole summary (rebuild path).
    async fn replace(&self, summary: ConversationSummary) -> AppResult<()>;
    async fn reset_unread(&self, key: ConversationKey, user_id: Uuid) -> AppResult<()>;
    async fn delete(&self, key: ConversationKey) -> AppResult<bool>;
    /// Summaries involving `user_id`, most recent first.
    async fn for_user(&self, user_id: Uuid) -> AppResult<Vec<ConversationSummary>>;
}

/// Persisted in-app notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: Notification) -> AppResult<()>;
    /// Notifications for a user, newest first.
    async fn for_user(&self, user_id: Uuid) -> AppResult<Vec<Notification>>;
    async fn unread_count(&self, user_id: Uuid) -> AppResult<u64>;
    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> AppResult<bool>;
    async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64>;
}

// ============================================================================
// Bundle
// ============================================================================

/// All store handles, cloned freely across services.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub approvals: Arc<dyn ApprovalStore>,
    pub messages: Arc<dyn MessageStore>,
    pub conversations: Arc<dyn ConversationStore>,
    pub notifications: Arc<dyn NotificationStore>,
}

impl Stores {
    /// Wires every store to a single shared [`memory::MemoryStore`].
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::new());
        Self {
            users: store.clone(),
            profiles: store.clone(),
            approvals: store.clone(),
            messages: store.clone(),
            conversations: store.clone(),
            notifications: store,
        }
    }
}
