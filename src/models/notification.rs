use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification category, used by clients to route taps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Approval,
    Payment,
    Announcement,
    #[default]
    General,
}

/// A persisted in-app notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub kind: NotificationKind,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
    pub read: bool,
}

impl Notification {
    pub fn new(
        user_id: Uuid,
        title: String,
        body: String,
        kind: NotificationKind,
        payload: serde_json::Value,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            title,
            body,
            kind,
            payload,
            created_at,
            read: false,
        }
    }
}
