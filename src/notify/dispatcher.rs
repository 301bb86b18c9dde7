//! Notification dispatcher.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::connections::ConnectionRegistry;
use super::provider::PushProvider;
use crate::clock::Clock;
use crate::error::AppResult;
use crate::models::{Notification, NotificationKind};
use crate::store::{NotificationStore, UserStore};

/// An outbound notification before it is bound to a recipient.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub title: String,
    pub body: String,
    pub kind: NotificationKind,
    pub payload: serde_json::Value,
}

impl Outbound {
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        kind: NotificationKind,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            kind,
            payload,
        }
    }
}

/// Seam the services dispatch notifications through.
///
/// An `Err` means the notification record could not be persisted. Request
/// paths ignore it (the primary write already succeeded); the payment
/// reminder scheduler uses it to decide whether to stamp.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: Uuid, note: Outbound) -> AppResult<()>;
}

/// Default notifier: persist the record, then best-effort push and
/// live-connection delivery.
pub struct Dispatcher {
    notifications: Arc<dyn NotificationStore>,
    users: Arc<dyn UserStore>,
    push: Arc<dyn PushProvider>,
    registry: Arc<ConnectionRegistry>,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        users: Arc<dyn UserStore>,
        push: Arc<dyn PushProvider>,
        registry: Arc<ConnectionRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            notifications,
            users,
            push,
            registry,
            clock,
        }
    }
}

#[async_trait]
impl Notifier for Dispatcher {
    async fn notify(&self, user_id: Uuid, note: Outbound) -> AppResult<()> {
        let notification = Notification::new(
            user_id,
            note.title.clone(),
            note.body.clone(),
            note.kind,
            note.payload.clone(),
            self.clock.now(),
        );

        // The persisted record is the one part that must succeed.
        self.notifications.insert(notification.clone()).await?;

        // Push delivery is best-effort.
        match self.users.get(user_id).await {
            Ok(Some(user)) => {
                if let Some(token) = user.push_token.as_deref()
                    && let Err(e) = self
                        .push
                        .push(token, &note.title, &note.body, &note.payload)
                        .await
                {
                    tracing::error!(
                        %user_id,
                        provider = self.push.name(),
                        error = %e,
                        "push delivery failed"
                    );
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(%user_id, error = %e, "user lookup for push failed");
            }
        }

        // Live-connection delivery is best-effort too.
        if let Ok(event) = serde_json::to_value(&notification) {
            self.registry.send_to(user_id, event);
        }

        Ok(())
    }
}

/// Dispatches to `user_id` and logs instead of propagating failure.
/// Request paths use this so a notification problem never fails the
/// primary write.
pub async fn fire_and_forget(notifier: &dyn Notifier, user_id: Uuid, note: Outbound) {
    if let Err(e) = notifier.notify(user_id, note).await {
        tracing::error!(%user_id, error = %e, "notification dispatch failed");
    }
}
