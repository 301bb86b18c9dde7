//! Notification fan-out helpers.
//!
//! Group sends over the dispatcher. Per-recipient failures are logged and
//! swallowed; a broadcast never fails the caller.

use super::dispatcher::{Notifier, Outbound, fire_and_forget};
use crate::models::{Branch, RoleKind};
use crate::store::{UserFilter, UserStore};

/// Sends `note` to every active, approved admin.
pub async fn notify_all_admins(users: &dyn UserStore, notifier: &dyn Notifier, note: &Outbound) {
    fan_out(
        users,
        notifier,
        UserFilter::role(RoleKind::Admin).active_approved(),
        note,
    )
    .await;
}

/// Sends `note` to every active, approved trainer of `branch`.
pub async fn notify_branch_trainers(
    users: &dyn UserStore,
    notifier: &dyn Notifier,
    branch: Branch,
    note: &Outbound,
) {
    fan_out(
        users,
        notifier,
        UserFilter::role(RoleKind::Trainer)
            .in_branch(branch)
            .active_approved(),
        note,
    )
    .await;
}

async fn fan_out(
    users: &dyn UserStore,
    notifier: &dyn Notifier,
    filter: UserFilter,
    note: &Outbound,
) {
    match users.list(filter).await {
        Ok(recipients) => {
            for recipient in recipients {
                fire_and_forget(notifier, recipient.id, note.clone()).await;
            }
        }
        Err(e) => tracing::error!(error = %e, "recipient lookup for fan-out failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationKind;
    use crate::store::Stores;
    use crate::testutil::{RecordingNotifier, admin, trainer};

    #[tokio::test]
    async fn test_branch_trainer_fan_out_skips_other_branches() {
        let stores = Stores::in_memory();
        let notifier = RecordingNotifier::default();

        let near = trainer(Branch::Chakdah);
        let far = trainer(Branch::Ranaghat);
        let mut inactive = trainer(Branch::Chakdah);
        inactive.active = false;
        let a = admin(true, None);
        for u in [&near, &far, &inactive, &a] {
            stores.users.insert(u.clone()).await.unwrap();
        }

        let note = Outbound::new("t", "b", NotificationKind::General, serde_json::json!({}));
        notify_branch_trainers(stores.users.as_ref(), &notifier, Branch::Chakdah, &note).await;

        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(notifier.sent()[0].0, near.id);

        notify_all_admins(stores.users.as_ref(), &notifier, &note).await;
        assert_eq!(notifier.sent_to(a.id).len(), 1);
    }
}
