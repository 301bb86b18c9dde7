//! Shared builders and doubles for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use jiff::Timestamp;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ApprovalStatus, Branch, MembershipPlan, PaymentStatus, Role, User};
use crate::notify::{Notifier, Outbound};

fn base_user(role: Role) -> User {
    let id = Uuid::new_v4();
    User {
        id,
        email: format!("{id}@test.local"),
        phone: format!("+91{}", &id.simple().to_string()[..10]),
        full_name: format!("user-{}", &id.simple().to_string()[..8]),
        role,
        active: true,
        approval_status: ApprovalStatus::Approved,
        push_token: None,
        created_at: Timestamp::now(),
    }
}

/// Active, approved admin.
pub fn admin(primary: bool, branch: Option<Branch>) -> User {
    base_user(Role::Admin { primary, branch })
}

/// Active, approved trainer.
pub fn trainer(branch: Branch) -> User {
    base_user(Role::Trainer { branch })
}

/// Active, approved member.
pub fn member(branch: Branch) -> User {
    base_user(Role::Member { branch })
}

/// Notifier double that records every dispatch.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Uuid, Outbound)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(Uuid, Outbound)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, user_id: Uuid) -> Vec<Outbound> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, note)| note.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user_id: Uuid, note: Outbound) -> AppResult<()> {
        self.sent.lock().unwrap().push((user_id, note));
        Ok(())
    }
}

/// Notifier double whose dispatch always fails.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _user_id: Uuid, _note: Outbound) -> AppResult<()> {
        Err(AppError::Internal {
            source: anyhow::anyhow!("dispatch unavailable"),
        })
    }
}

/// Membership with a pending payment due on the given date.
pub fn pending_membership(next_payment: jiff::civil::Date) -> MembershipPlan {
    MembershipPlan {
        plan_name: "monthly".to_string(),
        start_date: next_payment.saturating_sub(jiff::Span::new().days(30)),
        end_date: next_payment,
        amount: 1200.0,
        payment_status: PaymentStatus::Pending,
        next_payment_date: Some(next_payment),
        last_reminder_sent: None,
    }
}
