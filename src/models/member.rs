use jiff::civil::Date;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Membership payment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Pending,
    Overdue,
}

impl PaymentStatus {
    /// Whether the payment reminder scheduler should consider this status.
    pub fn needs_reminder(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Overdue)
    }
}

/// Membership terms held on a member profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipPlan {
    pub plan_name: String,
    pub start_date: Date,
    pub end_date: Date,
    pub amount: f64,
    pub payment_status: PaymentStatus,
    pub next_payment_date: Option<Date>,
    pub last_reminder_sent: Option<Timestamp>,
}

/// Profile data for a member-role user, 1:1 with the user record.
///
/// `assigned_trainers` is a derived field owned by the assignment
/// synchronizer: at quiescence it equals the set of active, approved
/// trainers of the member's branch. Nothing else may write it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberProfile {
    pub user_id: Uuid,
    pub member_no: String,
    pub assigned_trainers: Vec<Uuid>,
    pub membership: Option<MembershipPlan>,
    pub goals: Option<String>,
    pub medical_notes: Option<String>,
}

impl MemberProfile {
    pub fn new(user_id: Uuid, member_no: String) -> Self {
        Self {
            user_id,
            member_no,
            assigned_trainers: Vec::new(),
            membership: None,
            goals: None,
            medical_notes: None,
        }
    }
}
