use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ApprovalStatus, Branch, RoleKind};

/// A registration awaiting review.
///
/// Created exactly once per registration that is not auto-approved. Status
/// is terminal once non-pending; the transition happens through a
/// conditional update so concurrent reviewers cannot both win.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub requested_role: RoleKind,
    pub branch: Option<Branch>,
    pub requested_at: Timestamp,
    pub status: ApprovalStatus,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<Timestamp>,
    pub rejection_reason: Option<String>,
}

impl ApprovalRequest {
    pub fn new(
        user_id: Uuid,
        user_name: String,
        user_email: String,
        requested_role: RoleKind,
        branch: Option<Branch>,
        requested_at: Timestamp,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            user_name,
            user_email,
            requested_role,
            branch,
            requested_at,
            status: ApprovalStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            rejection_reason: None,
        }
    }
}
