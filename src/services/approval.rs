//! Approval workflow.
//!
//! Registration requests move `pending -> approved` or `pending ->
//! rejected`, once, through a conditional update at the store layer. A
//! reviewer that loses the race gets the already-settled status back as an
//! informational outcome instead of an error.

use std::sync::Arc;

use uuid::Uuid;

use super::assignment::AssignmentSync;
use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::models::{ApprovalRequest, ApprovalStatus, NotificationKind, Role, RoleKind, User};
use crate::notify::{Notifier, Outbound, fire_and_forget};
use crate::store::{ApprovalStore, RequestFilter, ReviewPatch, UserPatch, UserStore};

/// Result of an approve/reject call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// This call performed the transition.
    Applied,
    /// A concurrent reviewer got there first; the request already holds
    /// this terminal status.
    AlreadySettled(ApprovalStatus),
}

pub struct ApprovalService {
    approvals: Arc<dyn ApprovalStore>,
    users: Arc<dyn UserStore>,
    assignments: AssignmentSync,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl ApprovalService {
    pub fn new(
        approvals: Arc<dyn ApprovalStore>,
        users: Arc<dyn UserStore>,
        assignments: AssignmentSync,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            approvals,
            users,
            assignments,
            notifier,
            clock,
        }
    }

    /// Pending requests visible to `viewer`.
    ///
    /// Trainers see member requests of their own branch; non-primary
    /// admins see member requests; the primary admin sees everything.
    pub async fn pending_for(&self, viewer: &User) -> AppResult<Vec<ApprovalRequest>> {
        let filter = match viewer.role {
            Role::Member { .. } => return Err(AppError::forbidden("access denied")),
            Role::Trainer { branch } => RequestFilter {
                role: Some(RoleKind::Member),
                branch: Some(branch),
            },
            Role::Admin { primary: false, .. } => RequestFilter {
                role: Some(RoleKind::Member),
                branch: None,
            },
            Role::Admin { primary: true, .. } => RequestFilter::default(),
        };
        self.approvals.list_pending(filter).await
    }

    /// Approves a pending request and cascades the side effects.
    pub async fn approve(&self, reviewer: &User, request_id: Uuid) -> AppResult<ReviewOutcome> {
        let request = self.load_and_authorize(reviewer, request_id).await?;

        let review = ReviewPatch {
            status: ApprovalStatus::Approved,
            reviewed_by: reviewer.id,
            reviewed_at: self.clock.now(),
            rejection_reason: None,
        };
        if !self.approvals.settle_if_pending(request_id, review).await? {
            return self.settled_outcome(request_id).await;
        }

        self.users
            .update(request.user_id, UserPatch {
                approval_status: Some(ApprovalStatus::Approved),
                ..Default::default()
            })
            .await?;

        // A new member needs its assignment set; a new trainer changes the
        // set of every member in the branch. Sync failures do not undo the
        // approval; the startup repair pass catches any drift.
        let sync_result = match request.requested_role {
            RoleKind::Member => self.assignments.sync_for_member(request.user_id).await,
            RoleKind::Trainer => match request.branch {
                Some(branch) => self.assignments.sync_for_branch(branch).await,
                None => Ok(()),
            },
            RoleKind::Admin => Ok(()),
        };
        if let Err(e) = sync_result {
            tracing::error!(request_id = %request_id, error = %e, "post-approval sync failed");
        }

        fire_and_forget(
            self.notifier.as_ref(),
            request.user_id,
            Outbound::new(
                "Registration Approved!",
                format!(
                    "Your registration as {} has been approved. Welcome aboard!",
                    request.requested_role
                ),
                NotificationKind::Approval,
                serde_json::json!({ "status": "approved" }),
            ),
        )
        .await;

        Ok(ReviewOutcome::Applied)
    }

    /// Rejects a pending request. Rejection is also a deactivation.
    pub async fn reject(
        &self,
        reviewer: &User,
        request_id: Uuid,
        reason: Option<String>,
    ) -> AppResult<ReviewOutcome> {
        let request = self.load_and_authorize(reviewer, request_id).await?;

        let review = ReviewPatch {
            status: ApprovalStatus::Rejected,
            reviewed_by: reviewer.id,
            reviewed_at: self.clock.now(),
            rejection_reason: reason.clone(),
        };
        if !self.approvals.settle_if_pending(request_id, review).await? {
            return self.settled_outcome(request_id).await;
        }

        self.users
            .update(request.user_id, UserPatch {
                approval_status: Some(ApprovalStatus::Rejected),
                active: Some(false),
                ..Default::default()
            })
            .await?;

        let detail = reason
            .unwrap_or_else(|| "Please contact the gym for more information.".to_string());
        fire_and_forget(
            self.notifier.as_ref(),
            request.user_id,
            Outbound::new(
                "Registration Rejected",
                format!("Your registration has been rejected. {detail}"),
                NotificationKind::Approval,
                serde_json::json!({ "status": "rejected" }),
            ),
        )
        .await;

        Ok(ReviewOutcome::Applied)
    }

    async fn load_and_authorize(
        &self,
        reviewer: &User,
        request_id: Uuid,
    ) -> AppResult<ApprovalRequest> {
        let request = self
            .approvals
            .get(request_id)
            .await?
            .ok_or_else(|| AppError::not_found("approval_request", "id", request_id))?;
        self.authorize_review(reviewer, &request)?;
        Ok(request)
    }

    /// Authorization gate in front of the transition: only the primary
    /// admin reviews admin/trainer requests; member requests take any
    /// admin, or a trainer of the request's own branch.
    fn authorize_review(&self, reviewer: &User, request: &ApprovalRequest) -> AppResult<()> {
        match request.requested_role {
            RoleKind::Admin | RoleKind::Trainer => {
                if reviewer.is_primary_admin() {
                    Ok(())
                } else {
                    Err(AppError::forbidden(
                        "only the primary admin can review admin or trainer requests",
                    ))
                }
            }
            RoleKind::Member => match reviewer.role {
                Role::Admin { .. } => Ok(()),
                Role::Trainer { branch } => {
                    if request.branch == Some(branch) {
                        Ok(())
                    } else {
                        Err(AppError::forbidden(
                            "can only review member requests from your branch",
                        ))
                    }
                }
                Role::Member { .. } => Err(AppError::forbidden("access denied")),
            },
        }
    }

    /// Lost the race: report the settled status instead of erroring.
    async fn settled_outcome(&self, request_id: Uuid) -> AppResult<ReviewOutcome> {
        let latest = self
            .approvals
            .get(request_id)
            .await?
            .ok_or_else(|| AppError::not_found("approval_request", "id", request_id))?;
        Ok(ReviewOutcome::AlreadySettled(latest.status))
    }
}
