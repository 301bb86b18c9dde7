//! Registration flow.
//!
//! Creates the user record, derives the initial approval status, opens an
//! approval request when review is needed, and notifies the reviewers.
//! The very first admin account becomes the primary admin and is
//! auto-approved; everyone else starts pending.

use std::sync::Arc;

use uuid::Uuid;
use validator::ValidateEmail;

use super::assignment::AssignmentSync;
use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::models::{
    ApprovalRequest, ApprovalStatus, Branch, MemberProfile, NotificationKind, Role, RoleKind, User,
};
use crate::notify::{Notifier, Outbound, fire_and_forget, notify_all_admins, notify_branch_trainers};
use crate::store::{ApprovalStore, ProfileStore, UserFilter, UserStore};

const INDIA_PHONE_PREFIX: &str = "+91";

/// Normalizes an Indian mobile number to `+91XXXXXXXXXX`.
///
/// Accepts bare 10-digit numbers and 12-digit numbers with a leading 91,
/// with any punctuation. The subscriber number must start with 6-9.
pub fn normalize_indian_phone(phone: &str) -> AppResult<String> {
    let mut digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() == 12 && digits.starts_with("91") {
        digits.drain(..2);
    }

    if digits.len() != 10 {
        return Err(AppError::Validation {
            field: "phone".to_string(),
            reason: "phone must be a 10-digit Indian mobile number".to_string(),
        });
    }
    if !matches!(digits.as_bytes()[0], b'6'..=b'9') {
        return Err(AppError::Validation {
            field: "phone".to_string(),
            reason: "phone must start with 6, 7, 8, or 9".to_string(),
        });
    }

    Ok(format!("{INDIA_PHONE_PREFIX}{digits}"))
}

/// A registration submission. Credentials are handled by the outer auth
/// layer; this flow only sees identity facts.
#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub email: Option<String>,
    pub phone: String,
    pub full_name: String,
    pub role: RoleKind,
    pub branch: Option<Branch>,
}

pub struct RegistrationService {
    users: Arc<dyn UserStore>,
    profiles: Arc<dyn ProfileStore>,
    approvals: Arc<dyn ApprovalStore>,
    assignments: AssignmentSync,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl RegistrationService {
    pub fn new(
        users: Arc<dyn UserStore>,
        profiles: Arc<dyn ProfileStore>,
        approvals: Arc<dyn ApprovalStore>,
        assignments: AssignmentSync,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            profiles,
            approvals,
            assignments,
            notifier,
            clock,
        }
    }

    /// Registers a new account.
    pub async fn register(&self, reg: NewRegistration) -> AppResult<User> {
        let phone = normalize_indian_phone(&reg.phone)?;
        let email = self.resolve_email(reg.email.as_deref(), &phone, reg.role)?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::Duplicate {
                entity: "user".to_string(),
                field: "email".to_string(),
                value: email,
            });
        }
        if self.users.find_by_phone(&phone).await?.is_some() {
            return Err(AppError::Duplicate {
                entity: "user".to_string(),
                field: "phone".to_string(),
                value: phone,
            });
        }

        let role = self.resolve_role(reg.role, reg.branch).await?;
        let is_first_admin = matches!(role, Role::Admin { primary: true, .. });
        let approval_status = if is_first_admin {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Pending
        };

        let user = User {
            id: Uuid::new_v4(),
            email: email.clone(),
            phone,
            full_name: reg.full_name.clone(),
            role,
            active: true,
            approval_status,
            push_token: None,
            created_at: self.clock.now(),
        };
        self.users.insert(user.clone()).await?;

        if let Role::Member { .. } = role {
            let member_no = self.next_member_no().await?;
            self.profiles
                .insert(MemberProfile::new(user.id, member_no))
                .await?;
            if let Err(e) = self.assignments.sync_for_member(user.id).await {
                tracing::error!(user_id = %user.id, error = %e, "initial assignment sync failed");
            }
        }

        if approval_status == ApprovalStatus::Pending {
            let request = ApprovalRequest::new(
                user.id,
                user.full_name.clone(),
                user.email.clone(),
                reg.role,
                user.branch(),
                self.clock.now(),
            );
            let request_id = request.id;
            self.approvals.insert(request).await?;
            self.notify_reviewers(&user, reg.role, request_id).await;
        }

        Ok(user)
    }

    fn resolve_email(
        &self,
        email: Option<&str>,
        phone: &str,
        role: RoleKind,
    ) -> AppResult<String> {
        if let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) {
            let candidate = email.to_ascii_lowercase();
            if !candidate.validate_email() {
                return Err(AppError::Validation {
                    field: "email".to_string(),
                    reason: "invalid email format".to_string(),
                });
            }
            return Ok(candidate);
        }

        // Members may register by phone alone; synthesize a stable
        // placeholder address so the unique-email invariant holds.
        if role == RoleKind::Member {
            let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
            return Ok(format!("member.{digits}@member.gympulse.app"));
        }

        Err(AppError::Validation {
            field: "email".to_string(),
            reason: "email is required".to_string(),
        })
    }

    async fn resolve_role(&self, kind: RoleKind, branch: Option<Branch>) -> AppResult<Role> {
        match kind {
            RoleKind::Admin => {
                let admin_count = self.users.count(UserFilter::role(RoleKind::Admin)).await?;
                Ok(Role::Admin {
                    primary: admin_count == 0,
                    branch,
                })
            }
            RoleKind::Trainer => Ok(Role::Trainer {
                branch: Self::require_branch(branch, "trainer")?,
            }),
            RoleKind::Member => Ok(Role::Member {
                branch: Self::require_branch(branch, "member")?,
            }),
        }
    }

    fn require_branch(branch: Option<Branch>, role: &str) -> AppResult<Branch> {
        branch.ok_or_else(|| AppError::Validation {
            field: "branch".to_string(),
            reason: format!("branch is required for {role} accounts"),
        })
    }

    async fn next_member_no(&self) -> AppResult<String> {
        let count = self.profiles.count().await?;
        Ok(format!("HG{:04}", count + 1))
    }

    /// Tells the people who can act on the request: primary admin for
    /// staff requests; branch trainers plus all admins for member
    /// requests. All best-effort.
    async fn notify_reviewers(&self, user: &User, role: RoleKind, request_id: Uuid) {
        let payload = serde_json::json!({
            "request_id": request_id,
            "user_id": user.id,
        });
        let branch_label = user
            .branch()
            .map(|b| b.to_string())
            .unwrap_or_else(|| "HQ".to_string());

        match role {
            RoleKind::Admin | RoleKind::Trainer => {
                let primary = self
                    .users
                    .list(UserFilter::role(RoleKind::Admin).primary(true))
                    .await;
                match primary {
                    Ok(admins) => {
                        for admin in admins {
                            fire_and_forget(
                                self.notifier.as_ref(),
                                admin.id,
                                Outbound::new(
                                    "New Approval Request",
                                    format!(
                                        "{} has requested to join as {role} at {branch_label}",
                                        user.full_name
                                    ),
                                    NotificationKind::Approval,
                                    payload.clone(),
                                ),
                            )
                            .await;
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "primary admin lookup failed"),
                }
            }
            RoleKind::Member => {
                let note = Outbound::new(
                    "New Member Registration",
                    format!("{} has requested to join at {branch_label}", user.full_name),
                    NotificationKind::Approval,
                    payload,
                );
                if let Some(branch) = user.branch() {
                    notify_branch_trainers(
                        self.users.as_ref(),
                        self.notifier.as_ref(),
                        branch,
                        &note,
                    )
                    .await;
                }
                notify_all_admins(self.users.as_ref(), self.notifier.as_ref(), &note).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::manual::ManualClock;
    use crate::store::{RequestFilter, Stores};
    use crate::testutil::{RecordingNotifier, trainer};

    struct Setup {
        stores: Stores,
        service: RegistrationService,
        notifier: Arc<RecordingNotifier>,
    }

    fn setup() -> Setup {
        let stores = Stores::in_memory();
        let notifier = Arc::new(RecordingNotifier::default());
        let clock = Arc::new(ManualClock::on_date(2025, 6, 1));
        let assignments = AssignmentSync::new(stores.users.clone(), stores.profiles.clone());
        let service = RegistrationService::new(
            stores.users.clone(),
            stores.profiles.clone(),
            stores.approvals.clone(),
            assignments,
            notifier.clone(),
            clock,
        );
        Setup {
            stores,
            service,
            notifier,
        }
    }

    fn registration(role: RoleKind, branch: Option<Branch>, phone: &str) -> NewRegistration {
        NewRegistration {
            email: Some(format!("{phone}@example.com")),
            phone: phone.to_string(),
            full_name: "Test Person".to_string(),
            role,
            branch,
        }
    }

    #[test]
    fn test_phone_normalization() {
        assert_eq!(
            normalize_indian_phone("98765 43210").unwrap(),
            "+919876543210"
        );
        assert_eq!(
            normalize_indian_phone("+91-9876543210").unwrap(),
            "+919876543210"
        );
        assert!(normalize_indian_phone("12345").is_err());
        assert!(normalize_indian_phone("1234567890").is_err());
    }

    #[tokio::test]
    async fn test_first_admin_is_primary_and_auto_approved() {
        let setup = setup();
        let first = setup
            .service
            .register(registration(RoleKind::Admin, None, "9876543210"))
            .await
            .unwrap();
        assert!(first.is_primary_admin());
        assert_eq!(first.approval_status, ApprovalStatus::Approved);

        // No request was opened for the primary admin.
        let pending = setup
            .stores
            .approvals
            .list_pending(RequestFilter::default())
            .await
            .unwrap();
        assert!(pending.is_empty());

        // The second admin is neither primary nor auto-approved.
        let second = setup
            .service
            .register(registration(RoleKind::Admin, None, "9876543211"))
            .await
            .unwrap();
        assert!(!second.is_primary_admin());
        assert_eq!(second.approval_status, ApprovalStatus::Pending);
        assert_eq!(setup.notifier.sent_to(first.id).len(), 1);
    }

    #[tokio::test]
    async fn test_member_registration_creates_profile_and_request() {
        let setup = setup();
        let t = trainer(Branch::Chakdah);
        let t_id = t.id;
        setup.stores.users.insert(t).await.unwrap();

        let user = setup
            .service
            .register(registration(
                RoleKind::Member,
                Some(Branch::Chakdah),
                "9876543212",
            ))
            .await
            .unwrap();

        assert_eq!(user.approval_status, ApprovalStatus::Pending);
        let profile = setup.stores.profiles.get(user.id).await.unwrap().unwrap();
        assert_eq!(profile.member_no, "HG0001");
        // Assignments are synced immediately, even while pending.
        assert_eq!(profile.assigned_trainers, vec![t_id]);

        let pending = setup
            .stores
            .approvals
            .list_pending(RequestFilter::default())
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].branch, Some(Branch::Chakdah));

        // The branch trainer was told.
        assert_eq!(setup.notifier.sent_to(t_id).len(), 1);
    }

    #[tokio::test]
    async fn test_member_may_register_without_email() {
        let setup = setup();
        let user = setup
            .service
            .register(NewRegistration {
                email: None,
                phone: "9876543213".to_string(),
                full_name: "Phone Only".to_string(),
                role: RoleKind::Member,
                branch: Some(Branch::Ranaghat),
            })
            .await
            .unwrap();
        assert!(user.email.ends_with("@member.gympulse.app"));

        // Staff cannot.
        let err = setup
            .service
            .register(NewRegistration {
                email: None,
                phone: "9876543214".to_string(),
                full_name: "No Email".to_string(),
                role: RoleKind::Trainer,
                branch: Some(Branch::Ranaghat),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_phone_and_email_are_rejected() {
        let setup = setup();
        setup
            .service
            .register(registration(RoleKind::Admin, None, "9876543215"))
            .await
            .unwrap();

        let dup_phone = setup
            .service
            .register(NewRegistration {
                email: Some("other@example.com".to_string()),
                phone: "9876543215".to_string(),
                full_name: "Dup".to_string(),
                role: RoleKind::Admin,
                branch: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(dup_phone, AppError::Duplicate { .. }));

        let dup_email = setup
            .service
            .register(registration(RoleKind::Admin, None, "9876543215"))
            .await
            .unwrap_err();
        assert!(matches!(dup_email, AppError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn test_branch_is_mandatory_for_trainers_and_members() {
        let setup = setup();
        for role in [RoleKind::Trainer, RoleKind::Member] {
            let err = setup
                .service
                .register(registration(role, None, "9876543216"))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation { .. }));
        }
    }
}
