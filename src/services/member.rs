//! Member and trainer management.
//!
//! All member access funnels through [`policy::can_manage`]; branch
//! equality is the only scoping mechanism. Profile edits are filtered to
//! the fields the acting role may touch, and any branch or activity
//! change triggers an assignment resync.

use std::sync::Arc;

use uuid::Uuid;

use super::assignment::AssignmentSync;
use crate::error::{AppError, AppResult};
use crate::models::{Branch, MemberProfile, MembershipPlan, Role, RoleKind, User};
use crate::policy;
use crate::store::{ProfilePatch, ProfileStore, UserFilter, UserPatch, UserStore};

use super::registration::normalize_indian_phone;

const DENY_TRAINER_MANAGE_BRANCH: &str = "can only manage trainers from your branch";

/// Edit request against a member record. Fields outside the acting role's
/// allowance are silently dropped:
/// members edit their own name, phone, and goals; trainers edit goals,
/// medical notes, and membership; admins edit everything.
#[derive(Debug, Clone, Default)]
pub struct UpdateMember {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub goals: Option<String>,
    pub medical_notes: Option<String>,
    pub membership: Option<MembershipPlan>,
}

impl UpdateMember {
    fn scoped_to(self, actor_role: RoleKind) -> Self {
        match actor_role {
            RoleKind::Member => Self {
                full_name: self.full_name,
                phone: self.phone,
                goals: self.goals,
                ..Self::default()
            },
            RoleKind::Trainer => Self {
                goals: self.goals,
                medical_notes: self.medical_notes,
                membership: self.membership,
                ..Self::default()
            },
            RoleKind::Admin => self,
        }
    }
}

/// A trainer with their current workload.
#[derive(Debug, Clone)]
pub struct TrainerOverview {
    pub user: User,
    pub assigned_members: u64,
}

pub struct MemberService {
    users: Arc<dyn UserStore>,
    profiles: Arc<dyn ProfileStore>,
    assignments: AssignmentSync,
}

impl MemberService {
    pub fn new(
        users: Arc<dyn UserStore>,
        profiles: Arc<dyn ProfileStore>,
        assignments: AssignmentSync,
    ) -> Self {
        Self {
            users,
            profiles,
            assignments,
        }
    }

    /// Loads a member and their profile, enforcing the manage policy.
    pub async fn member_access(
        &self,
        actor: &User,
        member_id: Uuid,
    ) -> AppResult<(User, MemberProfile)> {
        let user = self
            .users
            .get(member_id)
            .await?
            .filter(|u| matches!(u.role, Role::Member { .. }))
            .ok_or_else(|| AppError::not_found("member", "id", member_id))?;

        policy::can_manage(actor, &user).map_err(AppError::forbidden)?;

        let profile = self
            .profiles
            .get(member_id)
            .await?
            .ok_or_else(|| AppError::not_found("member_profile", "user_id", member_id))?;
        Ok((user, profile))
    }

    pub async fn get_member(&self, actor: &User, member_id: Uuid) -> AppResult<(User, MemberProfile)> {
        self.member_access(actor, member_id).await
    }

    /// Applies a role-filtered edit to the member's user record and profile.
    pub async fn update_member(
        &self,
        actor: &User,
        member_id: Uuid,
        update: UpdateMember,
    ) -> AppResult<(User, MemberProfile)> {
        self.member_access(actor, member_id).await?;
        let update = update.scoped_to(actor.role.kind());

        let phone = match update.phone {
            Some(ref raw) => Some(normalize_indian_phone(raw)?),
            None => None,
        };
        let user_patch = UserPatch {
            full_name: update.full_name,
            phone,
            ..UserPatch::default()
        };
        if user_patch.full_name.is_some() || user_patch.phone.is_some() {
            self.users.update(member_id, user_patch).await?;
        }

        let profile_patch = ProfilePatch {
            goals: update.goals,
            medical_notes: update.medical_notes,
            membership: update.membership,
        };
        if !profile_patch.is_empty() {
            self.profiles.update(member_id, profile_patch).await?;
        }

        self.member_access(actor, member_id).await
    }

    /// Moves a member to another branch. The member's own trainer set is
    /// recomputed, and the branch they left gets a repair pass too.
    /// Admin only.
    pub async fn change_member_branch(
        &self,
        actor: &User,
        member_id: Uuid,
        branch: Branch,
    ) -> AppResult<()> {
        self.require_admin(actor)?;
        let (member, _) = self.member_access(actor, member_id).await?;
        let old_branch = member.branch();

        self.users
            .update(member_id, UserPatch {
                branch: Some(branch),
                ..UserPatch::default()
            })
            .await?;
        self.assignments.sync_for_member(member_id).await?;
        if let Some(old) = old_branch
            && old != branch
        {
            self.assignments.sync_for_branch(old).await?;
        }
        Ok(())
    }

    /// Deactivates a member account. Admin only.
    pub async fn deactivate_member(&self, actor: &User, member_id: Uuid) -> AppResult<()> {
        self.require_admin(actor)?;
        self.member_access(actor, member_id).await?;

        self.users
            .update(member_id, UserPatch {
                active: Some(false),
                ..UserPatch::default()
            })
            .await?;
        Ok(())
    }

    /// Moves a trainer to another branch; both the old and the new
    /// branch's member assignments are rebuilt.
    pub async fn change_trainer_branch(
        &self,
        actor: &User,
        trainer_id: Uuid,
        branch: Branch,
    ) -> AppResult<()> {
        let trainer = self.trainer_access(actor, trainer_id).await?;
        let old_branch = trainer.branch();

        self.users
            .update(trainer_id, UserPatch {
                branch: Some(branch),
                ..UserPatch::default()
            })
            .await?;

        if let Some(old) = old_branch
            && old != branch
        {
            self.assignments.sync_for_branch(old).await?;
        }
        self.assignments.sync_for_branch(branch).await?;
        Ok(())
    }

    /// Deactivates a trainer and drops them from every member's
    /// assignment set in their branch.
    pub async fn deactivate_trainer(&self, actor: &User, trainer_id: Uuid) -> AppResult<()> {
        let trainer = self.trainer_access(actor, trainer_id).await?;

        self.users
            .update(trainer_id, UserPatch {
                active: Some(false),
                ..UserPatch::default()
            })
            .await?;
        if let Some(branch) = trainer.branch() {
            self.assignments.sync_for_branch(branch).await?;
        }
        Ok(())
    }

    /// Trainers visible to an admin, with per-trainer member counts.
    /// Branch-scoped admins see their own branch only.
    pub async fn list_trainers(&self, viewer: &User) -> AppResult<Vec<TrainerOverview>> {
        let scope = self.admin_scope(viewer)?;
        let mut filter = UserFilter::role(RoleKind::Trainer);
        if let Some(branch) = scope {
            filter = filter.in_branch(branch);
        }

        let trainers = self.users.list(filter).await?;
        let mut out = Vec::with_capacity(trainers.len());
        for user in trainers {
            let assigned_members = self.profiles.count_assigned(user.id).await?;
            out.push(TrainerOverview {
                user,
                assigned_members,
            });
        }
        Ok(out)
    }

    /// Members visible to the viewer: trainers and branch-scoped admins
    /// see their branch, primary and global admins see everyone.
    pub async fn list_members(&self, viewer: &User) -> AppResult<Vec<User>> {
        let scope = match viewer.role {
            Role::Member { .. } => return Err(AppError::forbidden(policy::DENY_MANAGE)),
            Role::Trainer { branch } => Some(branch),
            Role::Admin { primary: true, .. } => None,
            Role::Admin { branch, .. } => branch,
        };

        let mut filter = UserFilter::role(RoleKind::Member);
        if let Some(branch) = scope {
            filter = filter.in_branch(branch);
        }
        self.users.list(filter).await
    }

    async fn trainer_access(&self, actor: &User, trainer_id: Uuid) -> AppResult<User> {
        let trainer = self
            .users
            .get(trainer_id)
            .await?
            .filter(|u| matches!(u.role, Role::Trainer { .. }))
            .ok_or_else(|| AppError::not_found("trainer", "id", trainer_id))?;

        match self.admin_scope(actor)? {
            Some(branch) if trainer.branch() != Some(branch) => {
                Err(AppError::forbidden(DENY_TRAINER_MANAGE_BRANCH))
            }
            _ => Ok(trainer),
        }
    }

    fn require_admin(&self, actor: &User) -> AppResult<()> {
        if matches!(actor.role, Role::Admin { .. }) {
            Ok(())
        } else {
            Err(AppError::forbidden(policy::DENY_MANAGE))
        }
    }

    /// `None` means unrestricted (primary or global admin); `Some` is the
    /// branch a scoped admin is confined to. Non-admins are refused.
    fn admin_scope(&self, actor: &User) -> AppResult<Option<Branch>> {
        match actor.role {
            Role::Admin { primary: true, .. } => Ok(None),
            Role::Admin { branch, .. } => Ok(branch),
            _ => Err(AppError::forbidden(policy::DENY_MANAGE)),
        }
    }
}
