//! Assignment synchronizer.
//!
//! `assigned_trainers` on a member profile is a derived view: the set of
//! active, approved trainers of the member's branch. This service is the
//! only writer of that field. Both entry points recompute the target set
//! from current data and overwrite, so re-running or interleaving
//! concurrent syncs converges; no write can move the view backward.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Branch, Role, RoleKind, User};
use crate::store::{ProfileStore, UserFilter, UserStore};

/// The assignment set for a branch roster: ids of trainers that are
/// active and approval-approved.
pub fn active_trainer_ids(roster: &[User]) -> Vec<Uuid> {
    roster
        .iter()
        .filter(|u| matches!(u.role, Role::Trainer { .. }) && u.is_active_and_approved())
        .map(|u| u.id)
        .collect()
}

/// Recomputes member assignment sets from live role/branch/approval facts.
#[derive(Clone)]
pub struct AssignmentSync {
    users: Arc<dyn UserStore>,
    profiles: Arc<dyn ProfileStore>,
}

impl AssignmentSync {
    pub fn new(users: Arc<dyn UserStore>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { users, profiles }
    }

    async fn branch_assignment_set(&self, branch: Branch) -> AppResult<Vec<Uuid>> {
        let roster = self
            .users
            .list(UserFilter::role(RoleKind::Trainer).in_branch(branch))
            .await?;
        Ok(active_trainer_ids(&roster))
    }

    /// Overwrites one member's assignment set with the current trainer set
    /// of their branch. A missing or non-member user is a no-op.
    pub async fn sync_for_member(&self, member_user_id: Uuid) -> AppResult<()> {
        let Some(user) = self.users.get(member_user_id).await? else {
            return Ok(());
        };
        let Role::Member { branch } = user.role else {
            return Ok(());
        };

        let trainer_ids = self.branch_assignment_set(branch).await?;
        self.profiles
            .set_assigned_trainers(member_user_id, trainer_ids)
            .await?;
        Ok(())
    }

    /// Recomputes the trainer set once and pushes it onto every member
    /// profile in the branch.
    pub async fn sync_for_branch(&self, branch: Branch) -> AppResult<()> {
        let trainer_ids = self.branch_assignment_set(branch).await?;
        let members = self
            .users
            .list(UserFilter::role(RoleKind::Member).in_branch(branch))
            .await?;

        for member in &members {
            self.profiles
                .set_assigned_trainers(member.id, trainer_ids.clone())
                .await?;
        }

        tracing::debug!(
            branch = %branch,
            trainers = trainer_ids.len(),
            members = members.len(),
            "branch assignments synced"
        );
        Ok(())
    }

    /// Full repair pass over every branch, run once at process start to
    /// recover from any missed trigger.
    pub async fn sync_all_branches(&self) -> AppResult<()> {
        for branch in Branch::ALL {
            self.sync_for_branch(branch).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MemberProfile;
    use crate::store::Stores;
    use crate::testutil::{member, trainer};

    async fn seed_member(stores: &Stores, branch: Branch) -> Uuid {
        let m = member(branch);
        let id = m.id;
        stores.users.insert(m).await.unwrap();
        stores
            .profiles
            .insert(MemberProfile::new(id, format!("HG{id}")))
            .await
            .unwrap();
        id
    }

    #[test]
    fn test_assignment_set_excludes_inactive_and_unapproved() {
        let active = trainer(Branch::Chakdah);
        let mut inactive = trainer(Branch::Chakdah);
        inactive.active = false;
        let mut pending = trainer(Branch::Chakdah);
        pending.approval_status = crate::models::ApprovalStatus::Pending;
        let not_a_trainer = member(Branch::Chakdah);

        let roster = vec![active.clone(), inactive, pending, not_a_trainer];
        assert_eq!(active_trainer_ids(&roster), vec![active.id]);
    }

    #[tokio::test]
    async fn test_sync_for_member_reflects_active_trainers() {
        let stores = Stores::in_memory();
        let sync = AssignmentSync::new(stores.users.clone(), stores.profiles.clone());

        let t1 = trainer(Branch::Chakdah);
        let mut t2 = trainer(Branch::Chakdah);
        t2.active = false;
        let t1_id = t1.id;
        let t2_id = t2.id;
        stores.users.insert(t1).await.unwrap();
        stores.users.insert(t2).await.unwrap();
        let m = seed_member(&stores, Branch::Chakdah).await;

        sync.sync_for_member(m).await.unwrap();
        let profile = stores.profiles.get(m).await.unwrap().unwrap();
        assert_eq!(profile.assigned_trainers, vec![t1_id]);

        // Flip activity and resync the branch: the view follows the facts.
        stores
            .users
            .update(t1_id, crate::store::UserPatch {
                active: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        stores
            .users
            .update(t2_id, crate::store::UserPatch {
                active: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        sync.sync_for_branch(Branch::Chakdah).await.unwrap();

        let profile = stores.profiles.get(m).await.unwrap().unwrap();
        assert_eq!(profile.assigned_trainers, vec![t2_id]);
    }

    #[tokio::test]
    async fn test_sync_for_branch_is_idempotent() {
        let stores = Stores::in_memory();
        let sync = AssignmentSync::new(stores.users.clone(), stores.profiles.clone());

        let t = trainer(Branch::Ranaghat);
        let t_id = t.id;
        stores.users.insert(t).await.unwrap();
        let m1 = seed_member(&stores, Branch::Ranaghat).await;
        let m2 = seed_member(&stores, Branch::Ranaghat).await;
        let outsider = seed_member(&stores, Branch::Madanpur).await;

        for _ in 0..3 {
            sync.sync_for_branch(Branch::Ranaghat).await.unwrap();
        }

        for m in [m1, m2] {
            let profile = stores.profiles.get(m).await.unwrap().unwrap();
            assert_eq!(profile.assigned_trainers, vec![t_id]);
        }
        // Other branches are untouched.
        let profile = stores.profiles.get(outsider).await.unwrap().unwrap();
        assert!(profile.assigned_trainers.is_empty());
    }

    #[tokio::test]
    async fn test_sync_for_member_ignores_unknown_user() {
        let stores = Stores::in_memory();
        let sync = AssignmentSync::new(stores.users.clone(), stores.profiles.clone());
        sync.sync_for_member(Uuid::new_v4()).await.unwrap();
    }
}
