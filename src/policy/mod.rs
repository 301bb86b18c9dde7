//! Authorization policy.
//!
//! Pure predicates over role/branch/approval facts; no I/O. The denial
//! reason strings are part of the caller-facing contract, so they live
//! here as constants and must not be reworded casually.
//!
//! `can_chat` is evaluated from the sender's perspective only. It is not
//! symmetric by construction: callers must re-check the reverse direction
//! when the other party initiates. Conversation listing relies on exactly
//! that, re-checking from the current viewer's side so a conversation can
//! go stale-invisible to one side after a branch or role change.

use crate::models::{Role, User};

pub const DENY_SELF: &str = "cannot message yourself";
pub const DENY_UNAVAILABLE: &str = "chat unavailable for inactive or unapproved users";
pub const DENY_MEMBER_BRANCH: &str = "members can only message users from the same branch";
pub const DENY_TRAINER_MEMBER_BRANCH: &str = "can only message members from your branch";
pub const DENY_TRAINER_TRAINER_BRANCH: &str = "can only message trainers from your branch";
pub const DENY_ADMIN_BRANCH: &str = "can only message users from your branch";

pub const DENY_MANAGE: &str = "access denied";
pub const DENY_MANAGE_BRANCH: &str = "can only manage members from your branch";

/// Decides whether `sender` may message `receiver`.
///
/// Rules, in order:
/// 1. never to yourself;
/// 2. both parties must be active and approval-approved;
/// 3. members reach anyone in their own branch;
/// 4. trainers reach same-branch members and trainers, and any admin;
/// 5. primary and branchless (global) admins reach anyone; branch-scoped
///    admins reach their own branch plus the primary admin.
pub fn can_chat(sender: &User, receiver: &User) -> Result<(), &'static str> {
    if sender.id == receiver.id {
        return Err(DENY_SELF);
    }
    if !sender.is_active_and_approved() || !receiver.is_active_and_approved() {
        return Err(DENY_UNAVAILABLE);
    }

    match sender.role {
        Role::Member { branch } => {
            if receiver.branch() == Some(branch) {
                Ok(())
            } else {
                Err(DENY_MEMBER_BRANCH)
            }
        }
        Role::Trainer { branch } => match receiver.role {
            Role::Member { branch: other } => {
                if other == branch {
                    Ok(())
                } else {
                    Err(DENY_TRAINER_MEMBER_BRANCH)
                }
            }
            Role::Trainer { branch: other } => {
                if other == branch {
                    Ok(())
                } else {
                    Err(DENY_TRAINER_TRAINER_BRANCH)
                }
            }
            Role::Admin { .. } => Ok(()),
        },
        Role::Admin { primary, branch } => {
            if primary {
                return Ok(());
            }
            // Branchless admins are global.
            let Some(branch) = branch else {
                return Ok(());
            };
            if receiver.is_primary_admin() || receiver.branch() == Some(branch) {
                Ok(())
            } else {
                Err(DENY_ADMIN_BRANCH)
            }
        }
    }
}

/// Decides whether `actor` may manage `member` (a member-role user).
///
/// Branch equality is the sole scoping mechanism for trainers and
/// branch-scoped admins; the derived assignment set is never consulted.
pub fn can_manage(actor: &User, member: &User) -> Result<(), &'static str> {
    match actor.role {
        Role::Member { .. } => {
            if actor.id == member.id {
                Ok(())
            } else {
                Err(DENY_MANAGE)
            }
        }
        Role::Trainer { branch } => {
            if member.branch() == Some(branch) {
                Ok(())
            } else {
                Err(DENY_MANAGE_BRANCH)
            }
        }
        Role::Admin { primary, branch } => {
            if primary {
                return Ok(());
            }
            match branch {
                Some(branch) if member.branch() != Some(branch) => Err(DENY_MANAGE_BRANCH),
                _ => Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::models::{ApprovalStatus, Branch, RoleKind};
    use crate::testutil::{admin, member, trainer};

    #[test]
    fn test_cannot_message_self() {
        let m = member(Branch::Ranaghat);
        assert_eq!(can_chat(&m, &m), Err(DENY_SELF));
    }

    #[test]
    fn test_inactive_or_unapproved_parties_cannot_chat() {
        let mut sender = member(Branch::Ranaghat);
        let receiver = trainer(Branch::Ranaghat);

        sender.active = false;
        assert_eq!(can_chat(&sender, &receiver), Err(DENY_UNAVAILABLE));

        sender.active = true;
        sender.approval_status = ApprovalStatus::Pending;
        assert_eq!(can_chat(&sender, &receiver), Err(DENY_UNAVAILABLE));

        let sender = member(Branch::Ranaghat);
        let mut receiver = trainer(Branch::Ranaghat);
        receiver.active = false;
        assert_eq!(can_chat(&sender, &receiver), Err(DENY_UNAVAILABLE));
        receiver.active = true;
        assert_eq!(can_chat(&sender, &receiver), Ok(()));
    }

    #[test]
    fn test_member_is_branch_scoped_to_any_role() {
        let sender = member(Branch::Chakdah);
        assert_eq!(can_chat(&sender, &member(Branch::Chakdah)), Ok(()));
        assert_eq!(can_chat(&sender, &trainer(Branch::Chakdah)), Ok(()));
        assert_eq!(
            can_chat(&sender, &admin(false, Some(Branch::Chakdah))),
            Ok(())
        );
        assert_eq!(
            can_chat(&sender, &member(Branch::Ranaghat)),
            Err(DENY_MEMBER_BRANCH)
        );
        assert_eq!(
            can_chat(&sender, &admin(true, None)),
            Err(DENY_MEMBER_BRANCH)
        );
    }

    #[test]
    fn test_trainer_rules() {
        let sender = trainer(Branch::Madanpur);
        assert_eq!(can_chat(&sender, &member(Branch::Madanpur)), Ok(()));
        assert_eq!(
            can_chat(&sender, &member(Branch::Chakdah)),
            Err(DENY_TRAINER_MEMBER_BRANCH)
        );
        assert_eq!(can_chat(&sender, &trainer(Branch::Madanpur)), Ok(()));
        assert_eq!(
            can_chat(&sender, &trainer(Branch::Ranaghat)),
            Err(DENY_TRAINER_TRAINER_BRANCH)
        );
        // Any admin, regardless of branch.
        assert_eq!(can_chat(&sender, &admin(false, Some(Branch::Chakdah))), Ok(()));
        assert_eq!(can_chat(&sender, &admin(true, None)), Ok(()));
    }

    #[test]
    fn test_branch_scoped_admin_reaches_own_branch_and_primary() {
        let sender = admin(false, Some(Branch::Ranaghat));
        assert_eq!(can_chat(&sender, &member(Branch::Ranaghat)), Ok(()));
        assert_eq!(can_chat(&sender, &admin(true, None)), Ok(()));
        assert_eq!(
            can_chat(&sender, &member(Branch::Chakdah)),
            Err(DENY_ADMIN_BRANCH)
        );
        assert_eq!(
            can_chat(&sender, &admin(false, Some(Branch::Chakdah))),
            Err(DENY_ADMIN_BRANCH)
        );
    }

    #[test]
    fn test_global_admin_reaches_anyone() {
        let sender = admin(false, None);
        for branch in Branch::ALL {
            assert_eq!(can_chat(&sender, &member(branch)), Ok(()));
            assert_eq!(can_chat(&sender, &trainer(branch)), Ok(()));
        }
        assert_eq!(can_chat(&sender, &admin(false, Some(Branch::Chakdah))), Ok(()));
    }

    #[test]
    fn test_chat_is_not_symmetric() {
        // Branch-scoped admin may reach the primary admin, but a member of
        // another branch cannot reach that admin back.
        let scoped = admin(false, Some(Branch::Ranaghat));
        let other_member = member(Branch::Chakdah);
        assert_eq!(can_chat(&scoped, &other_member), Err(DENY_ADMIN_BRANCH));
        assert_eq!(
            can_chat(&other_member, &scoped),
            Err(DENY_MEMBER_BRANCH)
        );

        // Trainer -> cross-branch admin is allowed, admin -> trainer is not.
        let t = trainer(Branch::Chakdah);
        assert_eq!(can_chat(&t, &scoped), Ok(()));
        assert_eq!(can_chat(&scoped, &t), Err(DENY_ADMIN_BRANCH));
    }

    #[test]
    fn test_manage_scoping() {
        let m = member(Branch::Chakdah);

        // Member: self only.
        assert_eq!(can_manage(&m, &m), Ok(()));
        assert_eq!(can_manage(&member(Branch::Chakdah), &m), Err(DENY_MANAGE));

        // Trainer: branch equality only, assignment set not consulted.
        assert_eq!(can_manage(&trainer(Branch::Chakdah), &m), Ok(()));
        assert_eq!(
            can_manage(&trainer(Branch::Ranaghat), &m),
            Err(DENY_MANAGE_BRANCH)
        );

        // Admins.
        assert_eq!(can_manage(&admin(true, None), &m), Ok(()));
        assert_eq!(can_manage(&admin(false, None), &m), Ok(()));
        assert_eq!(can_manage(&admin(false, Some(Branch::Chakdah)), &m), Ok(()));
        assert_eq!(
            can_manage(&admin(false, Some(Branch::Madanpur)), &m),
            Err(DENY_MANAGE_BRANCH)
        );
    }

    // ------------------------------------------------------------------
    // Property coverage over the full role/branch/flag space
    // ------------------------------------------------------------------

    fn arb_branch() -> impl Strategy<Value = Branch> {
        prop::sample::select(Branch::ALL.to_vec())
    }

    fn arb_user() -> impl Strategy<Value = User> {
        (
            prop::sample::select(vec![RoleKind::Admin, RoleKind::Trainer, RoleKind::Member]),
            arb_branch(),
            any::<bool>(), // primary (admins only)
            any::<bool>(), // branchless (admins only)
            any::<bool>(), // active
            any::<bool>(), // approved
        )
            .prop_map(|(kind, branch, primary, branchless, active, approved)| {
                let mut user = match kind {
                    RoleKind::Admin => {
                        admin(primary, if branchless { None } else { Some(branch) })
                    }
                    RoleKind::Trainer => trainer(branch),
                    RoleKind::Member => member(branch),
                };
                user.active = active;
                if !approved {
                    user.approval_status = ApprovalStatus::Pending;
                }
                user
            })
    }

    proptest! {
        #[test]
        fn chat_decisions_follow_the_rule_table(sender in arb_user(), receiver in arb_user()) {
            let decision = can_chat(&sender, &receiver);

            if !sender.is_active_and_approved() || !receiver.is_active_and_approved() {
                prop_assert!(decision.is_err());
            } else {
                let same_branch =
                    sender.branch().is_some() && sender.branch() == receiver.branch();
                let expected = match sender.role {
                    Role::Member { .. } => same_branch,
                    Role::Trainer { .. } => {
                        same_branch || matches!(receiver.role, Role::Admin { .. })
                    }
                    Role::Admin { primary, branch } => {
                        primary
                            || branch.is_none()
                            || same_branch
                            || receiver.is_primary_admin()
                    }
                };
                prop_assert_eq!(decision.is_ok(), expected);
            }
        }

        #[test]
        fn denials_always_carry_a_reason(sender in arb_user(), receiver in arb_user()) {
            if let Err(reason) = can_chat(&sender, &receiver) {
                prop_assert!(!reason.is_empty());
            }
        }
    }
}
