use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// One location of the gym chain. The set is fixed at deploy time and is
/// the scoping unit for most authorization rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Branch {
    Ranaghat,
    Chakdah,
    Madanpur,
}

impl Branch {
    pub const ALL: [Branch; 3] = [Branch::Ranaghat, Branch::Chakdah, Branch::Madanpur];

    pub fn as_str(&self) -> &'static str {
        match self {
            Branch::Ranaghat => "Ranaghat",
            Branch::Chakdah => "Chakdah",
            Branch::Madanpur => "Madanpur",
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Branch {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Branch::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s))
            .ok_or(AppError::UnprocessableContent {
                message: format!("unknown branch: {s}"),
            })
    }
}

/// Closed role type carrying the facts the authorization policy needs.
///
/// Branch is mandatory for trainers and members by construction; admins may
/// be branch-scoped or global (no branch). Keeping the data on the variant
/// lets the policy pattern-match exhaustively, so a new role cannot be
/// silently ignored by an authorization rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Role {
    Admin {
        primary: bool,
        branch: Option<Branch>,
    },
    Trainer {
        branch: Branch,
    },
    Member {
        branch: Branch,
    },
}

impl Role {
    pub fn kind(&self) -> RoleKind {
        match self {
            Role::Admin { .. } => RoleKind::Admin,
            Role::Trainer { .. } => RoleKind::Trainer,
            Role::Member { .. } => RoleKind::Member,
        }
    }

    pub fn branch(&self) -> Option<Branch> {
        match self {
            Role::Admin { branch, .. } => *branch,
            Role::Trainer { branch } | Role::Member { branch } => Some(*branch),
        }
    }
}

/// Role discriminant, used where only the kind matters (approval requests,
/// store filters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    Admin,
    Trainer,
    Member,
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoleKind::Admin => "admin",
            RoleKind::Trainer => "trainer",
            RoleKind::Member => "member",
        };
        f.write_str(s)
    }
}

/// Account approval state. Transitions only pending -> approved or
/// pending -> rejected, never reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// A user account. Never physically deleted; deactivation is the terminal
/// removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub phone: String,
    pub full_name: String,
    #[serde(flatten)]
    pub role: Role,
    pub active: bool,
    pub approval_status: ApprovalStatus,
    pub push_token: Option<String>,
    pub created_at: Timestamp,
}

impl User {
    pub fn branch(&self) -> Option<Branch> {
        self.role.branch()
    }

    pub fn is_primary_admin(&self) -> bool {
        matches!(self.role, Role::Admin { primary: true, .. })
    }

    /// Active and approval-approved; the baseline for any interaction.
    pub fn is_active_and_approved(&self) -> bool {
        self.active && self.approval_status == ApprovalStatus::Approved
    }

    /// Returns a copy of the role relocated to `branch`.
    ///
    /// The primary flag of an admin never changes here; it is immutable
    /// once set.
    pub fn role_at(&self, branch: Branch) -> Role {
        match self.role {
            Role::Admin { primary, .. } => Role::Admin {
                primary,
                branch: Some(branch),
            },
            Role::Trainer { .. } => Role::Trainer { branch },
            Role::Member { .. } => Role::Member { branch },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_parsing() {
        assert_eq!("Chakdah".parse::<Branch>().unwrap(), Branch::Chakdah);
        assert_eq!("ranaghat".parse::<Branch>().unwrap(), Branch::Ranaghat);
        assert!(matches!(
            "Kolkata".parse::<Branch>(),
            Err(AppError::UnprocessableContent { .. })
        ));
    }

    #[test]
    fn test_role_branch_access() {
        let global_admin = Role::Admin {
            primary: false,
            branch: None,
        };
        assert_eq!(global_admin.branch(), None);
        assert_eq!(global_admin.kind(), RoleKind::Admin);

        let trainer = Role::Trainer {
            branch: Branch::Madanpur,
        };
        assert_eq!(trainer.branch(), Some(Branch::Madanpur));
    }

    #[test]
    fn test_relocation_preserves_primary_flag() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@b.c".into(),
            phone: "+919000000001".into(),
            full_name: "A".into(),
            role: Role::Admin {
                primary: true,
                branch: None,
            },
            active: true,
            approval_status: ApprovalStatus::Approved,
            push_token: None,
            created_at: Timestamp::now(),
        };
        let moved = user.role_at(Branch::Chakdah);
        assert_eq!(
            moved,
            Role::Admin {
                primary: true,
                branch: Some(Branch::Chakdah)
            }
        );
    }
}
