//! Domain models.
//!
//! Plain data types shared by the policy, store, and service layers.

mod approval;
mod member;
mod message;
mod notification;
mod user;

pub use approval::ApprovalRequest;
pub use member::{MemberProfile, MembershipPlan, PaymentStatus};
pub use message::{ConversationKey, ConversationSummary, Message, MessageKind};
pub use notification::{Notification, NotificationKind};
pub use user::{ApprovalStatus, Branch, Role, RoleKind, User};
