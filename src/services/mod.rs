//! Business logic services.

mod approval;
mod assignment;
mod chat;
mod member;
mod registration;
mod reminder;

pub use approval::{ApprovalService, ReviewOutcome};
pub use assignment::{AssignmentSync, active_trainer_ids};
pub use chat::{ChatService, ConversationEntry};
pub use member::{MemberService, TrainerOverview, UpdateMember};
pub use registration::{NewRegistration, RegistrationService, normalize_indian_phone};
pub use reminder::PaymentReminderScheduler;
