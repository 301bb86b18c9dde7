//! Notification delivery.
//!
//! `Dispatcher` persists an in-app notification record, then best-effort
//! pushes it to the user's registered device and any live connection. Push
//! and live-connection failures are logged and swallowed; only a failure to
//! persist the record surfaces to the caller, and even that is ignored on
//! the request paths that treat notification as a side effect.

mod connections;
mod dispatcher;
mod fanout;
mod provider;

pub use connections::ConnectionRegistry;
pub use dispatcher::{Dispatcher, Notifier, Outbound, fire_and_forget};
pub use fanout::{notify_all_admins, notify_branch_trainers};
pub use provider::{NoopPush, PushProvider};
