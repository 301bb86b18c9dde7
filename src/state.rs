//! Application state.
//!
//! Wires stores, notification delivery, and services together. Cloning is
//! cheap since everything is behind `Arc`.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::notify::{ConnectionRegistry, Dispatcher, NoopPush, Notifier};
use crate::services::{
    ApprovalService, AssignmentSync, ChatService, MemberService, PaymentReminderScheduler,
    RegistrationService,
};
use crate::store::Stores;

/// Shared services and resources for the transport layer.
#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub registry: Arc<ConnectionRegistry>,
    pub notifier: Arc<dyn Notifier>,
    pub assignments: AssignmentSync,
    pub registration: Arc<RegistrationService>,
    pub approvals: Arc<ApprovalService>,
    pub members: Arc<MemberService>,
    pub chat: Arc<ChatService>,
    pub reminders: Arc<PaymentReminderScheduler>,
}

impl AppState {
    /// Builds the full service graph over the given stores, using the
    /// wall clock and the no-op push provider.
    pub fn new(stores: Stores, settings: &Settings) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let registry = Arc::new(ConnectionRegistry::new());
        let notifier: Arc<dyn Notifier> = Arc::new(Dispatcher::new(
            stores.notifications.clone(),
            stores.users.clone(),
            Arc::new(NoopPush),
            registry.clone(),
            clock.clone(),
        ));

        let assignments = AssignmentSync::new(stores.users.clone(), stores.profiles.clone());

        let registration = Arc::new(RegistrationService::new(
            stores.users.clone(),
            stores.profiles.clone(),
            stores.approvals.clone(),
            assignments.clone(),
            notifier.clone(),
            clock.clone(),
        ));
        let approvals = Arc::new(ApprovalService::new(
            stores.approvals.clone(),
            stores.users.clone(),
            assignments.clone(),
            notifier.clone(),
            clock.clone(),
        ));
        let members = Arc::new(MemberService::new(
            stores.users.clone(),
            stores.profiles.clone(),
            assignments.clone(),
        ));
        let chat = Arc::new(ChatService::new(
            stores.users.clone(),
            stores.messages.clone(),
            stores.conversations.clone(),
            registry.clone(),
            clock.clone(),
            settings.chat.clone(),
        ));
        let reminders = Arc::new(PaymentReminderScheduler::new(
            stores.profiles.clone(),
            notifier.clone(),
            clock,
            settings.reminder.clone(),
        ));

        Self {
            stores,
            registry,
            notifier,
            assignments,
            registration,
            approvals,
            members,
            chat,
            reminders,
        }
    }
}
