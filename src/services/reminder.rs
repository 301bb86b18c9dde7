//! Payment reminder scheduler.
//!
//! A periodic scan over member profiles with a pending or overdue payment
//! due within the configured lookahead window. Each qualifying member is
//! reminded at most once per calendar day, tracked by a stamp on the
//! membership. The stamp is only written after the notification actually
//! dispatched; a failed dispatch leaves it unset so the next cycle retries.

use std::sync::Arc;

use jiff::Span;
use jiff::civil::Date;
use tokio_util::sync::CancellationToken;

use crate::clock::{Clock, date_of};
use crate::config::ReminderConfig;
use crate::error::AppResult;
use crate::models::{MemberProfile, NotificationKind};
use crate::notify::{Notifier, Outbound};
use crate::store::ProfileStore;

pub struct PaymentReminderScheduler {
    profiles: Arc<dyn ProfileStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    config: ReminderConfig,
}

impl PaymentReminderScheduler {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: ReminderConfig,
    ) -> Self {
        Self {
            profiles,
            notifier,
            clock,
            config,
        }
    }

    /// Scan loop. A cycle failure is logged and the loop keeps going;
    /// only cancellation stops it.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.interval());
        tracing::info!(
            interval_secs = self.config.interval_secs,
            lookahead_days = self.config.lookahead_days,
            "payment reminder scheduler started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        tracing::error!(error = %e, "payment reminder cycle failed");
                    }
                }
                _ = shutdown.cancelled() => {
                    tracing::info!("payment reminder scheduler stopped");
                    return;
                }
            }
        }
    }

    /// One scan: remind every member whose payment is pending or overdue
    /// and due within the lookahead window, skipping anyone already
    /// reminded today.
    pub async fn run_cycle(&self) -> AppResult<usize> {
        let today = self.clock.today();
        let horizon = today.checked_add(Span::new().days(self.config.lookahead_days))?;

        let due = self.profiles.due_for_reminder(horizon).await?;
        let mut sent = 0;
        for profile in due {
            if self.remind(&profile, today).await? {
                sent += 1;
            }
        }
        if sent > 0 {
            tracing::info!(sent, "payment reminders dispatched");
        }
        Ok(sent)
    }

    async fn remind(&self, profile: &MemberProfile, today: Date) -> AppResult<bool> {
        let Some(membership) = &profile.membership else {
            return Ok(false);
        };
        let Some(payment_date) = membership.next_payment_date else {
            return Ok(false);
        };

        // Once per calendar day.
        if let Some(last) = membership.last_reminder_sent
            && date_of(last) == today
        {
            return Ok(false);
        }

        let days_until = (payment_date - today).get_days() as i64;
        let (title, body) = reminder_copy(days_until);
        let note = Outbound::new(
            title,
            body,
            NotificationKind::Payment,
            serde_json::json!({
                "payment_date": payment_date.to_string(),
                "member_no": profile.member_no,
            }),
        );

        // Stamp only after the dispatch succeeded, so a failed send is
        // retried on the next cycle.
        match self.notifier.notify(profile.user_id, note).await {
            Ok(()) => {
                self.profiles
                    .stamp_reminder(profile.user_id, self.clock.now())
                    .await?;
                Ok(true)
            }
            Err(e) => {
                tracing::error!(
                    user_id = %profile.user_id,
                    error = %e,
                    "payment reminder dispatch failed"
                );
                Ok(false)
            }
        }
    }
}

fn reminder_copy(days_until: i64) -> (String, String) {
    if days_until < 0 {
        (
            "Payment Overdue!".to_string(),
            format!(
                "Your gym subscription payment is overdue by {} day(s). Please pay immediately.",
                -days_until
            ),
        )
    } else if days_until == 0 {
        (
            "Payment Due Today!".to_string(),
            "Your gym subscription payment is due today. Please make the payment.".to_string(),
        )
    } else {
        (
            "Payment Reminder".to_string(),
            format!("Your gym subscription payment is due in {days_until} day(s)."),
        )
    }
}
