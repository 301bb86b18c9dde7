//! Push delivery seam.
//!
//! The actual transport (Expo, FCM, webhooks) lives outside this crate;
//! implementations adapt it behind `PushProvider`.

use async_trait::async_trait;

use crate::error::AppResult;

/// Delivers a push message to a single device token.
///
/// All providers must be Send + Sync for use in async contexts.
#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Attempts delivery. Callers treat any error as best-effort failure;
    /// it is never surfaced to the originating request.
    async fn push(
        &self,
        token: &str,
        title: &str,
        body: &str,
        payload: &serde_json::Value,
    ) -> AppResult<()>;

    /// Provider name for logging/debugging.
    fn name(&self) -> &'static str;
}

/// Provider that drops every push. Used when no transport is configured
/// and as the default in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPush;

#[async_trait]
impl PushProvider for NoopPush {
    async fn push(
        &self,
        token: &str,
        _title: &str,
        _body: &str,
        _payload: &serde_json::Value,
    ) -> AppResult<()> {
        tracing::debug!(token, "push transport not configured, dropping");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
