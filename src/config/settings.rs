//! Configuration settings structures for gympulse.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ============================================================================
// Default value functions
// ============================================================================

fn default_log_level() -> String {
    "info".to_string()
}

fn default_reminder_interval_secs() -> u64 {
    3600 // one scan per hour
}

fn default_lookahead_days() -> i64 {
    2
}

fn default_snippet_len() -> usize {
    50
}

// ============================================================================
// Settings
// ============================================================================

/// Top-level application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub reminder: ReminderConfig,

    #[serde(default)]
    pub chat: ChatConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default tracing filter directive
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Payment reminder scheduler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Seconds between scan cycles
    #[serde(default = "default_reminder_interval_secs")]
    pub interval_secs: u64,

    /// Reminders start this many days before the due date
    #[serde(default = "default_lookahead_days")]
    pub lookahead_days: i64,
}

impl ReminderConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reminder_interval_secs(),
            lookahead_days: default_lookahead_days(),
        }
    }
}

/// Chat and conversation-summary configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Maximum length of the last-message snippet stored on a summary
    #[serde(default = "default_snippet_len")]
    pub snippet_len: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            snippet_len: default_snippet_len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.log.level, "info");
        assert_eq!(settings.reminder.interval_secs, 3600);
        assert_eq!(settings.reminder.lookahead_days, 2);
        assert_eq!(settings.chat.snippet_len, 50);
    }
}
