//! GymPulse
//!
//! Core library for a multi-branch gym management backend: branch-scoped
//! chat and management policy, registration approval workflow, derived
//! trainer assignments, conversation summaries, and payment reminders.

pub mod clock;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod notify;
pub mod policy;
pub mod services;
pub mod state;
pub mod store;

#[cfg(test)]
mod testutil;

pub use state::AppState;
