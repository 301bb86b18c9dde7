//! Error handling module.
//!
//! Defines the application-wide error taxonomy and the `AppResult` alias
//! used throughout the services and store layers.

mod app_error;

pub use app_error::{AppError, AppResult};
