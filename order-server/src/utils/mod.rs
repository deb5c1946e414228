//! Utilities
//!
//! - [`AppError`] / [`ApiResponse`]: error vocabulary (from shared::error)
//! - logging setup and business-timezone helpers

pub mod logger;
pub mod time;

pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
