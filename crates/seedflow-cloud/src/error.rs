//! Control-plane error types

use thiserror::Error;

/// Control-plane errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("Timeout: {what} not ready after {attempts} attempts")]
    Timeout { what: String, attempts: u32 },

    #[error("Identity pool name is unavailable; {0} was not attempted")]
    PoolNameUnavailable(String),

    #[error("Step '{action}' failed: {message}")]
    StepFailed { action: String, message: String },

    #[error("Config error: {0}")]
    Core(#[from] seedflow_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
