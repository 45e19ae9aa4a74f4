//! Google Cloud control-plane error types

use seedflow_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GcpError {
    #[error("gcloud not found. Please install the Google Cloud CLI: https://cloud.google.com/sdk/docs/install")]
    GcloudNotFound,

    #[error("gcloud authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("gcloud command failed: {command}: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Unexpected gcloud output: {0}")]
    UnexpectedOutput(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config error: {0}")]
    CoreError(#[from] seedflow_core::CoreError),
}

pub type Result<T> = std::result::Result<T, GcpError>;

impl From<GcpError> for CloudError {
    fn from(err: GcpError) -> Self {
        match err {
            GcpError::GcloudNotFound => CloudError::AuthenticationFailed(err.to_string()),
            GcpError::AuthenticationFailed(msg) => CloudError::AuthenticationFailed(msg),
            GcpError::CommandFailed { .. } => CloudError::CommandFailed(err.to_string()),
            GcpError::UnexpectedOutput(msg) => CloudError::ApiError(msg),
            GcpError::JsonError(e) => CloudError::Json(e),
            GcpError::IoError(e) => CloudError::Io(e),
            GcpError::CoreError(e) => CloudError::Core(e),
        }
    }
}
