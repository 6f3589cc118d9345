use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures surfaced by the assistant operations
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("OpenAI API key is not set in OpenAI Settings.")]
    MissingCredential,

    #[error("{0}")]
    Provider(String),

    #[error("{0}")]
    ToolInvocation(#[from] ToolError),

    #[error("{0}")]
    AccessDenied(String),
}

impl ChatError {
    pub fn provider(err: anyhow::Error) -> Self {
        ChatError::Provider(err.to_string())
    }
}

/// A tool call that could not produce a result. These never reach the caller.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("{0}")]
    NoResult(String),
}

pub type ToolResult<T> = Result<T, ToolError>;

/// The error payload returned to the caller in place of a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub error: String,
}

impl From<ChatError> for ErrorResult {
    fn from(err: ChatError) -> Self {
        ErrorResult {
            error: err.to_string(),
        }
    }
}
