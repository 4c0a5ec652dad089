use crate::model::ToolOutcome;
use thiserror::Error;

/// Errors that can occur while dispatching or executing a tool.
///
/// These never escape the tool host: each one is rendered into an error
/// [`ToolOutcome`] so the model sees the failure as text.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    NotFound(String),

    #[error("invalid input for {tool}: {reason}")]
    InvalidInput { tool: &'static str, reason: String },

    #[error("File not found at path '{0}'.")]
    FileNotFound(String),

    #[error("failed to {action} '{path}': {source}")]
    Io {
        action: &'static str,
        path: String,
        source: std::io::Error,
    },

    #[error("execution failed: {0}")]
    Execution(String),
}

impl ToolError {
    pub(crate) fn io(action: &'static str, path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

impl From<ToolError> for ToolOutcome {
    fn from(err: ToolError) -> Self {
        ToolOutcome::error(format!("Error: {err}"))
    }
}
