use std::time::Duration;

use crate::error::SetupError;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("'{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("'{command}' exited with code {code}: {stderr}")]
    ExitCode {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("IO error running '{command}': {source}")]
    Io {
        command: String,
        source: std::io::Error,
    },

    #[error("Unexpected output from '{command}': {message}")]
    MalformedOutput { command: String, message: String },

    #[error("Mock expectation not met: {0}")]
    MockExpectationNotMet(String),
}

/// Tool failures fold into the run-level taxonomy: a missing binary is
/// fatal to the provider, everything else is a recoverable external error.
impl From<ProcessError> for SetupError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::CommandNotFound(tool) => {
                SetupError::tool_unavailable(tool, "binary not found on PATH")
            }
            other => SetupError::external_api(other.to_string()),
        }
    }
}
