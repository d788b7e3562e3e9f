use thiserror::Error;

use crate::config::Provider;

/// Unified error type for provisioning runs.
///
/// The variants map onto the failure policy the orchestrator applies:
/// `Configuration` aborts the whole run, `ToolUnavailable` and
/// `Authentication` abort a single provider, `ExternalApi` triggers manual
/// fallback, and `Validation` only causes a re-prompt.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Required tool '{tool}' is not available: {message}")]
    ToolUnavailable { tool: String, message: String },

    #[error("Authentication failed for {provider}: {message}")]
    Authentication { provider: Provider, message: String },

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Invalid value for '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
}

impl SetupError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn tool_unavailable(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolUnavailable {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn authentication(provider: Provider, message: impl Into<String>) -> Self {
        Self::Authentication {
            provider,
            message: message.into(),
        }
    }

    pub fn external_api(message: impl Into<String>) -> Self {
        Self::ExternalApi(message.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether this error must abort the entire run rather than a single
    /// provider.
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(self, SetupError::Configuration(_))
    }

    /// Whether the orchestrator may degrade to manual fallback after this
    /// error instead of recording a hard failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SetupError::ExternalApi(_) | SetupError::Request(_) | SetupError::Validation { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SetupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_abort_the_run() {
        assert!(SetupError::configuration("no providers").is_fatal_to_run());
        assert!(!SetupError::external_api("boom").is_fatal_to_run());
        assert!(!SetupError::tool_unavailable("gcloud", "not found").is_fatal_to_run());
    }

    #[test]
    fn api_errors_are_recoverable_auth_errors_are_not() {
        assert!(SetupError::external_api("rate limited").is_recoverable());
        assert!(!SetupError::authentication(Provider::CloudOauth, "no account").is_recoverable());
        assert!(!SetupError::tool_unavailable("az", "missing").is_recoverable());
    }
}
