//! Provider workflow contract and shared result types.
//!
//! Each provider implements [`ProviderWorkflow`] as a pure strategy over
//! the request: no state is carried between invocations, and every external
//! effect flows through the injected [`WorkflowContext`].

pub mod cloud_oauth;
pub mod directory_tenant;
pub mod mobile_platform;
pub mod social_graph;

pub use cloud_oauth::CloudOauthWorkflow;
pub use directory_tenant::DirectoryTenantWorkflow;
pub use mobile_platform::MobilePlatformWorkflow;
pub use social_graph::SocialGraphWorkflow;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{Provider, ProvisioningRequest};
use crate::error::Result;
use crate::setup::graph::GraphApi;
use crate::setup::interaction::UserInteraction;
use crate::subprocess::SubprocessManager;

/// Suffix carried by every value synthesized in dry-run mode, so simulated
/// credentials are recognizable in any downstream file or log.
pub const DRY_RUN_SUFFIX: &str = ".dry-run";

/// Outcome of one workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    /// Dry-run placeholder; no external call was made
    Simulated,
    Completed,
    /// Idempotency hit: the resource already existed and was reused
    Skipped,
    /// Failed, but the workflow continued with reduced functionality
    FailedRecoverable,
    /// Failed and ended the workflow
    FailedFatal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step_name: String,
    pub status: StepStatus,
    /// Opaque key/value artifacts later steps consume (resource ids etc.)
    pub artifacts: BTreeMap<String, String>,
    pub message: Option<String>,
}

impl StepResult {
    pub fn new(step_name: &str, status: StepStatus) -> Self {
        Self {
            step_name: step_name.to_string(),
            status,
            artifacts: BTreeMap::new(),
            message: None,
        }
    }

    pub fn completed(step_name: &str) -> Self {
        Self::new(step_name, StepStatus::Completed)
    }

    pub fn simulated(step_name: &str) -> Self {
        Self::new(step_name, StepStatus::Simulated)
    }

    pub fn skipped(step_name: &str, message: impl Into<String>) -> Self {
        Self::new(step_name, StepStatus::Skipped).with_message(message)
    }

    pub fn failed_recoverable(step_name: &str, message: impl Into<String>) -> Self {
        Self::new(step_name, StepStatus::FailedRecoverable).with_message(message)
    }

    pub fn with_artifact(mut self, key: &str, value: impl Into<String>) -> Self {
        self.artifacts.insert(key.to_string(), value.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn artifact(&self, key: &str) -> Option<&str> {
        self.artifacts.get(key).map(String::as_str)
    }

    pub fn succeeded(&self) -> bool {
        matches!(
            self.status,
            StepStatus::Simulated | StepStatus::Completed | StepStatus::Skipped
        )
    }
}

/// Normalized output of a successful workflow: only the final
/// externally-usable values, never step-internal artifacts. Ordered map so
/// serialization is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCredentials {
    pub provider: Provider,
    pub fields: BTreeMap<String, String>,
}

impl ProviderCredentials {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Insert a field, dropping empty values so absent stays absent.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.fields.insert(key.to_string(), value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Per-provider outcome of a run. Immutable after creation; aggregated by
/// the orchestrator and handed to the credential writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupResult {
    pub provider: Provider,
    pub credentials: Option<ProviderCredentials>,
    pub metadata: BTreeMap<String, String>,
    /// Ordered human instructions when automation could not finish
    pub manual_steps: Vec<String>,
    /// The executed step sequence, for diagnostics and the summary
    pub steps: Vec<StepResult>,
}

impl SetupResult {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            credentials: None,
            metadata: BTreeMap::new(),
            manual_steps: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn provisioned(&self) -> bool {
        self.credentials
            .as_ref()
            .map(|c| !c.is_empty())
            .unwrap_or(false)
    }

    pub fn needs_manual_setup(&self) -> bool {
        !self.manual_steps.is_empty() && !self.provisioned()
    }
}

/// Capabilities a workflow may reach out through. Cloning is cheap; all
/// members are shared handles.
#[derive(Clone)]
pub struct WorkflowContext {
    pub subprocess: SubprocessManager,
    pub graph: Arc<dyn GraphApi>,
    pub interaction: Arc<dyn UserInteraction>,
}

/// One provider's provisioning strategy.
///
/// `provision` returns `Ok` with a [`SetupResult`] even when parts of the
/// workflow degraded (recoverable step failures, manual steps recorded).
/// It returns `Err` only for provider-fatal conditions (a missing tool or
/// failed authentication), which the orchestrator converts into a failed
/// result plus manual fallback without aborting sibling providers.
#[async_trait]
pub trait ProviderWorkflow: Send + Sync {
    fn provider(&self) -> Provider;

    async fn provision(
        &self,
        request: &ProvisioningRequest,
        ctx: &WorkflowContext,
    ) -> Result<SetupResult>;
}

/// Placeholder value for one synthesized dry-run field.
pub fn dry_run_value(request: &ProvisioningRequest, field: &str) -> String {
    format!("{}-{}{}", request.project_slug(), field.replace('_', "-"), DRY_RUN_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;

    fn request() -> ProvisioningRequest {
        ProvisioningRequest {
            project_name: "Demo Shop".to_string(),
            domain: "demo.example.com".to_string(),
            providers: vec![Provider::CloudOauth],
            dry_run: true,
            interactive: false,
            force: false,
            verbose: false,
            format: OutputFormat::Env,
            output_path: None,
        }
    }

    #[test]
    fn dry_run_values_carry_the_placeholder_suffix() {
        let value = dry_run_value(&request(), "client_id");
        assert_eq!(value, "demo-shop-client-id.dry-run");
        assert!(value.ends_with(DRY_RUN_SUFFIX));
    }

    #[test]
    fn empty_fields_are_not_recorded() {
        let mut creds = ProviderCredentials::new(Provider::SocialGraph);
        creds.set("client_id", "123");
        creds.set("client_secret", "");
        assert_eq!(creds.get("client_id"), Some("123"));
        assert_eq!(creds.get("client_secret"), None);
    }

    #[test]
    fn result_with_empty_credentials_is_not_provisioned() {
        let mut result = SetupResult::new(Provider::MobilePlatform);
        assert!(!result.provisioned());
        result.credentials = Some(ProviderCredentials::new(Provider::MobilePlatform));
        assert!(!result.provisioned());
        result.credentials = Some(
            ProviderCredentials::new(Provider::MobilePlatform).with_field("team_id", "ABCDE12345"),
        );
        assert!(result.provisioned());
    }

    #[test]
    fn skipped_steps_count_as_success() {
        assert!(StepResult::skipped("resolve-project", "already exists").succeeded());
        assert!(!StepResult::new("create-app", StepStatus::FailedFatal).succeeded());
    }
}
