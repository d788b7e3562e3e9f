//! Workflow for the mobile-platform sign-in provider.
//!
//! The developer portal exposes no public API for registering applications
//! or sign-in keys, so outside of dry-run this workflow never attempts
//! automation: it records the portal walkthrough and leaves credential
//! entry to the manual fallback path.

use async_trait::async_trait;

use super::{
    dry_run_value, ProviderCredentials, ProviderWorkflow, SetupResult, StepResult, StepStatus,
    WorkflowContext,
};
use crate::config::{Provider, ProvisioningRequest};
use crate::error::Result;
use crate::setup::fallback;

pub struct MobilePlatformWorkflow;

impl MobilePlatformWorkflow {
    pub fn new() -> Self {
        Self
    }

    fn simulated(&self, request: &ProvisioningRequest) -> SetupResult {
        let mut result = SetupResult::new(self.provider());
        result.steps.push(StepResult::simulated("authenticate"));
        result.steps.push(
            StepResult::simulated("register-service-id")
                .with_artifact("service_id", dry_run_value(request, "service_id")),
        );
        result.steps.push(
            StepResult::simulated("create-signin-key")
                .with_artifact("team_id", dry_run_value(request, "team_id"))
                .with_artifact("key_id", dry_run_value(request, "key_id")),
        );

        let mut credentials = ProviderCredentials::new(self.provider());
        credentials.set("service_id", dry_run_value(request, "service_id"));
        credentials.set("team_id", dry_run_value(request, "team_id"));
        credentials.set("key_id", dry_run_value(request, "key_id"));
        result.credentials = Some(credentials);
        result
    }
}

impl Default for MobilePlatformWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderWorkflow for MobilePlatformWorkflow {
    fn provider(&self) -> Provider {
        Provider::MobilePlatform
    }

    async fn provision(
        &self,
        request: &ProvisioningRequest,
        _ctx: &WorkflowContext,
    ) -> Result<SetupResult> {
        if request.dry_run {
            return Ok(self.simulated(request));
        }

        tracing::info!("mobile-platform registration has no public API; preparing manual steps");

        let mut result = SetupResult::new(self.provider());
        result.steps.push(StepResult::skipped(
            "authenticate",
            "no CLI or public API for the developer portal",
        ));
        result.steps.push(
            StepResult::new("register-service-id", StepStatus::FailedRecoverable)
                .with_message("application registration must be done in the portal"),
        );

        let instructions = fallback::instruction_set(self.provider(), request, None);
        result.manual_steps = instructions.steps;
        result
            .metadata
            .insert("automation".to_string(), "manual-only".to_string());
        Ok(result)
    }
}
