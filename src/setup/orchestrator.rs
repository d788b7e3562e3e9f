//! Provisioning orchestration.
//!
//! Drives the selected provider workflows in fixed order, isolates
//! per-provider failures, degrades to manual fallback where allowed, and
//! hands the aggregate to the credential writer and artifact generator.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{Provider, ProvisioningRequest};
use crate::error::{Result, SetupError};
use crate::setup::fallback::ManualFallbackAdvisor;
use crate::setup::graph::HttpGraphApi;
use crate::setup::interaction::{ConsoleInteraction, UserInteraction};
use crate::setup::output::integration::DEFAULT_ARTIFACT_FILE;
use crate::setup::output::{generate_integration_artifact, CredentialStoreWriter};
use crate::setup::workflow::{
    CloudOauthWorkflow, DirectoryTenantWorkflow, MobilePlatformWorkflow, ProviderWorkflow,
    SetupResult, SocialGraphWorkflow, WorkflowContext,
};
use crate::subprocess::SubprocessManager;

/// Aggregate outcome of one run.
#[derive(Debug)]
pub struct RunResult {
    pub setup_results: Vec<SetupResult>,
    pub output_file: PathBuf,
    pub integration_file: PathBuf,
}

impl RunResult {
    /// True when every selected provider ended the run with credentials,
    /// whether automated, simulated, or accepted from the operator. This
    /// is the zero-exit condition.
    pub fn all_provisioned(&self) -> bool {
        self.setup_results.iter().all(|r| r.provisioned())
    }
}

pub struct SetupOrchestrator {
    ctx: WorkflowContext,
    advisor: ManualFallbackAdvisor,
    writer: CredentialStoreWriter,
}

impl SetupOrchestrator {
    pub fn new(ctx: WorkflowContext) -> Self {
        let advisor = ManualFallbackAdvisor::new(Arc::clone(&ctx.interaction));
        Self {
            ctx,
            advisor,
            writer: CredentialStoreWriter::new(),
        }
    }

    /// Wire up the production collaborators: real subprocesses, the real
    /// graph API client, and console interaction.
    pub fn production() -> Result<Self> {
        let interaction: Arc<dyn UserInteraction> = Arc::new(ConsoleInteraction::new());
        let ctx = WorkflowContext {
            subprocess: SubprocessManager::production(),
            graph: Arc::new(HttpGraphApi::from_env()?),
            interaction,
        };
        Ok(Self::new(ctx))
    }

    fn workflow_for(provider: Provider) -> Box<dyn ProviderWorkflow> {
        match provider {
            Provider::CloudOauth => Box::new(CloudOauthWorkflow::new()),
            Provider::SocialGraph => Box::new(SocialGraphWorkflow::new()),
            Provider::MobilePlatform => Box::new(MobilePlatformWorkflow::new()),
            Provider::DirectoryTenant => Box::new(DirectoryTenantWorkflow::new()),
        }
    }

    pub async fn run(&self, request: &ProvisioningRequest) -> Result<RunResult> {
        request.validate()?;

        let output_file = request.resolved_output_path();
        let integration_file = output_file
            .parent()
            .map(|dir| dir.join(DEFAULT_ARTIFACT_FILE))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACT_FILE));
        if !request.force {
            for path in [&output_file, &integration_file] {
                if path.exists() {
                    return Err(SetupError::configuration(format!(
                        "'{}' already exists; pass --force to overwrite it",
                        path.display()
                    )));
                }
            }
        }

        let interaction = &self.ctx.interaction;
        if request.dry_run {
            interaction.info("Dry-run: external systems will not be touched.");
        }

        let mut setup_results = Vec::new();
        for provider in request.ordered_providers() {
            interaction.progress(&format!(
                "Provisioning {} for '{}'...",
                provider.display_name(),
                request.project_name
            ));

            let result = self.provision_one(provider, request).await?;
            if request.verbose {
                for step in &result.steps {
                    let note = step.message.as_deref().unwrap_or("");
                    interaction.info(&format!("    {:<24} {:?} {note}", step.step_name, step.status));
                }
            }
            if result.provisioned() {
                interaction.success(&format!("{} ready", provider.display_name()));
            } else if result.needs_manual_setup() {
                interaction.warning(&format!(
                    "{} requires manual setup",
                    provider.display_name()
                ));
            } else {
                interaction.error(&format!("{} failed", provider.display_name()));
            }
            setup_results.push(result);
        }

        self.writer.write(request, &setup_results, &output_file)?;

        let artifact = generate_integration_artifact(&request.domain, &setup_results)?;
        std::fs::write(&integration_file, artifact)?;

        let run = RunResult {
            setup_results,
            output_file,
            integration_file,
        };
        self.print_summary(&run);
        Ok(run)
    }

    /// Provider-level failures never abort the run; they produce a failed
    /// result, and the fallback path takes over where the mode allows it.
    async fn provision_one(
        &self,
        provider: Provider,
        request: &ProvisioningRequest,
    ) -> Result<SetupResult> {
        let workflow = Self::workflow_for(provider);
        let mut result = match workflow.provision(request, &self.ctx).await {
            Ok(result) => result,
            Err(e) if e.is_fatal_to_run() => return Err(e),
            Err(e) => {
                tracing::warn!("{provider} workflow failed: {e}");
                self.ctx.interaction.error(&e.to_string());
                let mut failed = SetupResult::new(provider);
                failed.metadata.insert("error".to_string(), e.to_string());
                failed
            }
        };

        // A provider that came back without credentials gets the manual
        // path: instructions always, value collection only when the
        // operator is present.
        if !result.provisioned() && !request.dry_run {
            if result.manual_steps.is_empty() {
                let failed_step = result
                    .steps
                    .iter()
                    .find(|s| !s.succeeded())
                    .map(|s| s.step_name.clone());
                let instructions = self.advisor.advise(provider, request, failed_step.as_deref());
                result.manual_steps = instructions.steps;
            } else {
                self.ctx.interaction.instructions(
                    &format!("Manual setup required for {}:", provider.display_name()),
                    &result.manual_steps,
                    &[],
                );
            }

            if request.interactive {
                if let Some(credentials) = self.advisor.collect(provider, request).await? {
                    result.credentials = Some(credentials);
                    result
                        .metadata
                        .insert("source".to_string(), "operator".to_string());
                }
            }
        }

        Ok(result)
    }

    fn print_summary(&self, run: &RunResult) {
        let interaction = &self.ctx.interaction;
        interaction.info("Summary:");
        for result in &run.setup_results {
            let status = if result.provisioned() {
                if result.metadata.get("source").map(String::as_str) == Some("operator") {
                    "manual (accepted)"
                } else {
                    "automated"
                }
            } else if result.needs_manual_setup() {
                "manual setup required"
            } else {
                "failed"
            };
            interaction.info(&format!("  {:<18} {status}", result.provider.as_str()));
        }
        interaction.info(&format!(
            "Credentials written to {}",
            run.output_file.display()
        ));
        interaction.info(&format!(
            "Integration code written to {}",
            run.integration_file.display()
        ));
    }
}
