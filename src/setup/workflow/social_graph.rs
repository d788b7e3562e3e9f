//! Workflow for the social-graph login provider, driven by its HTTP app
//! management API.
//!
//! There is no CLI for this provider; the workflow validates the developer
//! token, reuses or registers the app, pulls the app secret, and then sets
//! the OAuth redirect and domain as a best-effort final step.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::{
    dry_run_value, ProviderCredentials, ProviderWorkflow, SetupResult, StepResult, WorkflowContext,
};
use crate::config::{Provider, ProvisioningRequest};
use crate::error::Result;
use crate::setup::graph::GraphApi;

pub struct SocialGraphWorkflow;

impl SocialGraphWorkflow {
    pub fn new() -> Self {
        Self
    }

    fn redirect_uri(request: &ProvisioningRequest) -> String {
        format!("https://{}/signin-social", request.domain)
    }

    async fn authenticate(
        &self,
        request: &ProvisioningRequest,
        graph: &dyn GraphApi,
    ) -> Result<StepResult> {
        if request.dry_run {
            return Ok(StepResult::simulated("authenticate")
                .with_artifact("account", dry_run_value(request, "account")));
        }

        let account = graph.validate_token().await?;
        tracing::debug!("graph token belongs to '{}' ({})", account.name, account.id);
        Ok(StepResult::completed("authenticate").with_artifact("account", account.id))
    }

    async fn resolve_app(
        &self,
        request: &ProvisioningRequest,
        graph: &dyn GraphApi,
    ) -> Result<StepResult> {
        if request.dry_run {
            return Ok(StepResult::simulated("resolve-app")
                .with_artifact("client_id", dry_run_value(request, "client_id")));
        }

        let existing = graph.list_apps().await?;
        if let Some(app) = existing.iter().find(|app| app.name == request.project_name) {
            tracing::info!("reusing existing app '{}' ({})", app.name, app.id);
            return Ok(StepResult::skipped(
                "resolve-app",
                format!("app '{}' already registered, reusing it", app.name),
            )
            .with_artifact("client_id", app.id.clone()));
        }

        let created = graph.create_app(&request.project_name).await?;
        Ok(StepResult::completed("resolve-app").with_artifact("client_id", created.id))
    }

    async fn fetch_secret(
        &self,
        request: &ProvisioningRequest,
        graph: &dyn GraphApi,
        app_id: &str,
    ) -> Result<StepResult> {
        if request.dry_run {
            return Ok(StepResult::simulated("fetch-app-secret")
                .with_artifact("client_secret", dry_run_value(request, "client_secret")));
        }

        let secret = graph.app_secret(app_id).await?;
        Ok(StepResult::completed("fetch-app-secret").with_artifact("client_secret", secret))
    }

    /// Best-effort: a failure leaves the app usable, just unconfigured.
    async fn configure_oauth(
        &self,
        request: &ProvisioningRequest,
        graph: &dyn GraphApi,
        app_id: &str,
    ) -> StepResult {
        if request.dry_run {
            return StepResult::simulated("configure-oauth");
        }

        let redirect = Self::redirect_uri(request);
        match graph
            .configure_oauth(app_id, &redirect, &request.domain)
            .await
        {
            Ok(()) => StepResult::completed("configure-oauth").with_artifact("redirect_uri", redirect),
            Err(e) => {
                tracing::warn!("could not configure OAuth settings: {e}");
                StepResult::failed_recoverable(
                    "configure-oauth",
                    format!("set the redirect URI '{redirect}' by hand: {e}"),
                )
            }
        }
    }
}

impl Default for SocialGraphWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderWorkflow for SocialGraphWorkflow {
    fn provider(&self) -> Provider {
        Provider::SocialGraph
    }

    async fn provision(
        &self,
        request: &ProvisioningRequest,
        ctx: &WorkflowContext,
    ) -> Result<SetupResult> {
        let graph = ctx.graph.as_ref();
        let mut result = SetupResult::new(self.provider());
        let mut artifacts: BTreeMap<String, String> = BTreeMap::new();

        let auth = self.authenticate(request, graph).await?;
        artifacts.extend(auth.artifacts.clone());
        result.steps.push(auth);

        let app = self.resolve_app(request, graph).await?;
        artifacts.extend(app.artifacts.clone());
        result.steps.push(app);

        let app_id = artifacts.get("client_id").cloned().unwrap_or_default();

        let secret = self.fetch_secret(request, graph, &app_id).await?;
        artifacts.extend(secret.artifacts.clone());
        result.steps.push(secret);

        result
            .steps
            .push(self.configure_oauth(request, graph, &app_id).await);

        let mut credentials = ProviderCredentials::new(self.provider());
        if let Some(client_id) = artifacts.get("client_id") {
            credentials.set("client_id", client_id.clone());
        }
        if let Some(secret) = artifacts.get("client_secret") {
            credentials.set("client_secret", secret.clone());
        }
        result.credentials = Some(credentials);
        Ok(result)
    }
}
