//! Workflow for the cloud-project-based OAuth provider, driven by `gcloud`.
//!
//! Steps: verify an active CLI account, resolve or create the cloud project
//! for the app (reusing an existing one on repeated runs), enable the
//! identity services, create the OAuth brand and client, then confirm the
//! client is readable. All commands pass `--project` explicitly so the
//! operator's configured default project is never mutated.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::{
    dry_run_value, ProviderCredentials, ProviderWorkflow, SetupResult, StepResult, WorkflowContext,
};
use crate::config::{Provider, ProvisioningRequest};
use crate::error::{Result, SetupError};
use crate::subprocess::CliTool;

/// Cloud project ids allow at most 30 lowercase characters.
const MAX_PROJECT_ID_LEN: usize = 30;

pub struct CloudOauthWorkflow;

impl CloudOauthWorkflow {
    pub fn new() -> Self {
        Self
    }

    fn derived_project_id(request: &ProvisioningRequest) -> String {
        let mut id = request.project_slug();
        id.truncate(MAX_PROJECT_ID_LEN);
        id.trim_end_matches('-').to_string()
    }

    async fn authenticate(
        &self,
        request: &ProvisioningRequest,
        gcloud: &CliTool,
    ) -> Result<StepResult> {
        if request.dry_run {
            return Ok(StepResult::simulated("authenticate")
                .with_artifact("account", dry_run_value(request, "account")));
        }

        gcloud.ensure_available().await?;
        let account = gcloud.authenticate().await?;
        tracing::debug!("active gcloud account: {account}");
        Ok(StepResult::completed("authenticate").with_artifact("account", account))
    }

    async fn resolve_project(
        &self,
        request: &ProvisioningRequest,
        gcloud: &CliTool,
    ) -> Result<StepResult> {
        let project_id = Self::derived_project_id(request);
        if request.dry_run {
            return Ok(StepResult::simulated("resolve-project")
                .with_artifact("project_id", dry_run_value(request, "project_id")));
        }

        let filter = format!("--filter=projectId:{project_id}");
        let existing = gcloud
            .invoke_json(["projects", "list", filter.as_str(), "--format=json"])
            .await?;

        if existing.as_array().map(|l| !l.is_empty()).unwrap_or(false) {
            tracing::info!("reusing existing cloud project '{project_id}'");
            return Ok(StepResult::skipped(
                "resolve-project",
                format!("project '{project_id}' already exists, reusing it"),
            )
            .with_artifact("project_id", project_id));
        }

        let name_flag = format!("--name={}", request.project_name);
        gcloud
            .invoke(["projects", "create", project_id.as_str(), name_flag.as_str()])
            .await?;
        Ok(StepResult::completed("resolve-project").with_artifact("project_id", project_id))
    }

    /// Best-effort: provisioning still works with services enabled by hand.
    async fn enable_services(
        &self,
        request: &ProvisioningRequest,
        gcloud: &CliTool,
        project_id: &str,
    ) -> StepResult {
        if request.dry_run {
            return StepResult::simulated("enable-services");
        }

        match gcloud
            .invoke([
                "services",
                "enable",
                "iap.googleapis.com",
                "--project",
                project_id,
            ])
            .await
        {
            Ok(_) => StepResult::completed("enable-services"),
            Err(e) => {
                tracing::warn!("could not enable identity services: {e}");
                StepResult::failed_recoverable(
                    "enable-services",
                    format!("continuing without service enablement: {e}"),
                )
            }
        }
    }

    async fn create_oauth_client(
        &self,
        request: &ProvisioningRequest,
        gcloud: &CliTool,
        project_id: &str,
    ) -> Result<StepResult> {
        if request.dry_run {
            return Ok(StepResult::simulated("create-oauth-client")
                .with_artifact("client_id", dry_run_value(request, "client_id"))
                .with_artifact("client_secret", dry_run_value(request, "client_secret")));
        }

        let brands = gcloud
            .invoke_json([
                "iap",
                "oauth-brands",
                "list",
                "--project",
                project_id,
                "--format=json",
            ])
            .await?;

        let brand = match brands
            .as_array()
            .and_then(|l| l.first())
            .and_then(|b| b.get("name"))
            .and_then(|n| n.as_str())
        {
            Some(existing) => {
                tracing::info!("reusing existing OAuth brand '{existing}'");
                existing.to_string()
            }
            None => {
                let title_flag = format!("--application_title={}", request.project_name);
                let created = gcloud
                    .invoke_json([
                        "iap",
                        "oauth-brands",
                        "create",
                        "--project",
                        project_id,
                        title_flag.as_str(),
                        "--format=json",
                    ])
                    .await?;
                created
                    .get("name")
                    .and_then(|n| n.as_str())
                    .map(String::from)
                    .ok_or_else(|| {
                        SetupError::external_api("brand creation returned no resource name")
                    })?
            }
        };

        let display_flag = format!("--display_name={}", request.project_name);
        let client = gcloud
            .invoke_json([
                "iap",
                "oauth-clients",
                "create",
                brand.as_str(),
                display_flag.as_str(),
                "--format=json",
            ])
            .await?;

        let name = client
            .get("name")
            .and_then(|n| n.as_str())
            .ok_or_else(|| SetupError::external_api("client creation returned no resource name"))?;
        let client_id = name.rsplit('/').next().unwrap_or(name).to_string();
        let secret = client
            .get("secret")
            .and_then(|s| s.as_str())
            .unwrap_or_default()
            .to_string();

        let mut step = StepResult::completed("create-oauth-client")
            .with_artifact("client_id", client_id)
            .with_artifact("brand", brand);
        if !secret.is_empty() {
            step = step.with_artifact("client_secret", secret);
        }
        Ok(step)
    }

    /// Read-after-write check. A miss is tolerated: list consistency lags
    /// behind creation on this control plane.
    async fn verify_client(
        &self,
        request: &ProvisioningRequest,
        gcloud: &CliTool,
        brand: Option<&str>,
    ) -> StepResult {
        if request.dry_run {
            return StepResult::simulated("verify-client");
        }
        let Some(brand) = brand else {
            return StepResult::skipped("verify-client", "no brand to verify against");
        };

        match gcloud
            .invoke_unchecked(["iap", "oauth-clients", "list", brand, "--format=json"])
            .await
        {
            Ok(output) if output.success() => StepResult::completed("verify-client"),
            Ok(_) | Err(_) => StepResult::failed_recoverable(
                "verify-client",
                "created client not yet visible in listing",
            ),
        }
    }
}

impl Default for CloudOauthWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderWorkflow for CloudOauthWorkflow {
    fn provider(&self) -> Provider {
        Provider::CloudOauth
    }

    async fn provision(
        &self,
        request: &ProvisioningRequest,
        ctx: &WorkflowContext,
    ) -> Result<SetupResult> {
        let gcloud = ctx.subprocess.gcloud();
        let mut result = SetupResult::new(self.provider());
        let mut artifacts: BTreeMap<String, String> = BTreeMap::new();

        let auth = self.authenticate(request, &gcloud).await?;
        artifacts.extend(auth.artifacts.clone());
        result.steps.push(auth);

        let project = self.resolve_project(request, &gcloud).await?;
        artifacts.extend(project.artifacts.clone());
        result.steps.push(project);

        let project_id = artifacts
            .get("project_id")
            .cloned()
            .unwrap_or_else(|| Self::derived_project_id(request));

        result
            .steps
            .push(self.enable_services(request, &gcloud, &project_id).await);

        let client = self
            .create_oauth_client(request, &gcloud, &project_id)
            .await?;
        artifacts.extend(client.artifacts.clone());
        result.steps.push(client);

        result.steps.push(
            self.verify_client(request, &gcloud, artifacts.get("brand").map(String::as_str))
                .await,
        );

        let mut credentials = ProviderCredentials::new(self.provider());
        credentials.set("project_id", project_id.clone());
        if let Some(client_id) = artifacts.get("client_id") {
            credentials.set("client_id", client_id.clone());
        }
        if let Some(secret) = artifacts.get("client_secret") {
            credentials.set("client_secret", secret.clone());
        }

        result.metadata.insert("project_id".to_string(), project_id);
        result.credentials = Some(credentials);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::setup::graph::MockGraphApi;
    use crate::setup::interaction::mock::MockInteraction;
    use crate::subprocess::SubprocessManager;
    use std::sync::Arc;

    fn request(dry_run: bool) -> ProvisioningRequest {
        ProvisioningRequest {
            project_name: "Demo Shop".to_string(),
            domain: "demo.example.com".to_string(),
            providers: vec![Provider::CloudOauth],
            dry_run,
            interactive: false,
            force: false,
            verbose: false,
            format: OutputFormat::Env,
            output_path: None,
        }
    }

    fn context(subprocess: SubprocessManager) -> WorkflowContext {
        WorkflowContext {
            subprocess,
            graph: Arc::new(MockGraphApi::new()),
            interaction: Arc::new(MockInteraction::new()),
        }
    }

    #[tokio::test]
    async fn dry_run_touches_no_process() {
        let (subprocess, mock) = SubprocessManager::mock();
        let result = CloudOauthWorkflow::new()
            .provision(&request(true), &context(subprocess))
            .await
            .unwrap();

        assert_eq!(mock.invocation_count(), 0);
        let creds = result.credentials.unwrap();
        assert!(creds.get("client_id").unwrap().ends_with(".dry-run"));
        assert_eq!(creds.provider, Provider::CloudOauth);
    }

    #[tokio::test]
    async fn missing_account_is_an_authentication_error() {
        let (subprocess, mock) = SubprocessManager::mock();
        mock.expect("gcloud")
            .with_args(|args| args.first().map(String::as_str) == Some("--version"))
            .returns_stdout("Google Cloud SDK 470.0.0")
            .finish();
        mock.expect("gcloud")
            .with_args(|args| args.first().map(String::as_str) == Some("auth"))
            .returns_stdout("[]")
            .finish();

        let err = CloudOauthWorkflow::new()
            .provision(&request(false), &context(subprocess))
            .await
            .unwrap_err();
        assert!(matches!(err, SetupError::Authentication { .. }));
    }

    #[tokio::test]
    async fn existing_project_is_reused_not_recreated() {
        let (subprocess, mock) = SubprocessManager::mock();
        mock.expect("gcloud")
            .with_args(|args| args.first().map(String::as_str) == Some("--version"))
            .returns_stdout("ok")
            .finish();
        mock.expect("gcloud")
            .with_args(|args| args.first().map(String::as_str) == Some("auth"))
            .returns_stdout(r#"[{"account": "dev@example.com", "status": "ACTIVE"}]"#)
            .finish();
        mock.expect("gcloud")
            .with_args(|args| args.first().map(String::as_str) == Some("projects")
                && args.get(1).map(String::as_str) == Some("list"))
            .returns_stdout(r#"[{"projectId": "demo-shop"}]"#)
            .finish();
        mock.expect("gcloud")
            .with_args(|args| args.get(1).map(String::as_str) == Some("oauth-brands")
                && args.get(2).map(String::as_str) == Some("list"))
            .returns_stdout(r#"[{"name": "projects/42/brands/42"}]"#)
            .finish();
        mock.expect("gcloud")
            .with_args(|args| args.get(1).map(String::as_str) == Some("oauth-clients")
                && args.get(2).map(String::as_str) == Some("create"))
            .returns_stdout(
                r#"{"name": "projects/42/brands/42/identityAwareProxyClients/abc123.apps.cloudusercontent.example", "secret": "s3cr3t"}"#,
            )
            .finish();
        mock.expect("gcloud")
            .with_args(|args| args.get(1).map(String::as_str) == Some("oauth-clients")
                && args.get(2).map(String::as_str) == Some("list"))
            .returns_stdout("[]")
            .finish();

        let result = CloudOauthWorkflow::new()
            .provision(&request(false), &context(subprocess))
            .await
            .unwrap();

        // No `projects create` call was issued
        assert!(mock
            .calls_for("gcloud")
            .iter()
            .all(|cmd| cmd.args.get(1).map(String::as_str) != Some("create")
                || cmd.args.first().map(String::as_str) != Some("projects")));

        let resolve = &result.steps[1];
        assert_eq!(resolve.status, super::super::StepStatus::Skipped);

        let creds = result.credentials.unwrap();
        assert_eq!(
            creds.get("client_id"),
            Some("abc123.apps.cloudusercontent.example")
        );
        assert_eq!(creds.get("client_secret"), Some("s3cr3t"));
        assert_eq!(creds.get("project_id"), Some("demo-shop"));
    }
}
