//! Workflow for the multi-tenant directory provider, driven by `az`.
//!
//! Steps: verify the CLI login, resolve or create the consumer tenant for
//! the domain, provision the identity-experience-framework helper app,
//! register the OAuth application with a fresh client secret, create the
//! sign-in user flow, and finally restore the subscription context the
//! workflow started from.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::{
    dry_run_value, ProviderCredentials, ProviderWorkflow, SetupResult, StepResult, WorkflowContext,
};
use crate::config::{Provider, ProvisioningRequest};
use crate::error::{Result, SetupError};
use crate::subprocess::CliTool;

const TENANT_API_VERSION: &str = "2021-04-01";

pub struct DirectoryTenantWorkflow;

impl DirectoryTenantWorkflow {
    pub fn new() -> Self {
        Self
    }

    /// Tenant default domains allow no hyphens.
    fn derived_tenant_domain(request: &ProvisioningRequest) -> String {
        let compact: String = request
            .project_slug()
            .chars()
            .filter(|c| *c != '-')
            .collect();
        format!("{compact}.onmicrosoft.com")
    }

    fn redirect_uri(request: &ProvisioningRequest) -> String {
        format!("https://{}/signin-oidc", request.domain)
    }

    async fn authenticate(
        &self,
        request: &ProvisioningRequest,
        az: &CliTool,
    ) -> Result<StepResult> {
        if request.dry_run {
            return Ok(StepResult::simulated("authenticate")
                .with_artifact("subscription_id", dry_run_value(request, "subscription_id")));
        }

        az.ensure_available().await?;
        let subscription = az.authenticate().await?;
        Ok(StepResult::completed("authenticate").with_artifact("subscription_id", subscription))
    }

    async fn resolve_tenant(
        &self,
        request: &ProvisioningRequest,
        az: &CliTool,
        subscription: &str,
    ) -> Result<StepResult> {
        let domain = Self::derived_tenant_domain(request);
        if request.dry_run {
            return Ok(StepResult::simulated("resolve-tenant")
                .with_artifact("tenant_id", dry_run_value(request, "tenant_id"))
                .with_artifact("tenant_domain", domain));
        }

        let list_url = format!(
            "https://management.azure.com/subscriptions/{subscription}/providers/Microsoft.AzureActiveDirectory/b2cDirectories?api-version={TENANT_API_VERSION}"
        );
        let listing = az
            .invoke_json(["rest", "--method", "get", "--url", list_url.as_str(), "-o", "json"])
            .await?;

        // A miss here is not proof of absence: directory listings are
        // eventually consistent, and a create that then collides surfaces
        // as a recoverable error on this provider only.
        let existing = listing
            .get("value")
            .and_then(|v| v.as_array())
            .and_then(|tenants| {
                tenants.iter().find(|t| {
                    t.get("name").and_then(|n| n.as_str()) == Some(domain.as_str())
                })
            })
            .and_then(|t| t.pointer("/properties/tenantId"))
            .and_then(|id| id.as_str())
            .map(String::from);

        if let Some(tenant_id) = existing {
            tracing::info!("reusing existing tenant '{domain}' ({tenant_id})");
            return Ok(StepResult::skipped(
                "resolve-tenant",
                format!("tenant '{domain}' already exists, reusing it"),
            )
            .with_artifact("tenant_id", tenant_id)
            .with_artifact("tenant_domain", domain));
        }

        let create_url = format!(
            "https://management.azure.com/subscriptions/{subscription}/providers/Microsoft.AzureActiveDirectory/b2cDirectories/{domain}?api-version={TENANT_API_VERSION}"
        );
        let body = format!(
            r#"{{"location":"United States","sku":{{"name":"Standard","tier":"A0"}},"properties":{{"createTenantProperties":{{"displayName":"{}","countryCode":"US"}}}}}}"#,
            request.project_name
        );
        let created = az
            .invoke_json([
                "rest",
                "--method",
                "put",
                "--url",
                create_url.as_str(),
                "--body",
                body.as_str(),
                "-o",
                "json",
            ])
            .await?;

        let mut step = StepResult::completed("resolve-tenant")
            .with_artifact("tenant_domain", domain)
            .with_message("tenant created; directory propagation can take several minutes");
        if let Some(tenant_id) = created
            .pointer("/properties/tenantId")
            .and_then(|id| id.as_str())
        {
            step = step.with_artifact("tenant_id", tenant_id);
        }
        Ok(step)
    }

    /// The identity-experience-framework helper app unlocks custom policy
    /// upload; sign-in works without it, so failure only degrades.
    async fn ensure_identity_framework(
        &self,
        request: &ProvisioningRequest,
        az: &CliTool,
    ) -> StepResult {
        if request.dry_run {
            return StepResult::simulated("ensure-identity-framework");
        }

        match az
            .invoke_json([
                "ad",
                "app",
                "create",
                "--display-name",
                "IdentityExperienceFramework",
                "-o",
                "json",
            ])
            .await
        {
            Ok(value) => {
                let app_id = value
                    .get("appId")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                StepResult::completed("ensure-identity-framework")
                    .with_artifact("ief_app_id", app_id)
            }
            Err(e) => {
                tracing::warn!("identity framework app not created: {e}");
                StepResult::failed_recoverable(
                    "ensure-identity-framework",
                    format!("custom policies unavailable until created by hand: {e}"),
                )
            }
        }
    }

    async fn create_app_registration(
        &self,
        request: &ProvisioningRequest,
        az: &CliTool,
    ) -> Result<StepResult> {
        if request.dry_run {
            return Ok(StepResult::simulated("create-app-registration")
                .with_artifact("client_id", dry_run_value(request, "client_id"))
                .with_artifact("client_secret", dry_run_value(request, "client_secret")));
        }

        let redirect = Self::redirect_uri(request);
        let app = az
            .invoke_json([
                "ad",
                "app",
                "create",
                "--display-name",
                request.project_name.as_str(),
                "--web-redirect-uris",
                redirect.as_str(),
                "--sign-in-audience",
                "AzureADandPersonalMicrosoftAccount",
                "-o",
                "json",
            ])
            .await?;

        let client_id = app
            .get("appId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SetupError::external_api("app registration returned no appId"))?
            .to_string();

        let credential = az
            .invoke_json([
                "ad",
                "app",
                "credential",
                "reset",
                "--id",
                client_id.as_str(),
                "--display-name",
                "credforge",
                "-o",
                "json",
            ])
            .await?;
        let secret = credential
            .get("password")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let mut step = StepResult::completed("create-app-registration")
            .with_artifact("client_id", client_id)
            .with_artifact("redirect_uri", redirect);
        if !secret.is_empty() {
            step = step.with_artifact("client_secret", secret);
        }
        Ok(step)
    }

    async fn configure_user_flow(
        &self,
        request: &ProvisioningRequest,
        az: &CliTool,
    ) -> StepResult {
        if request.dry_run {
            return StepResult::simulated("configure-user-flow");
        }

        let body = r#"{"id":"B2C_1_signin","userFlowType":"signUpOrSignIn","userFlowTypeVersion":3}"#;
        match az
            .invoke([
                "rest",
                "--method",
                "post",
                "--url",
                "https://graph.microsoft.com/beta/identity/b2cUserFlows",
                "--body",
                body,
            ])
            .await
        {
            Ok(_) => StepResult::completed("configure-user-flow")
                .with_artifact("user_flow", "B2C_1_signin"),
            Err(e) => {
                tracing::warn!("sign-in user flow not created: {e}");
                StepResult::failed_recoverable(
                    "configure-user-flow",
                    format!("create the sign-up/sign-in flow in the portal: {e}"),
                )
            }
        }
    }

    /// The next provider must find the CLI in the state it started from.
    async fn restore_context(
        &self,
        request: &ProvisioningRequest,
        az: &CliTool,
        subscription: &str,
    ) -> StepResult {
        if request.dry_run {
            return StepResult::simulated("restore-context");
        }
        if subscription.is_empty() {
            return StepResult::skipped("restore-context", "no subscription captured");
        }

        match az
            .invoke(["account", "set", "--subscription", subscription])
            .await
        {
            Ok(_) => StepResult::completed("restore-context"),
            Err(e) => StepResult::failed_recoverable(
                "restore-context",
                format!("run 'az account set --subscription {subscription}' by hand: {e}"),
            ),
        }
    }
}

impl Default for DirectoryTenantWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderWorkflow for DirectoryTenantWorkflow {
    fn provider(&self) -> Provider {
        Provider::DirectoryTenant
    }

    async fn provision(
        &self,
        request: &ProvisioningRequest,
        ctx: &WorkflowContext,
    ) -> Result<SetupResult> {
        let az = ctx.subprocess.az();
        let mut result = SetupResult::new(self.provider());
        let mut artifacts: BTreeMap<String, String> = BTreeMap::new();

        let auth = self.authenticate(request, &az).await?;
        artifacts.extend(auth.artifacts.clone());
        result.steps.push(auth);

        let subscription = artifacts
            .get("subscription_id")
            .cloned()
            .unwrap_or_default();

        let tenant = self.resolve_tenant(request, &az, &subscription).await?;
        artifacts.extend(tenant.artifacts.clone());
        result.steps.push(tenant);

        result
            .steps
            .push(self.ensure_identity_framework(request, &az).await);

        let app = self.create_app_registration(request, &az).await?;
        artifacts.extend(app.artifacts.clone());
        result.steps.push(app);

        result.steps.push(self.configure_user_flow(request, &az).await);
        result
            .steps
            .push(self.restore_context(request, &az, &subscription).await);

        let mut credentials = ProviderCredentials::new(self.provider());
        for key in ["client_id", "client_secret", "tenant_id"] {
            if let Some(value) = artifacts.get(key) {
                credentials.set(key, value.clone());
            }
        }
        if let Some(domain) = artifacts.get("tenant_domain") {
            result
                .metadata
                .insert("tenant_domain".to_string(), domain.clone());
        }
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
    use crate::setup::workflow::StepStatus;
    use crate::subprocess::{MockProcessRunner, SubprocessManager};
    use std::sync::Arc;

    fn request(dry_run: bool) -> ProvisioningRequest {
        ProvisioningRequest {
            project_name: "Demo Shop".to_string(),
            domain: "demo.example.com".to_string(),
            providers: vec![Provider::DirectoryTenant],
            dry_run,
            interactive: false,
            force: false,
            verbose: false,
            format: OutputFormat::Env,
            output_path: None,
        }
    }

    fn context() -> (WorkflowContext, MockProcessRunner) {
        let (subprocess, mock) = SubprocessManager::mock();
        (
            WorkflowContext {
                subprocess,
                graph: Arc::new(MockGraphApi::new()),
                interaction: Arc::new(MockInteraction::new()),
            },
            mock,
        )
    }

    #[test]
    fn tenant_domain_drops_hyphens() {
        assert_eq!(
            DirectoryTenantWorkflow::derived_tenant_domain(&request(false)),
            "demoshop.onmicrosoft.com"
        );
    }

    #[tokio::test]
    async fn dry_run_touches_no_process() {
        let (ctx, mock) = context();
        let result = DirectoryTenantWorkflow::new()
            .provision(&request(true), &ctx)
            .await
            .unwrap();

        assert_eq!(mock.invocation_count(), 0);
        let creds = result.credentials.unwrap();
        assert!(creds.get("client_id").unwrap().ends_with(".dry-run"));
        assert!(creds.get("tenant_id").unwrap().ends_with(".dry-run"));
    }

    #[tokio::test]
    async fn logged_out_cli_is_an_authentication_error() {
        let (ctx, mock) = context();
        mock.expect("az")
            .with_args(|args| args.first().map(String::as_str) == Some("--version"))
            .returns_stdout("azure-cli 2.60.0")
            .finish();
        mock.expect("az")
            .with_args(|args| args.first().map(String::as_str) == Some("account"))
            .returns_exit_code(1, "Please run 'az login' to setup account.")
            .finish();

        let err = DirectoryTenantWorkflow::new()
            .provision(&request(false), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, SetupError::Authentication { .. }));
    }

    #[tokio::test]
    async fn existing_tenant_is_reused_and_app_registered() {
        let (ctx, mock) = context();
        mock.expect("az")
            .with_args(|args| args.first().map(String::as_str) == Some("--version"))
            .returns_stdout("azure-cli 2.60.0")
            .finish();
        mock.expect("az")
            .with_args(|args| args.first().map(String::as_str) == Some("account")
                && args.get(1).map(String::as_str) == Some("show"))
            .returns_stdout(r#"{"id": "00000000-1111-2222-3333-444444444444"}"#)
            .finish();
        mock.expect("az")
            .with_args(|args| args.first().map(String::as_str) == Some("rest")
                && args.iter().any(|a| a.contains("b2cDirectories?")))
            .returns_stdout(
                r#"{"value": [{"name": "demoshop.onmicrosoft.com", "properties": {"tenantId": "99999999-8888-7777-6666-555555555555"}}]}"#,
            )
            .finish();
        mock.expect("az")
            .with_args(|args| args.get(2).map(String::as_str) == Some("create")
                && args.iter().any(|a| a == "IdentityExperienceFramework"))
            .returns_stdout(r#"{"appId": "aaaaaaaa-0000-0000-0000-000000000001"}"#)
            .finish();
        mock.expect("az")
            .with_args(|args| args.get(2).map(String::as_str) == Some("create")
                && args.iter().any(|a| a == "Demo Shop"))
            .returns_stdout(r#"{"appId": "bbbbbbbb-0000-0000-0000-000000000002"}"#)
            .finish();
        mock.expect("az")
            .with_args(|args| args.get(2).map(String::as_str) == Some("credential"))
            .returns_stdout(r#"{"password": "generated-secret"}"#)
            .finish();
        mock.expect("az")
            .with_args(|args| args.first().map(String::as_str) == Some("rest")
                && args.iter().any(|a| a.contains("b2cUserFlows")))
            .returns_stdout("{}")
            .finish();
        mock.expect("az")
            .with_args(|args| args.get(1).map(String::as_str) == Some("set"))
            .returns_stdout("")
            .finish();

        let result = DirectoryTenantWorkflow::new()
            .provision(&request(false), &ctx)
            .await
            .unwrap();

        assert_eq!(result.steps[1].status, StepStatus::Skipped);
        let creds = result.credentials.unwrap();
        assert_eq!(
            creds.get("tenant_id"),
            Some("99999999-8888-7777-6666-555555555555")
        );
        assert_eq!(
            creds.get("client_id"),
            Some("bbbbbbbb-0000-0000-0000-000000000002")
        );
        assert_eq!(creds.get("client_secret"), Some("generated-secret"));
        assert_eq!(
            result.metadata.get("tenant_domain").map(String::as_str),
            Some("demoshop.onmicrosoft.com")
        );
    }
}
