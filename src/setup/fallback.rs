//! Guided manual completion for steps automation cannot perform.
//!
//! `advise` turns a failed or unsupported step into a numbered instruction
//! list with reference URLs; `collect` (interactive mode only) walks the
//! operator through entering the resulting values, validating each field's
//! shape and re-prompting until it matches or the operator gives up.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

use crate::config::{Provider, ProvisioningRequest};
use crate::error::{Result, SetupError};
use crate::setup::interaction::UserInteraction;
use crate::setup::workflow::ProviderCredentials;

/// Ordered human instructions for one provider, generated on demand.
#[derive(Debug, Clone)]
pub struct ManualInstructionSet {
    pub provider: Provider,
    pub steps: Vec<String>,
    pub reference_urls: Vec<String>,
}

/// One value the operator is asked for during collection.
pub struct FieldSpec {
    pub key: &'static str,
    pub prompt: &'static str,
    pub secret: bool,
}

/// Fields `collect` solicits per provider, in prompt order.
pub fn expected_fields(provider: Provider) -> &'static [FieldSpec] {
    match provider {
        Provider::CloudOauth => &[
            FieldSpec { key: "client_id", prompt: "OAuth client ID", secret: false },
            FieldSpec { key: "client_secret", prompt: "OAuth client secret", secret: true },
            FieldSpec { key: "project_id", prompt: "Cloud project ID", secret: false },
        ],
        Provider::SocialGraph => &[
            FieldSpec { key: "client_id", prompt: "App ID", secret: false },
            FieldSpec { key: "client_secret", prompt: "App secret", secret: true },
        ],
        Provider::MobilePlatform => &[
            FieldSpec { key: "service_id", prompt: "Service identifier (reverse-DNS)", secret: false },
            FieldSpec { key: "team_id", prompt: "Team ID (10 characters)", secret: false },
            FieldSpec { key: "key_id", prompt: "Sign-in key ID (10 characters)", secret: false },
            FieldSpec { key: "private_key_path", prompt: "Path to the downloaded private key", secret: false },
        ],
        Provider::DirectoryTenant => &[
            FieldSpec { key: "client_id", prompt: "Application (client) ID", secret: false },
            FieldSpec { key: "client_secret", prompt: "Client secret value", secret: true },
            FieldSpec { key: "tenant_id", prompt: "Directory (tenant) ID", secret: false },
        ],
    }
}

static CLOUD_CLIENT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+-\w+\.apps\.[\w.-]+$").unwrap());
static NUMERIC_APP_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{15,16}$").unwrap());
static PORTAL_SHORT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9]{10}$").unwrap());
static REVERSE_DNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9-]+(\.[a-zA-Z0-9-]+)+$").unwrap());
static CLOUD_PROJECT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9-]{4,28}[a-z0-9]$").unwrap());

/// Validate an operator-supplied value against the provider's known shape
/// for that field. Secret values only need to be non-empty.
pub fn validate_field(provider: Provider, key: &str, value: &str) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SetupError::validation(key, "value must not be empty"));
    }

    let ok = match (provider, key) {
        (Provider::CloudOauth, "client_id") => CLOUD_CLIENT_ID.is_match(value),
        (Provider::CloudOauth, "project_id") => CLOUD_PROJECT_ID.is_match(value),
        (Provider::SocialGraph, "client_id") => NUMERIC_APP_ID.is_match(value),
        (Provider::MobilePlatform, "service_id") => REVERSE_DNS.is_match(value),
        (Provider::MobilePlatform, "team_id") | (Provider::MobilePlatform, "key_id") => {
            PORTAL_SHORT_ID.is_match(value)
        }
        (Provider::DirectoryTenant, "client_id") | (Provider::DirectoryTenant, "tenant_id") => {
            uuid::Uuid::parse_str(value).is_ok()
        }
        // Secrets and paths have no enforced shape
        _ => true,
    };

    if ok {
        Ok(())
    } else {
        Err(SetupError::validation(
            key,
            format!("'{value}' does not match the expected {} format", shape_hint(provider, key)),
        ))
    }
}

fn shape_hint(provider: Provider, key: &str) -> &'static str {
    match (provider, key) {
        (Provider::CloudOauth, "client_id") => "<number>-<token>.apps.<suffix>",
        (Provider::CloudOauth, "project_id") => "lowercase project id",
        (Provider::SocialGraph, "client_id") => "15-16 digit numeric id",
        (Provider::MobilePlatform, "service_id") => "reverse-DNS identifier",
        (Provider::MobilePlatform, _) => "10-character identifier",
        (Provider::DirectoryTenant, _) => "UUID",
        _ => "value",
    }
}

/// The portal walkthrough for one provider, phrased against the concrete
/// request so the operator can follow it verbatim.
pub fn instruction_set(
    provider: Provider,
    request: &ProvisioningRequest,
    failed_step: Option<&str>,
) -> ManualInstructionSet {
    let name = &request.project_name;
    let domain = &request.domain;

    let (steps, reference_urls): (Vec<String>, Vec<&str>) = match provider {
        Provider::CloudOauth => (
            vec![
                format!("Open the cloud console and select or create the project for '{name}'."),
                "Configure the OAuth consent screen (external user type) for the application.".to_string(),
                format!("Create an OAuth client ID of type 'Web application' named '{name}'."),
                format!("Add https://{domain}/signin-oauth to the authorized redirect URIs."),
                "Copy the client ID and client secret.".to_string(),
            ],
            vec!["https://console.cloud.example/apis/credentials"],
        ),
        Provider::SocialGraph => (
            vec![
                format!("Open the developer dashboard and create an app named '{name}'."),
                "Add the 'Login' product to the app.".to_string(),
                format!("Set https://{domain}/signin-social as a valid OAuth redirect URI."),
                format!("Add {domain} to the app domains."),
                "Copy the app ID and app secret from the basic settings page.".to_string(),
            ],
            vec!["https://developers.social.example/apps"],
        ),
        Provider::MobilePlatform => (
            vec![
                format!("In the developer portal, register an App ID for '{name}' with sign-in capability enabled."),
                format!("Create a Services ID (this becomes the client ID) and bind it to {domain} with return URL https://{domain}/signin-mobile."),
                "Create a sign-in key, download the .p8 private key file and note the key ID.".to_string(),
                "Note your 10-character team ID from the membership page.".to_string(),
            ],
            vec!["https://developer.mobile.example/account/resources/identifiers"],
        ),
        Provider::DirectoryTenant => (
            vec![
                format!("Open the directory portal and create (or switch to) the tenant for {domain}."),
                format!("Register an application named '{name}' with redirect URI https://{domain}/signin-oidc."),
                "Create a client secret under 'Certificates & secrets' and copy its value immediately.".to_string(),
                "Create a sign-up/sign-in user flow and note the tenant ID from the overview page.".to_string(),
            ],
            vec!["https://portal.directory.example/app-registrations"],
        ),
    };

    let mut steps = steps;
    if let Some(step) = failed_step {
        steps.insert(0, format!("Automated step '{step}' could not be completed; finish the remaining setup by hand:"));
    }

    ManualInstructionSet {
        provider,
        steps,
        reference_urls: reference_urls.into_iter().map(String::from).collect(),
    }
}

/// Interactive degradation path: show instructions, then optionally walk
/// the operator through entering the resulting values.
pub struct ManualFallbackAdvisor {
    interaction: Arc<dyn UserInteraction>,
}

impl ManualFallbackAdvisor {
    pub fn new(interaction: Arc<dyn UserInteraction>) -> Self {
        Self { interaction }
    }

    /// Render and return the instruction set for a failed step.
    pub fn advise(
        &self,
        provider: Provider,
        request: &ProvisioningRequest,
        failed_step: Option<&str>,
    ) -> ManualInstructionSet {
        let set = instruction_set(provider, request, failed_step);
        self.interaction.instructions(
            &format!("Manual setup required for {}:", provider.display_name()),
            &set.steps,
            &set.reference_urls,
        );
        set
    }

    /// Solicit the provider's expected fields from the operator. Returns
    /// `None` when the operator declines to enter values now. Only called
    /// in interactive mode.
    pub async fn collect(
        &self,
        provider: Provider,
        _request: &ProvisioningRequest,
    ) -> Result<Option<ProviderCredentials>> {
        let proceed = self
            .interaction
            .prompt_yes_no("Have you completed these steps and want to enter the values now?")
            .await
            .map_err(|e| SetupError::configuration(e.to_string()))?;
        if !proceed {
            self.interaction
                .info("Skipping credential entry; re-run once the manual setup is done.");
            return Ok(None);
        }

        let mut credentials = ProviderCredentials::new(provider);
        for field in expected_fields(provider) {
            let value = self.collect_field(provider, field).await?;
            credentials.set(field.key, value);
        }
        Ok(Some(credentials))
    }

    async fn collect_field(&self, provider: Provider, field: &FieldSpec) -> Result<String> {
        loop {
            let answer = if field.secret {
                self.interaction.prompt_secret(field.prompt).await
            } else {
                self.interaction.prompt_text(field.prompt, None).await
            }
            .map_err(|e| SetupError::configuration(e.to_string()))?;

            match validate_field(provider, field.key, &answer) {
                Ok(()) => return Ok(answer.trim().to_string()),
                Err(e) => {
                    self.interaction.warning(&e.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::setup::interaction::mock::MockInteraction;

    fn request() -> ProvisioningRequest {
        ProvisioningRequest {
            project_name: "Demo Shop".to_string(),
            domain: "demo.example.com".to_string(),
            providers: vec![Provider::MobilePlatform],
            dry_run: false,
            interactive: true,
            force: false,
            verbose: false,
            format: OutputFormat::Env,
            output_path: None,
        }
    }

    #[test]
    fn numeric_app_id_shape_is_enforced() {
        assert!(validate_field(Provider::SocialGraph, "client_id", "251234567890123").is_ok());
        assert!(validate_field(Provider::SocialGraph, "client_id", "12345").is_err());
        assert!(validate_field(Provider::SocialGraph, "client_id", "not-a-number").is_err());
    }

    #[test]
    fn directory_ids_must_be_uuids() {
        assert!(validate_field(
            Provider::DirectoryTenant,
            "client_id",
            "5c9e8a3e-2f6a-4b1e-9d0f-1a2b3c4d5e6f"
        )
        .is_ok());
        assert!(validate_field(Provider::DirectoryTenant, "tenant_id", "contoso").is_err());
    }

    #[test]
    fn portal_short_ids_are_exactly_ten_chars() {
        assert!(validate_field(Provider::MobilePlatform, "team_id", "ABCDE12345").is_ok());
        assert!(validate_field(Provider::MobilePlatform, "team_id", "ABC123").is_err());
        assert!(validate_field(Provider::MobilePlatform, "key_id", "abcde12345").is_err());
    }

    #[test]
    fn secrets_only_need_to_be_non_empty() {
        assert!(validate_field(Provider::SocialGraph, "client_secret", "x").is_ok());
        assert!(validate_field(Provider::SocialGraph, "client_secret", "  ").is_err());
    }

    #[test]
    fn instruction_sets_mention_the_domain() {
        for provider in Provider::ALL {
            let set = instruction_set(provider, &request(), None);
            assert!(!set.steps.is_empty());
            assert!(!set.reference_urls.is_empty());
            assert!(
                set.steps.iter().any(|s| s.contains("demo.example.com")),
                "{provider} instructions should reference the domain"
            );
        }
    }

    #[tokio::test]
    async fn collect_reprompts_until_the_shape_matches() {
        let interaction = Arc::new(MockInteraction::new());
        interaction.push_yes_no(true);
        // App id: wrong digit count first, then valid; then the secret.
        interaction.push_text("12345");
        interaction.push_text("251234567890123");
        interaction.push_text("app-secret-value");

        let advisor = ManualFallbackAdvisor::new(interaction.clone());
        let credentials = advisor
            .collect(Provider::SocialGraph, &request())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(credentials.get("client_id"), Some("251234567890123"));
        assert_eq!(credentials.get("client_secret"), Some("app-secret-value"));

        let warnings: Vec<_> = interaction
            .recorded_messages()
            .into_iter()
            .filter(|m| m.starts_with("WARN:"))
            .collect();
        assert_eq!(warnings.len(), 1, "one re-prompt for the bad app id");
    }

    #[tokio::test]
    async fn collect_returns_none_when_operator_declines() {
        let interaction = Arc::new(MockInteraction::new());
        interaction.push_yes_no(false);

        let advisor = ManualFallbackAdvisor::new(interaction);
        let collected = advisor
            .collect(Provider::DirectoryTenant, &request())
            .await
            .unwrap();
        assert!(collected.is_none());
    }
}
