//! Request and provider configuration for provisioning runs.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Result, SetupError};

/// One external identity system the tool can provision against.
///
/// The declaration order is the fixed execution order of a run: the
/// directory tenant is provisioned last because it depends on nothing here,
/// while social-provider registration inside a tenant consumes artifacts
/// created by the earlier providers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    /// Cloud-project-based OAuth (driven by the `gcloud` CLI)
    CloudOauth,
    /// Social-graph login (driven by its HTTP Graph API)
    SocialGraph,
    /// Mobile-platform sign-in (developer portal only, no public API)
    MobilePlatform,
    /// Multi-tenant directory (driven by the `az` CLI)
    DirectoryTenant,
}

impl Provider {
    /// All providers in fixed execution order.
    pub const ALL: [Provider; 4] = [
        Provider::CloudOauth,
        Provider::SocialGraph,
        Provider::MobilePlatform,
        Provider::DirectoryTenant,
    ];

    /// Stable kebab-case identifier used on the CLI and in file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::CloudOauth => "cloud-oauth",
            Provider::SocialGraph => "social-graph",
            Provider::MobilePlatform => "mobile-platform",
            Provider::DirectoryTenant => "directory-tenant",
        }
    }

    /// Prefix for serialized credential keys, e.g. `CLOUD_OAUTH_CLIENT_ID`.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Provider::CloudOauth => "CLOUD_OAUTH",
            Provider::SocialGraph => "SOCIAL_GRAPH",
            Provider::MobilePlatform => "MOBILE_PLATFORM",
            Provider::DirectoryTenant => "DIRECTORY_TENANT",
        }
    }

    /// Human-readable name for console output.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::CloudOauth => "Cloud OAuth",
            Provider::SocialGraph => "Social Graph",
            Provider::MobilePlatform => "Mobile Platform",
            Provider::DirectoryTenant => "Directory Tenant",
        }
    }

    /// The external CLI the provider's workflow drives, if any.
    pub fn required_tool(&self) -> Option<&'static str> {
        match self {
            Provider::CloudOauth => Some("gcloud"),
            Provider::SocialGraph => None,
            Provider::MobilePlatform => None,
            Provider::DirectoryTenant => Some("az"),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cloud-oauth" => Ok(Provider::CloudOauth),
            "social-graph" => Ok(Provider::SocialGraph),
            "mobile-platform" => Ok(Provider::MobilePlatform),
            "directory-tenant" => Ok(Provider::DirectoryTenant),
            other => Err(SetupError::configuration(format!(
                "unknown provider '{other}' (expected one of: cloud-oauth, social-graph, mobile-platform, directory-tenant)"
            ))),
        }
    }
}

/// Serialization target for the credential file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Flat `KEY=value` lines
    Env,
    /// Structured JSON document
    Json,
    /// Structured YAML document
    Yaml,
}

impl OutputFormat {
    /// Default output file name for the format.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            OutputFormat::Env => ".env.oauth",
            OutputFormat::Json => "oauth-credentials.json",
            OutputFormat::Yaml => "oauth-credentials.yaml",
        }
    }
}

/// Immutable input for one provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisioningRequest {
    /// Application/project name used to derive resource names
    pub project_name: String,
    /// Domain the OAuth application serves (redirect URI host)
    pub domain: String,
    /// Providers to provision, as selected by the operator
    pub providers: Vec<Provider>,
    /// Simulate every external call instead of performing it
    pub dry_run: bool,
    /// Allow prompting the operator for manual-fallback values
    pub interactive: bool,
    /// Overwrite existing output files
    pub force: bool,
    /// Verbose step output
    pub verbose: bool,
    /// Credential file format
    pub format: OutputFormat,
    /// Override for the credential file path
    pub output_path: Option<PathBuf>,
}

impl ProvisioningRequest {
    /// Validate the request before any provider is attempted.
    pub fn validate(&self) -> Result<()> {
        if self.project_name.trim().is_empty() {
            return Err(SetupError::configuration("project name must not be empty"));
        }
        if self.providers.is_empty() {
            return Err(SetupError::configuration(
                "at least one provider must be selected",
            ));
        }
        if !is_valid_hostname(&self.domain) {
            return Err(SetupError::configuration(format!(
                "'{}' is not a valid domain name",
                self.domain
            )));
        }
        Ok(())
    }

    /// Selected providers in fixed execution order, deduplicated.
    pub fn ordered_providers(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.providers.contains(p))
            .collect()
    }

    /// Path the credential file will be written to.
    pub fn resolved_output_path(&self) -> PathBuf {
        self.output_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.format.default_file_name()))
    }

    /// Lowercase token derived from the project name, usable as a resource
    /// id fragment (`My App` -> `my-app`).
    pub fn project_slug(&self) -> String {
        let mut slug = String::new();
        for ch in self.project_name.trim().chars() {
            if ch.is_ascii_alphanumeric() {
                slug.push(ch.to_ascii_lowercase());
            } else if !slug.ends_with('-') && !slug.is_empty() {
                slug.push('-');
            }
        }
        slug.trim_end_matches('-').to_string()
    }
}

/// Syntactic hostname check per RFC 1123: dot-separated labels of
/// alphanumerics and interior hyphens, at most 253 characters total.
pub fn is_valid_hostname(hostname: &str) -> bool {
    if hostname.is_empty() || hostname.len() > 253 {
        return false;
    }
    let labels: Vec<&str> = hostname.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    for label in &labels {
        if label.is_empty() || label.len() > 63 {
            return false;
        }
        if label.starts_with('-') || label.ends_with('-') {
            return false;
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return false;
        }
    }
    // The TLD is never all-numeric
    labels
        .last()
        .map(|tld| !tld.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(providers: Vec<Provider>, domain: &str) -> ProvisioningRequest {
        ProvisioningRequest {
            project_name: "My App".to_string(),
            domain: domain.to_string(),
            providers,
            dry_run: true,
            interactive: false,
            force: false,
            verbose: false,
            format: OutputFormat::Env,
            output_path: None,
        }
    }

    #[test]
    fn valid_hostnames() {
        assert!(is_valid_hostname("example.com"));
        assert!(is_valid_hostname("app.staging.example.co.uk"));
        assert!(is_valid_hostname("xn--bcher-kva.example"));
    }

    #[test]
    fn invalid_hostnames() {
        assert!(!is_valid_hostname(""));
        assert!(!is_valid_hostname("localhost"));
        assert!(!is_valid_hostname("-bad.example.com"));
        assert!(!is_valid_hostname("bad-.example.com"));
        assert!(!is_valid_hostname("exa mple.com"));
        assert!(!is_valid_hostname("example.123"));
        assert!(!is_valid_hostname(&format!("{}.com", "a".repeat(300))));
    }

    #[test]
    fn empty_provider_set_is_rejected() {
        let req = request(vec![], "example.com");
        assert!(matches!(
            req.validate(),
            Err(SetupError::Configuration(_))
        ));
    }

    #[test]
    fn invalid_domain_is_rejected() {
        let req = request(vec![Provider::CloudOauth], "not a domain");
        assert!(req.validate().is_err());
    }

    #[test]
    fn providers_are_ordered_and_deduplicated() {
        let req = request(
            vec![
                Provider::DirectoryTenant,
                Provider::CloudOauth,
                Provider::DirectoryTenant,
            ],
            "example.com",
        );
        assert_eq!(
            req.ordered_providers(),
            vec![Provider::CloudOauth, Provider::DirectoryTenant]
        );
    }

    #[test]
    fn project_slug_normalizes_name() {
        let mut req = request(vec![Provider::CloudOauth], "example.com");
        req.project_name = "  Contoso Shop 2.0 ".to_string();
        assert_eq!(req.project_slug(), "contoso-shop-2-0");
    }

    #[test]
    fn provider_round_trips_through_str() {
        for provider in Provider::ALL {
            assert_eq!(provider.as_str().parse::<Provider>().unwrap(), provider);
        }
    }
}
