//! Credential serialization.
//!
//! The writer is a pure function of the aggregated results: ordered maps
//! throughout, no timestamps, so the same results always produce
//! byte-identical files. Key naming is `{PROVIDER}_{FIELD}` uppercased,
//! which the companion parser reverses for automation consumers.

pub mod integration;

pub use integration::generate_integration_artifact;

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::{OutputFormat, Provider, ProvisioningRequest};
use crate::error::{Result, SetupError};
use crate::setup::workflow::{ProviderCredentials, SetupResult};

/// Serialized key for one credential field, e.g. `CLOUD_OAUTH_CLIENT_ID`.
pub fn env_key(provider: Provider, field: &str) -> String {
    format!("{}_{}", provider.env_prefix(), field.to_uppercase())
}

#[derive(Serialize)]
struct CredentialDocument {
    metadata: BTreeMap<String, String>,
    credentials: BTreeMap<String, String>,
    providers: BTreeMap<String, ProviderSummary>,
}

#[derive(Serialize)]
struct ProviderSummary {
    status: String,
    fields: BTreeMap<String, String>,
    manual_steps: Vec<String>,
}

pub struct CredentialStoreWriter;

impl Default for CredentialStoreWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStoreWriter {
    pub fn new() -> Self {
        Self
    }

    /// Render the credential file content for the chosen format.
    pub fn render(
        &self,
        request: &ProvisioningRequest,
        results: &[SetupResult],
    ) -> Result<String> {
        match request.format {
            OutputFormat::Env => Ok(Self::render_env(results)),
            OutputFormat::Json => {
                let doc = Self::document(request, results);
                let mut json = serde_json::to_string_pretty(&doc)?;
                json.push('\n');
                Ok(json)
            }
            OutputFormat::Yaml => Ok(serde_yaml::to_string(&Self::document(request, results))?),
        }
    }

    /// Render and persist, refusing to clobber an existing file unless the
    /// request carries `--force`.
    pub fn write(
        &self,
        request: &ProvisioningRequest,
        results: &[SetupResult],
        path: &Path,
    ) -> Result<()> {
        if path.exists() && !request.force {
            return Err(SetupError::configuration(format!(
                "'{}' already exists; pass --force to overwrite it",
                path.display()
            )));
        }
        let content = self.render(request, results)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn render_env(results: &[SetupResult]) -> String {
        let mut lines = String::new();
        for result in results {
            let Some(credentials) = &result.credentials else {
                continue;
            };
            for (field, value) in &credentials.fields {
                lines.push_str(&env_key(result.provider, field));
                lines.push('=');
                lines.push_str(value);
                lines.push('\n');
            }
        }
        lines
    }

    fn document(request: &ProvisioningRequest, results: &[SetupResult]) -> CredentialDocument {
        let mut metadata = BTreeMap::new();
        metadata.insert("project".to_string(), request.project_name.clone());
        metadata.insert("domain".to_string(), request.domain.clone());
        metadata.insert("generator".to_string(), "credforge".to_string());

        let mut credentials = BTreeMap::new();
        let mut providers = BTreeMap::new();
        for result in results {
            let fields = result
                .credentials
                .as_ref()
                .map(|c| c.fields.clone())
                .unwrap_or_default();
            for (field, value) in &fields {
                credentials.insert(env_key(result.provider, field), value.clone());
            }

            let status = if result.provisioned() {
                "provisioned"
            } else if result.needs_manual_setup() {
                "manual-required"
            } else {
                "failed"
            };
            providers.insert(
                result.provider.as_str().to_string(),
                ProviderSummary {
                    status: status.to_string(),
                    fields,
                    manual_steps: result.manual_steps.clone(),
                },
            );
        }

        CredentialDocument {
            metadata,
            credentials,
            providers,
        }
    }
}

/// Reverse of the env rendering: reconstruct per-provider field sets from
/// `{PROVIDER}_{FIELD}=value` lines. Unknown prefixes and malformed lines
/// are ignored.
pub fn parse_env_credentials(content: &str) -> Vec<ProviderCredentials> {
    let mut by_provider: BTreeMap<Provider, ProviderCredentials> = BTreeMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        for provider in Provider::ALL {
            let prefix = format!("{}_", provider.env_prefix());
            if let Some(field) = key.strip_prefix(&prefix) {
                by_provider
                    .entry(provider)
                    .or_insert_with(|| ProviderCredentials::new(provider))
                    .set(&field.to_lowercase(), value);
                break;
            }
        }
    }

    by_provider.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn request(format: OutputFormat) -> ProvisioningRequest {
        ProvisioningRequest {
            project_name: "Demo Shop".to_string(),
            domain: "demo.example.com".to_string(),
            providers: vec![Provider::CloudOauth, Provider::SocialGraph],
            dry_run: false,
            interactive: false,
            force: false,
            verbose: false,
            format,
            output_path: None,
        }
    }

    fn results() -> Vec<SetupResult> {
        let mut cloud = SetupResult::new(Provider::CloudOauth);
        cloud.credentials = Some(
            ProviderCredentials::new(Provider::CloudOauth)
                .with_field("client_id", "12345-abc.apps.cloud.example")
                .with_field("client_secret", "cloud-secret")
                .with_field("project_id", "demo-shop"),
        );

        let mut social = SetupResult::new(Provider::SocialGraph);
        social.credentials = Some(
            ProviderCredentials::new(Provider::SocialGraph)
                .with_field("client_id", "251234567890123")
                .with_field("client_secret", "graph-secret"),
        );

        let mut mobile = SetupResult::new(Provider::MobilePlatform);
        mobile.manual_steps = vec!["Register the app in the portal.".to_string()];

        vec![cloud, social, mobile]
    }

    #[test]
    fn env_rendering_uses_provider_prefixed_keys() {
        let writer = CredentialStoreWriter::new();
        let content = writer.render(&request(OutputFormat::Env), &results()).unwrap();

        assert!(content.contains("CLOUD_OAUTH_CLIENT_ID=12345-abc.apps.cloud.example"));
        assert!(content.contains("SOCIAL_GRAPH_CLIENT_SECRET=graph-secret"));
        // Providers without credentials contribute no lines
        assert!(!content.contains("MOBILE_PLATFORM"));
    }

    #[test]
    fn rendering_is_byte_identical_across_calls() {
        let writer = CredentialStoreWriter::new();
        for format in [OutputFormat::Env, OutputFormat::Json, OutputFormat::Yaml] {
            let req = request(format);
            let first = writer.render(&req, &results()).unwrap();
            let second = writer.render(&req, &results()).unwrap();
            assert_eq!(first.as_bytes(), second.as_bytes());
        }
    }

    #[test]
    fn env_round_trip_reconstructs_field_sets() {
        let writer = CredentialStoreWriter::new();
        let content = writer.render(&request(OutputFormat::Env), &results()).unwrap();

        let parsed = parse_env_credentials(&content);
        assert_eq!(parsed.len(), 2);

        let cloud = parsed.iter().find(|c| c.provider == Provider::CloudOauth).unwrap();
        assert_eq!(cloud.get("client_id"), Some("12345-abc.apps.cloud.example"));
        assert_eq!(cloud.get("client_secret"), Some("cloud-secret"));
        assert_eq!(cloud.get("project_id"), Some("demo-shop"));

        let social = parsed.iter().find(|c| c.provider == Provider::SocialGraph).unwrap();
        assert_eq!(social.fields.len(), 2);
    }

    #[test]
    fn structured_documents_mark_manual_providers() {
        let writer = CredentialStoreWriter::new();
        let content = writer.render(&request(OutputFormat::Json), &results()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();

        assert_eq!(value["metadata"]["domain"], "demo.example.com");
        assert_eq!(value["providers"]["mobile-platform"]["status"], "manual-required");
        assert_eq!(value["providers"]["cloud-oauth"]["status"], "provisioned");
        assert_eq!(
            value["credentials"]["SOCIAL_GRAPH_CLIENT_ID"],
            "251234567890123"
        );
    }

    #[test]
    fn write_refuses_existing_file_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join(".env.oauth");
        std::fs::write(&path, "existing").unwrap();

        let writer = CredentialStoreWriter::new();
        let err = writer
            .write(&request(OutputFormat::Env), &results(), &path)
            .unwrap_err();
        assert!(matches!(err, SetupError::Configuration(_)));

        let mut forced = request(OutputFormat::Env);
        forced.force = true;
        writer.write(&forced, &results(), &path).unwrap();
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .contains("CLOUD_OAUTH_CLIENT_ID"));
    }
}
