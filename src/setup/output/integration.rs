//! Integration artifact generation.
//!
//! Emits a Rust source file wiring each provisioned provider into the
//! `oauth2` crate's client builder. Providers without credentials are
//! omitted entirely; fields the run did not obtain never appear as empty
//! placeholders.

use serde::Serialize;
use tera::{Context, Tera};

use crate::config::Provider;
use crate::error::Result;
use crate::setup::output::env_key;
use crate::setup::workflow::SetupResult;

pub const DEFAULT_ARTIFACT_FILE: &str = "oauth_clients.rs";

const ARTIFACT_TEMPLATE: &str = r#"//! OAuth client wiring generated by credforge. Do not edit by hand.
//!
//! Each constructor reads its credentials from the environment using the
//! names written to the credential file.

use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, ClientId, ClientSecret, RedirectUrl, TokenUrl};

{% for p in providers %}
/// {{ p.display_name }} client.
pub fn {{ p.fn_name }}_client() -> BasicClient {
    BasicClient::new(
        ClientId::new(std::env::var("{{ p.client_id_key }}").expect("{{ p.client_id_key }} must be set")),
{% if p.client_secret_key %}        Some(ClientSecret::new(
            std::env::var("{{ p.client_secret_key }}").expect("{{ p.client_secret_key }} must be set"),
        )),
{% else %}        None,
{% endif %}        AuthUrl::new("{{ p.auth_url }}".to_string()).expect("static URL"),
        Some(TokenUrl::new("{{ p.token_url }}".to_string()).expect("static URL")),
    )
    .set_redirect_uri(RedirectUrl::new("{{ p.redirect_uri }}".to_string()).expect("static URL"))
}
{% endfor %}"#;

#[derive(Serialize)]
struct ProviderBlock {
    fn_name: String,
    display_name: String,
    client_id_key: String,
    client_secret_key: Option<String>,
    auth_url: String,
    token_url: String,
    redirect_uri: String,
}

fn endpoints(provider: Provider) -> (&'static str, &'static str, &'static str) {
    match provider {
        Provider::CloudOauth => (
            "https://accounts.cloud.example/o/oauth2/v2/auth",
            "https://oauth2.cloud.example/token",
            "signin-oauth",
        ),
        Provider::SocialGraph => (
            "https://www.social.example/v19.0/dialog/oauth",
            "https://graph.api.example.com/v19.0/oauth/access_token",
            "signin-social",
        ),
        Provider::MobilePlatform => (
            "https://signin.mobile.example/auth/authorize",
            "https://signin.mobile.example/auth/token",
            "signin-mobile",
        ),
        Provider::DirectoryTenant => (
            "https://login.directory.example/common/oauth2/v2.0/authorize",
            "https://login.directory.example/common/oauth2/v2.0/token",
            "signin-oidc",
        ),
    }
}

/// Render one code block per successfully provisioned provider.
pub fn generate_integration_artifact(domain: &str, results: &[SetupResult]) -> Result<String> {
    let mut providers = Vec::new();
    for result in results {
        let Some(credentials) = result.credentials.as_ref().filter(|_| result.provisioned()) else {
            continue;
        };
        let (auth_url, token_url, redirect_path) = endpoints(result.provider);

        let client_id_key = if credentials.get("client_id").is_some() {
            env_key(result.provider, "client_id")
        } else if credentials.get("service_id").is_some() {
            // The mobile platform uses the service identifier as client id
            env_key(result.provider, "service_id")
        } else {
            continue;
        };

        providers.push(ProviderBlock {
            fn_name: result.provider.as_str().replace('-', "_"),
            display_name: result.provider.display_name().to_string(),
            client_id_key,
            client_secret_key: credentials
                .get("client_secret")
                .map(|_| env_key(result.provider, "client_secret")),
            auth_url: auth_url.to_string(),
            token_url: token_url.to_string(),
            redirect_uri: format!("https://{domain}/{redirect_path}"),
        });
    }

    let mut tera = Tera::default();
    tera.add_raw_template("oauth_clients.rs", ARTIFACT_TEMPLATE)?;

    let mut context = Context::new();
    context.insert("providers", &providers);
    Ok(tera.render("oauth_clients.rs", &context)?)
}
