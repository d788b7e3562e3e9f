//! HTTP client for the social-graph provider's app-management API.
//!
//! The workflow talks to [`GraphApi`] rather than to `reqwest` directly, so
//! tests script responses the same way they script CLI invocations.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Mutex;
use url::Url;

use crate::config::Provider;
use crate::error::{Result, SetupError};

/// Environment variable holding the developer access token for the
/// social-graph API. Absence fails only this provider's authentication.
pub const ACCESS_TOKEN_ENV: &str = "SOCIAL_GRAPH_ACCESS_TOKEN";

pub const DEFAULT_BASE_URL: &str = "https://graph.api.example.com/v19.0";

#[derive(Debug, Clone, Deserialize)]
pub struct GraphAccount {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphApp {
    pub id: String,
    pub name: String,
}

#[async_trait]
pub trait GraphApi: Send + Sync {
    /// Validate the configured developer token and identify the account.
    async fn validate_token(&self) -> Result<GraphAccount>;

    /// Apps already registered under the developer account.
    async fn list_apps(&self) -> Result<Vec<GraphApp>>;

    /// Register a new app and return it.
    async fn create_app(&self, name: &str) -> Result<GraphApp>;

    /// Fetch the app secret for an app id.
    async fn app_secret(&self, app_id: &str) -> Result<String>;

    /// Set OAuth redirect URIs and the served domain on the app.
    async fn configure_oauth(&self, app_id: &str, redirect_uri: &str, domain: &str) -> Result<()>;
}

/// Production implementation over the provider's REST surface.
pub struct HttpGraphApi {
    client: reqwest::Client,
    base_url: Url,
    access_token: Option<String>,
}

impl HttpGraphApi {
    pub fn new(base_url: &str, access_token: Option<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| SetupError::configuration(format!("invalid graph API base URL: {e}")))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            access_token,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(DEFAULT_BASE_URL, std::env::var(ACCESS_TOKEN_ENV).ok())
    }

    fn token(&self) -> Result<&str> {
        self.access_token.as_deref().ok_or_else(|| {
            SetupError::authentication(
                Provider::SocialGraph,
                format!("{ACCESS_TOKEN_ENV} is not set"),
            )
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| SetupError::external_api(format!("invalid graph API path '{path}': {e}")))
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<serde_json::Value> {
        let token = self.token()?.to_string();
        let url = self.endpoint(path)?;
        let response = self
            .client
            .get(url)
            .query(query)
            .query(&[("access_token", token.as_str())])
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn post_json(&self, path: &str, form: &[(&str, &str)]) -> Result<serde_json::Value> {
        let token = self.token()?.to_string();
        let url = self.endpoint(path)?;
        let response = self
            .client
            .post(url)
            .query(&[("access_token", token.as_str())])
            .form(form)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn read_json(response: reqwest::Response) -> Result<serde_json::Value> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SetupError::external_api(format!(
                "graph API returned {status}: {body}"
            )));
        }
        serde_json::from_str(&body)
            .map_err(|e| SetupError::external_api(format!("malformed graph API response: {e}")))
    }
}

#[async_trait]
impl GraphApi for HttpGraphApi {
    async fn validate_token(&self) -> Result<GraphAccount> {
        let value = self.get_json("me", &[("fields", "id,name")]).await?;
        serde_json::from_value(value)
            .map_err(|e| SetupError::external_api(format!("unexpected account shape: {e}")))
    }

    async fn list_apps(&self) -> Result<Vec<GraphApp>> {
        let value = self.get_json("me/apps", &[("fields", "id,name")]).await?;
        let apps = value
            .get("data")
            .cloned()
            .unwrap_or(serde_json::Value::Array(vec![]));
        serde_json::from_value(apps)
            .map_err(|e| SetupError::external_api(format!("unexpected app list shape: {e}")))
    }

    async fn create_app(&self, name: &str) -> Result<GraphApp> {
        let value = self.post_json("me/apps", &[("name", name)]).await?;
        serde_json::from_value(value)
            .map_err(|e| SetupError::external_api(format!("unexpected app shape: {e}")))
    }

    async fn app_secret(&self, app_id: &str) -> Result<String> {
        let value = self
            .get_json(app_id, &[("fields", "app_secret")])
            .await?;
        value
            .get("app_secret")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| SetupError::external_api("app secret missing from response"))
    }

    async fn configure_oauth(&self, app_id: &str, redirect_uri: &str, domain: &str) -> Result<()> {
        self.post_json(
            &format!("{app_id}/settings"),
            &[
                ("oauth_redirect_uris", redirect_uri),
                ("app_domains", domain),
            ],
        )
        .await?;
        Ok(())
    }
}

/// Scriptable implementation for tests and offline runs.
#[derive(Default)]
pub struct MockGraphApi {
    pub account: Option<GraphAccount>,
    pub existing_apps: Mutex<Vec<GraphApp>>,
    pub secret: Option<String>,
    pub created: Mutex<Vec<String>>,
    pub configured: Mutex<Vec<(String, String)>>,
    pub call_count: Mutex<usize>,
}

impl MockGraphApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn authenticated(name: &str) -> Self {
        Self {
            account: Some(GraphAccount {
                id: "100000000000001".to_string(),
                name: name.to_string(),
            }),
            secret: Some("shhh-mock-secret".to_string()),
            ..Self::default()
        }
    }

    pub fn with_existing_app(self, id: &str, name: &str) -> Self {
        self.existing_apps.lock().unwrap().push(GraphApp {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    fn tick(&self) {
        *self.call_count.lock().unwrap() += 1;
    }

    pub fn calls(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl GraphApi for MockGraphApi {
    async fn validate_token(&self) -> Result<GraphAccount> {
        self.tick();
        self.account.clone().ok_or_else(|| {
            SetupError::authentication(Provider::SocialGraph, "mock token rejected")
        })
    }

    async fn list_apps(&self) -> Result<Vec<GraphApp>> {
        self.tick();
        Ok(self.existing_apps.lock().unwrap().clone())
    }

    async fn create_app(&self, name: &str) -> Result<GraphApp> {
        self.tick();
        self.created.lock().unwrap().push(name.to_string());
        Ok(GraphApp {
            id: "251234567890123".to_string(),
            name: name.to_string(),
        })
    }

    async fn app_secret(&self, _app_id: &str) -> Result<String> {
        self.tick();
        self.secret
            .clone()
            .ok_or_else(|| SetupError::external_api("mock has no secret"))
    }

    async fn configure_oauth(&self, app_id: &str, redirect_uri: &str, _domain: &str) -> Result<()> {
        self.tick();
        self.configured
            .lock()
            .unwrap()
            .push((app_id.to_string(), redirect_uri.to_string()));
        Ok(())
    }
}
