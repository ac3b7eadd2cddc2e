//! HTTP client for the Opsview REST API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};
use url::Url;

use opsview_api::{LoginRequest, LoginResponse, ServerInfo};

use crate::error::{ClientError, Result};
use crate::tls::TlsVerify;
use crate::traits::{OpsviewApi, Params};

const USERNAME_HEADER: &str = "X-Opsview-Username";
const TOKEN_HEADER: &str = "X-Opsview-Token";

/// Connection settings for [`HttpClient::connect`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the Opsview server, e.g. `https://opsview.example.com`
    pub endpoint: String,
    pub username: String,
    /// Used to log in when no token is given
    pub password: Option<String>,
    /// Existing session token, skips the login call
    pub token: Option<String>,
    pub verify: TlsVerify,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: username.into(),
            password: None,
            token: None,
            verify: TlsVerify::default(),
            timeout: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_verify(mut self, verify: TlsVerify) -> Self {
        self.verify = verify;
        self
    }
}

/// HTTP client for communicating with an Opsview server
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
    username: String,
    token: Option<String>,
    version: Option<String>,
}

impl HttpClient {
    /// Create an unauthenticated client
    ///
    /// # Errors
    /// Returns an error if the endpoint is not a valid URL.
    ///
    /// # Example
    /// ```no_run
    /// use opsview_client::HttpClient;
    ///
    /// let client = HttpClient::new("https://opsview.example.com", "admin")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(endpoint: impl AsRef<str>, username: impl Into<String>) -> Result<Self> {
        Self::with_client(endpoint, username, Client::new())
    }

    /// Create an unauthenticated client with a custom `reqwest::Client`
    ///
    /// # Errors
    /// Returns an error if the endpoint is not a valid URL.
    pub fn with_client(
        endpoint: impl AsRef<str>,
        username: impl Into<String>,
        client: Client,
    ) -> Result<Self> {
        Ok(Self {
            client,
            base_url: rest_base(endpoint.as_ref())?,
            username: username.into(),
            token: None,
            version: None,
        })
    }

    /// Build the transport, establish a session and read the server version
    ///
    /// A configured token is used as-is; otherwise the password is exchanged
    /// for one via `rest/login`.
    ///
    /// # Errors
    /// Returns an error if TLS setup fails, no credentials are available, or
    /// the login or info request fails.
    ///
    /// # Example
    /// ```no_run
    /// # use opsview_client::{ClientConfig, HttpClient};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = ClientConfig::new("https://opsview.example.com", "admin")
    ///     .with_password("secret");
    /// let client = HttpClient::connect(&config).await?;
    /// println!("Opsview {}", client.version().unwrap_or("unknown"));
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(config), fields(endpoint = %config.endpoint, username = %config.username))]
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        debug!(verify = %config.verify, "building transport");
        let builder = config.verify.apply(Client::builder().timeout(config.timeout))?;
        let mut client = Self::with_client(&config.endpoint, &config.username, builder.build()?)?;

        let token = match (&config.token, &config.password) {
            (Some(token), _) => token.clone(),
            (None, Some(password)) => client.login(password).await?,
            (None, None) => {
                return Err(ClientError::Auth(
                    "either a token or a password is required".to_string(),
                ));
            }
        };
        client.token = Some(token);

        let info = client.info().await?;
        info!(version = %info.opsview_version, "connected to Opsview");
        client.version = Some(info.opsview_version);

        Ok(client)
    }

    /// Use an existing session token
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Session token, once established
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Opsview server version, once connected
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Exchange a password for a session token
    ///
    /// # Errors
    /// Returns an error if the request fails or the server rejects the
    /// credentials.
    pub async fn login(&self, password: &str) -> Result<String> {
        let body = serde_json::to_value(LoginRequest {
            username: self.username.clone(),
            password: password.to_string(),
        })?;
        let response = self.request(Method::POST, "login", &[], Some(body)).await?;
        let login: LoginResponse = serde_json::from_value(response)?;
        Ok(login.token)
    }

    /// Read server information
    ///
    /// # Errors
    /// Returns an error if the request fails or the response is malformed.
    pub async fn info(&self) -> Result<ServerInfo> {
        let response = self.request(Method::GET, "info", &[], None).await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Build a full URL from a resource name and query parameters
    fn url(&self, resource: &str, params: &Params<'_>) -> Result<Url> {
        let mut url = self.base_url.join(resource.trim_start_matches('/'))?;
        if !params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Perform a request and decode the JSON body, `Null` when empty
    async fn request(
        &self,
        method: Method,
        resource: &str,
        params: &Params<'_>,
        body: Option<Value>,
    ) -> Result<Value> {
        let url = self.url(resource, params)?;
        debug!(%method, %url, "opsview request");

        let mut request = self
            .client
            .request(method, url)
            .header(USERNAME_HEADER, &self.username);
        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, message });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl OpsviewApi for HttpClient {
    async fn get(&self, resource: &str, params: &Params<'_>) -> Result<Value> {
        self.request(Method::GET, resource, params, None).await
    }

    async fn post(&self, resource: &str, params: &Params<'_>, body: Value) -> Result<Value> {
        self.request(Method::POST, resource, params, Some(body)).await
    }

    async fn delete(&self, resource: &str, params: &Params<'_>) -> Result<Value> {
        self.request(Method::DELETE, resource, params, None).await
    }

    async fn reload(&self, asynchronous: bool) -> Result<()> {
        let params: Vec<(&str, String)> = if asynchronous {
            vec![("asynchronous", "1".to_string())]
        } else {
            Vec::new()
        };
        self.request(Method::POST, "reload", &params, None).await?;
        Ok(())
    }

    async fn reload_status(&self) -> Result<Map<String, Value>> {
        match self.request(Method::GET, "reload", &[], None).await? {
            Value::Object(map) => Ok(map),
            other => Err(ClientError::InvalidResponse(format!(
                "expected reload status object, got {other}"
            ))),
        }
    }
}

/// Resolve `<endpoint>/rest/` regardless of a trailing slash on the endpoint
fn rest_base(endpoint: &str) -> Result<Url> {
    let mut base = Url::parse(endpoint)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join("rest/")?)
}
