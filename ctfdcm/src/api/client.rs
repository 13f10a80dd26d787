use regex::Regex;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::RwLock;
use url::Url;

use super::common::{error_message, ApiResponse};
use super::error::ApiError;

const NONCE_PATTERN: &str = r#"csrfNonce': "([a-f0-9]+)""#;
const CSRF_HEADER: &str = "CSRF-Token";

/// CTFd API client
///
/// Holds the session cookie jar and the CSRF nonce scraped from the CTFd
/// login page. Cloning is cheap and shares the session.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    nonce: RwLock<String>,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bounds connection setup only; requests themselves are not timed out
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl Client {
    /// Opens a session against the CTFd instance at `endpoint`
    pub async fn connect(endpoint: &str, api_key: Option<String>) -> Result<Self, ApiError> {
        Self::connect_with_config(endpoint, api_key, ClientConfig::default()).await
    }

    /// Opens a session with a custom configuration
    ///
    /// Fetches the login page once to obtain the session cookie and the
    /// CSRF nonce every later request carries.
    #[tracing::instrument(skip(api_key, config))]
    pub async fn connect_with_config(
        endpoint: &str,
        api_key: Option<String>,
        config: ClientConfig,
    ) -> Result<Self, ApiError> {
        let parsed =
            Url::parse(endpoint).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", endpoint, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "{}: unsupported scheme '{}'",
                endpoint,
                parsed.scheme()
            )));
        }

        let http_client = reqwest::Client::builder()
            .cookie_store(true)
            .connect_timeout(config.connect_timeout)
            .build()?;

        let client = Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: endpoint.trim_end_matches('/').to_string(),
                api_key: api_key.filter(|key| !key.is_empty()),
                nonce: RwLock::new(String::new()),
            }),
        };

        client.refresh_nonce().await?;
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    async fn refresh_nonce(&self) -> Result<(), ApiError> {
        let url = format!("{}/login", self.inner.base_url);
        tracing::debug!("Fetching CSRF nonce from: {}", url);

        let response = self.inner.http_client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::ApiError {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let nonce = extract_nonce(&body)?;
        *self.inner.nonce.write().await = nonce;
        Ok(())
    }

    /// Authenticates the session with an admin or service account
    ///
    /// CTFd rotates the nonce on login, so it is re-read from the page the
    /// login redirects to.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let url = format!("{}/login", self.inner.base_url);
        let nonce = self.inner.nonce.read().await.clone();
        let form = [
            ("name", username),
            ("password", password),
            ("_submit", "Submit"),
            ("nonce", nonce.as_str()),
        ];

        let response = self.inner.http_client.post(&url).form(&form).send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::AuthError);
        }

        // A rejected login renders the login form again instead of redirecting
        let landed_on_login = response
            .url()
            .path()
            .trim_end_matches('/')
            .ends_with("/login");
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::ApiError {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        if landed_on_login {
            return Err(ApiError::AuthError);
        }

        let nonce = extract_nonce(&body)?;
        *self.inner.nonce.write().await = nonce;
        tracing::info!("Logged in to CTFd");
        Ok(())
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.inner.base_url, path);
        tracing::debug!("{} request to: {}", method, url);

        let nonce = self.inner.nonce.read().await.clone();
        let mut builder = self
            .inner
            .http_client
            .request(method, url)
            .header(CSRF_HEADER, nonce);
        if let Some(api_key) = &self.inner.api_key {
            builder = builder.header(AUTHORIZATION, format!("Token {}", api_key));
        }
        builder
    }

    /// Execute a GET request, failing when the envelope carries no data
    #[tracing::instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let builder = self.request(Method::GET, path).await;
        self.execute(builder)
            .await?
            .ok_or_else(|| ApiError::ParseError(format!("response from {} has no data", path)))
    }

    /// Execute a GET request whose data may legitimately be null
    #[tracing::instrument(skip(self))]
    pub async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ApiError> {
        let builder = self.request(Method::GET, path).await;
        self.execute(builder).await
    }

    /// Execute a POST request with a JSON body
    #[tracing::instrument(skip(self, body))]
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let builder = self.request(Method::POST, path).await.json(body);
        self.execute(builder)
            .await?
            .ok_or_else(|| ApiError::ParseError(format!("response from {} has no data", path)))
    }

    /// Execute a PATCH request with a JSON body
    #[tracing::instrument(skip(self, body))]
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let builder = self.request(Method::PATCH, path).await.json(body);
        self.execute(builder)
            .await?
            .ok_or_else(|| ApiError::ParseError(format!("response from {} has no data", path)))
    }

    /// Execute a DELETE request, ignoring any returned data
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let builder = self.request(Method::DELETE, path).await;
        self.execute::<serde_json::Value>(builder).await.map(|_| ())
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<Option<T>, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        tracing::debug!("API response ({}): {}", status, text);

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::AuthError);
        }

        if !status.is_success() {
            tracing::error!("API error response: {}", text);
            return Err(ApiError::ApiError {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        if text.trim().is_empty() {
            return Ok(None);
        }

        let envelope: ApiResponse<T> = serde_json::from_str(&text).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })?;

        if !envelope.success {
            return Err(ApiError::Rejected(envelope.failure_message()));
        }

        Ok(envelope.data)
    }

    /// Challenge operations
    pub fn challenges(&self) -> crate::api::challenges::ChallengesApi<'_> {
        crate::api::challenges::ChallengesApi::new(self)
    }

    /// Tag operations
    pub fn tags(&self) -> crate::api::tags::TagsApi<'_> {
        crate::api::tags::TagsApi::new(self)
    }

    /// Topic operations
    pub fn topics(&self) -> crate::api::topics::TopicsApi<'_> {
        crate::api::topics::TopicsApi::new(self)
    }

    /// Chall-Manager instance operations
    pub fn instances(&self) -> crate::api::instances::InstancesApi<'_> {
        crate::api::instances::InstancesApi::new(self)
    }
}

fn extract_nonce(page: &str) -> Result<String, ApiError> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(NONCE_PATTERN))
        .as_ref()
        .map_err(|e| ApiError::ParseError(e.to_string()))?;
    pattern
        .captures(page)
        .and_then(|captures| captures.get(1))
        .map(|nonce| nonce.as_str().to_string())
        .ok_or(ApiError::MissingNonce)
}
