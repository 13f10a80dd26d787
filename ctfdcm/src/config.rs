//! Provider configuration resolution
//!
//! Values come from the `provider` block and fall back to the environment;
//! a non-null block value always wins, empty strings count as unset.

use std::fmt;
use thiserror::Error;
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

pub const ENV_URL: &str = "CTFD_URL";
pub const ENV_API_KEY: &str = "CTFD_API_KEY";
pub const ENV_USERNAME: &str = "CTFD_ADMIN_USERNAME";
pub const ENV_PASSWORD: &str = "CTFD_ADMIN_PASSWORD";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Unknown {attribute} value")]
    UnknownValue { attribute: &'static str },

    #[error("No CTFd url configured")]
    MissingUrl,

    #[error("No CTFd credentials configured")]
    MissingCredentials,
}

impl ConfigError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ConfigError::UnknownValue { attribute } => {
                let (summary, detail) = match *attribute {
                    "url" => (
                        "Unknown CTFD url.",
                        "The provider cannot guess where to reach the CTFd instance.",
                    ),
                    "api_key" => (
                        "Unknown CTFd API key.",
                        "The provider cannot create the CTFd API client as there is an unknown API key value.",
                    ),
                    "username" => (
                        "Unknown CTFd admin or service account username.",
                        "The provider cannot create the CTFd API client as there is an unknown username.",
                    ),
                    _ => (
                        "Unknown CTFd admin or service account password.",
                        "The provider cannot create the CTFd API client as there is an unknown password.",
                    ),
                };
                Diagnostic::error(summary, detail).with_attribute(AttributePath::new(attribute))
            }
            ConfigError::MissingUrl => Diagnostic::error(
                "CTFd provider configuration error",
                format!(
                    "The provider cannot create the CTFd API client as there is no url. Set it in the provider block or the {} environment variable.",
                    ENV_URL
                ),
            )
            .with_attribute(AttributePath::new("url")),
            ConfigError::MissingCredentials => Diagnostic::error(
                "CTFd provider configuration error",
                "The provider cannot create the CTFd API client as there is an invalid configuration. Expected either an API key, a nonce and session, or a username and password.",
            ),
        }
    }
}

/// Admin or service account used to open a session
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Fully resolved provider configuration
#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    pub url: String,
    pub api_key: Option<String>,
    /// Set only when both username and password are known
    pub credentials: Option<Credentials>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("credentials", &self.credentials)
            .finish()
    }
}

/// Resolves the provider block against the process environment
pub fn resolve(config: &DynamicValue) -> Result<ProviderConfig, Vec<ConfigError>> {
    resolve_with(config, |name| std::env::var(name).ok())
}

pub fn resolve_with<F>(config: &DynamicValue, env: F) -> Result<ProviderConfig, Vec<ConfigError>>
where
    F: Fn(&str) -> Option<String>,
{
    let attributes = [
        ("url", ENV_URL),
        ("api_key", ENV_API_KEY),
        ("username", ENV_USERNAME),
        ("password", ENV_PASSWORD),
    ];

    let mut errors = vec![];
    let mut values = Vec::with_capacity(attributes.len());
    for (attribute, env_name) in attributes {
        match config.get_dynamic(&AttributePath::new(attribute)) {
            Dynamic::Unknown => errors.push(ConfigError::UnknownValue { attribute }),
            Dynamic::String(value) => values.push(Some(value)),
            _ => values.push(env(env_name)),
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let mut values = values
        .into_iter()
        .map(|value| value.filter(|v| !v.is_empty()));
    let url = values.next().flatten();
    let api_key = values.next().flatten();
    let username = values.next().flatten();
    let password = values.next().flatten();

    let credentials = match (username, password) {
        (Some(username), Some(password)) => Some(Credentials { username, password }),
        _ => None,
    };

    if api_key.is_none() && credentials.is_none() {
        return Err(vec![ConfigError::MissingCredentials]);
    }
    let url = url.ok_or_else(|| vec![ConfigError::MissingUrl])?;

    Ok(ProviderConfig {
        url,
        api_key,
        credentials,
    })
}
