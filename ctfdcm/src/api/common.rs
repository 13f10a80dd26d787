//! Common types and utilities for the CTFd API

use serde::Deserialize;

use super::error::ApiError;

/// Envelope wrapping every CTFd API response
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_success() -> bool {
    true
}

impl<T> ApiResponse<T> {
    /// Human readable reason for a failed envelope
    pub fn failure_message(&self) -> String {
        if let Some(message) = &self.message {
            return message.clone();
        }
        match &self.errors {
            Some(errors) => errors.to_string(),
            None => "request was not successful".to_string(),
        }
    }
}

/// Extracts the server's explanation from an error body, falling back to the raw text
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiResponse<serde_json::Value>>(body) {
        Ok(envelope) if envelope.message.is_some() || envelope.errors.is_some() => {
            envelope.failure_message()
        }
        _ => body.trim().to_string(),
    }
}

/// CTFd identifiers are integers while Terraform carries them as strings
pub fn parse_id(id: &str) -> Result<i64, ApiError> {
    id.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::InvalidId(id.to_string()))
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}

/// Chall-Manager reports identifiers either as JSON strings or numbers
pub mod string_or_int {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StringOrInt {
            String(String),
            Int(i64),
        }

        Ok(
            Option::<StringOrInt>::deserialize(deserializer)?.map(|value| match value {
                StringOrInt::String(s) => s,
                StringOrInt::Int(i) => i.to_string(),
            }),
        )
    }
}
