use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("CTFd rejected the request: {0}")]
    Rejected(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid identifier '{0}', expected an integer")]
    InvalidId(String),

    #[error("CSRF nonce not found in CTFd page")]
    MissingNonce,

    #[error("Authentication failed")]
    AuthError,
}
