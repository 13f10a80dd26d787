//! Test helpers for the CTFd API

use mockito::ServerGuard;

pub const TEST_NONCE: &str = "0a1b2c3d4e5f";
pub const TEST_API_KEY: &str = "ctfd_test_key";

/// Minimal CTFd page embedding a CSRF nonce the way CTFd templates do
pub fn login_page(nonce: &str) -> String {
    format!(
        r#"<html><script>var init = {{'urlRoot': "", 'csrfNonce': "{}", 'userMode': "users"}}</script></html>"#,
        nonce
    )
}

/// Client connected to `server` with an API key; the login page mock only lives for the handshake
pub async fn connected_client(server: &mut ServerGuard) -> super::Client {
    let _login = server
        .mock("GET", "/login")
        .with_body(login_page(TEST_NONCE))
        .create_async()
        .await;

    super::Client::connect(&server.url(), Some(TEST_API_KEY.to_string()))
        .await
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.connect_timeout.as_secs(), 10);
    }

    #[test]
    fn test_api_query_params() {
        use common::ApiQueryParams;

        let query = ApiQueryParams::new()
            .add("challengeId", 12)
            .add("sourceId", "team a")
            .to_query_string();

        assert_eq!(query, "?challengeId=12&sourceId=team%20a");
        assert_eq!(ApiQueryParams::new().to_query_string(), "");
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(common::parse_id("42").unwrap(), 42);
        assert!(matches!(
            common::parse_id("forty-two"),
            Err(ApiError::InvalidId(_))
        ));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            common::error_message(r#"{"message":"Forbidden"}"#),
            "Forbidden"
        );
        assert!(common::error_message(r#"{"success":false,"errors":{"name":["Required"]}}"#)
            .contains("Required"));
        assert_eq!(common::error_message("  plain text  "), "plain text");
    }

    #[test]
    fn test_api_error_formatting() {
        let error = ApiError::ApiError {
            status: 400,
            message: "Bad Request".to_string(),
        };

        let error_str = error.to_string();
        assert!(error_str.contains("HTTP 400"));
        assert!(error_str.contains("Bad Request"));
    }
}
