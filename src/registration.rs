/**
 * Client for the registration service signup endpoint
 */
use crate::error::Result;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, info};

/// Path of the signup endpoint below the service base URL
pub const SIGNUP_PATH: &str = "/api/v1/signup";

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct RegistrationClient {
    http: reqwest::Client,
    base_url: String,
}

impl RegistrationClient {
    /// Client for the service at `base_url`.
    ///
    /// Test clusters serve the route with self-signed certificates, so
    /// certificate verification is disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn signup_url(&self) -> String {
        format!("{}{SIGNUP_PATH}", self.base_url)
    }

    /// Initiate a signup for the identity in `token`.
    ///
    /// The response status is returned as is: a rejected signup is an outcome
    /// for the caller to assert on, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error only when the request cannot be sent
    pub async fn register(&self, token: &str) -> Result<StatusCode> {
        let url = self.signup_url();
        debug!("📝 POST {}", url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        let status = response.status();
        info!("📝 Signup request answered with {}", status);
        Ok(status)
    }
}

/// One-shot signup against `endpoint`
///
/// # Errors
///
/// Returns an error when the client cannot be built or the request cannot be sent
pub async fn register(endpoint: &str, token: &str) -> Result<StatusCode> {
    RegistrationClient::new(endpoint)?.register(token).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    async fn signup(headers: HeaderMap) -> StatusCode {
        let bearer = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let json = headers
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            == Some("application/json");
        match (bearer, json) {
            ("Bearer good-token", true) => StatusCode::ACCEPTED,
            (_, true) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        }
    }

    async fn start_server() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let app = Router::new().route(SIGNUP_PATH, post(signup));
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        addr
    }

    #[test]
    fn test_signup_url_trims_trailing_slash() {
        let client = RegistrationClient::new("https://registration.example.com/").expect("client");
        assert_eq!(client.signup_url(), "https://registration.example.com/api/v1/signup");
    }

    #[tokio::test]
    async fn test_register_sends_bearer_token() {
        let addr = start_server().await;
        let status = register(&format!("http://{addr}"), "good-token")
            .await
            .expect("request sent");
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_rejection_is_returned_not_raised() {
        let addr = start_server().await;
        let client = RegistrationClient::new(&format!("http://{addr}")).expect("client");
        let status = client.register("bad-token").await.expect("request sent");
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);
        assert!(register(&format!("http://{addr}"), "good-token").await.is_err());
    }
}
