//! HTTP client for the storefront backend.
//!
//! Covers the password verification exchange used by the admin login and
//! the bearer-authenticated JSON reads used by the data-fetching glue.

use std::time::Duration;

use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Path of the password verification endpoint.
pub const AUTH_PATH: &str = "/api/auth";

/// Default HTTP request timeout in seconds.
/// Bounds how long a login can hang on an unresponsive backend.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Serialize)]
struct PasswordRequest<'a> {
    password: &'a str,
}

/// Body returned by the verification endpoint on a 2xx status.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(rename = "accessToken", default)]
    pub access_token: Option<String>,
}

impl AuthResponse {
    /// The credential, if the server both flagged success and sent a
    /// non-empty token.
    pub fn into_credential(self) -> Option<String> {
        match self.access_token {
            Some(token) if self.success && !token.is_empty() => Some(token),
            _ => None,
        }
    }
}

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// New client carrying `token`, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send `password` to the verification endpoint.
    ///
    /// A non-2xx status is an error regardless of the body. A 2xx body that
    /// is not valid JSON surfaces as `NetworkError`.
    pub async fn verify_password(&self, password: &str) -> Result<AuthResponse, ApiError> {
        let url = self.url(AUTH_PATH);
        debug!(url = %url, "Verifying admin password");

        let response = self
            .client
            .post(&url)
            .json(&PasswordRequest { password })
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Ok(response.json().await?)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// GET `path` and decode the JSON body, backing off on 429.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut request = self
                .client
                .get(&url)
                .header(header::ACCEPT, "application/json");
            if let Some(ref token) = self.token {
                request = request.bearer_auth(token);
            }

            match Self::check_response(request.send().await?).await {
                Ok(response) => return Ok(response.json().await?),
                Err(ApiError::RateLimited) if retries < MAX_RATE_LIMIT_RETRIES => {
                    retries += 1;
                    warn!(url = %url, retry = retries, backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
