//! Request authentication: basic credentials or IAM bearer tokens.

use chrono::{DateTime, Duration, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::StoreAuth;
use crate::error::StoreError;

const IAM_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct IamTokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedToken")
            .field("value", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

/// Returns when a token issued at `now` with lifetime `expires_in` expires.
fn token_expiry(now: DateTime<Utc>, expires_in: i64) -> Result<DateTime<Utc>, StoreError> {
    Duration::try_seconds(expires_in)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| StoreError::AuthenticationFailed {
            message: format!("IAM token lifetime out of range: {expires_in}"),
        })
}

/// Produces authorization headers for store requests.
#[derive(Debug)]
pub(crate) struct Authenticator {
    auth: StoreAuth,
    token: Mutex<Option<CachedToken>>,
}

impl Authenticator {
    pub(crate) fn new(auth: StoreAuth) -> Self {
        Self {
            auth,
            token: Mutex::new(None),
        }
    }

    /// Returns the headers to attach to a store request, fetching a new IAM
    /// token when the cached one is missing or about to expire.
    pub(crate) async fn headers(&self, http: &reqwest::Client) -> Result<HeaderMap, StoreError> {
        let mut headers = HeaderMap::new();

        match &self.auth {
            StoreAuth::None => {}
            StoreAuth::Basic { username, password } => {
                let credentials = base64::Engine::encode(
                    &base64::engine::general_purpose::STANDARD,
                    format!("{username}:{password}"),
                );
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Basic {credentials}")).map_err(|_| {
                        StoreError::AuthenticationFailed {
                            message: "Invalid credentials".to_string(),
                        }
                    })?,
                );
            }
            StoreAuth::Iam { api_key, token_url } => {
                let token = self.bearer_token(http, api_key, token_url).await?;
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                        StoreError::AuthenticationFailed {
                            message: "Invalid token".to_string(),
                        }
                    })?,
                );
            }
        }

        Ok(headers)
    }

    async fn bearer_token(
        &self,
        http: &reqwest::Client,
        api_key: &str,
        token_url: &str,
    ) -> Result<String, StoreError> {
        let mut cached = self.token.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        debug!(token_url, "Requesting IAM access token");
        let response = Self::request_token(http, api_key, token_url).await?;
        let token = CachedToken {
            expires_at: token_expiry(now, response.expires_in)?,
            value: response.access_token,
        };
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn request_token(
        http: &reqwest::Client,
        api_key: &str,
        token_url: &str,
    ) -> Result<IamTokenResponse, StoreError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", IAM_GRANT_TYPE)
            .append_pair("apikey", api_key)
            .finish();

        let response = http
            .post(format!("{token_url}/identity/token"))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::AuthenticationFailed {
                message: format!(
                    "IAM token request failed with status {}: {}",
                    response.status().as_u16(),
                    response.text().await.unwrap_or_default()
                ),
            });
        }

        response
            .json()
            .await
            .map_err(|e| StoreError::AuthenticationFailed {
                message: format!("Malformed IAM token response: {e}"),
            })
    }
}
