//! Configuration types for the document store client.

use std::time::Duration;

use crate::error::StoreError;

/// Environment variable holding the store base URL.
pub const ENV_STORE_URL: &str = "CLOUDANT_URL";

/// Environment variable holding the IAM API key.
pub const ENV_IAM_KEY: &str = "CLOUDANT_IAM_KEY";

/// Environment variable overriding the IAM token endpoint.
pub const ENV_IAM_URL: &str = "CLOUDANT_IAM_URL";

/// IAM endpoint used when none is configured.
pub const DEFAULT_IAM_URL: &str = "https://iam.cloud.ibm.com";

/// Configuration for the document store client.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Store base URL (e.g., "<https://account.cloudant.com>").
    pub url: String,

    /// Authentication configuration.
    pub auth: StoreAuth,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string.
    pub user_agent: String,
}

impl StoreConfig {
    /// Creates a new store configuration with the given URL and no authentication.
    ///
    /// # Examples
    ///
    /// ```
    /// use hpass_store::StoreConfig;
    ///
    /// let config = StoreConfig::new("http://localhost:5984/");
    /// assert_eq!(config.url, "http://localhost:5984");
    /// ```
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let url: String = url.into();
        Self {
            url: url.trim_end_matches('/').to_string(),
            auth: StoreAuth::None,
            timeout: Duration::from_secs(30),
            user_agent: format!("hpass-store/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Builds a configuration from raw values, as read from the environment.
    ///
    /// Empty strings count as missing. Both the URL and the API key are
    /// required; the error names every missing variable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingConfig`] if the URL or key is absent, or
    /// [`StoreError::InvalidUrl`] if the URL does not parse.
    pub fn from_values(
        url: Option<String>,
        api_key: Option<String>,
        iam_url: Option<String>,
    ) -> Result<Self, StoreError> {
        let api_key = api_key.filter(|v| !v.is_empty());
        let url = url.filter(|v| !v.is_empty());

        let mut missing = Vec::new();
        if api_key.is_none() {
            missing.push(ENV_IAM_KEY);
        }
        if url.is_none() {
            missing.push(ENV_STORE_URL);
        }

        let (Some(url), Some(api_key)) = (url, api_key) else {
            return Err(StoreError::MissingConfig { vars: missing });
        };

        if url::Url::parse(&url).is_err() {
            return Err(StoreError::InvalidUrl { url });
        }

        let token_url = iam_url
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_IAM_URL.to_string());

        Ok(Self::new(url).with_auth(StoreAuth::iam(api_key, token_url)))
    }

    /// Reads the configuration from `CLOUDANT_URL`, `CLOUDANT_IAM_KEY` and
    /// (optionally) `CLOUDANT_IAM_URL`.
    ///
    /// # Errors
    ///
    /// See [`StoreConfig::from_values`].
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_values(
            std::env::var(ENV_STORE_URL).ok(),
            std::env::var(ENV_IAM_KEY).ok(),
            std::env::var(ENV_IAM_URL).ok(),
        )
    }

    /// Sets the authentication method.
    #[must_use]
    pub fn with_auth(mut self, auth: StoreAuth) -> Self {
        self.auth = auth;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Authentication methods for store access.
#[derive(Clone)]
pub enum StoreAuth {
    /// No authentication (local CouchDB in admin party mode).
    None,

    /// Basic authentication (CouchDB user or Cloudant legacy credentials).
    Basic {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },

    /// IAM API key exchanged for short-lived bearer tokens.
    Iam {
        /// API key.
        api_key: String,
        /// Base URL of the IAM token service.
        token_url: String,
    },
}

impl std::fmt::Debug for StoreAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[redacted]")
                .finish(),
            Self::Iam { token_url, .. } => f
                .debug_struct("Iam")
                .field("api_key", &"[redacted]")
                .field("token_url", token_url)
                .finish(),
        }
    }
}

impl StoreAuth {
    /// Creates basic authentication.
    #[must_use]
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates IAM API key authentication.
    ///
    /// # Examples
    ///
    /// ```
    /// use hpass_store::StoreAuth;
    ///
    /// let auth = StoreAuth::iam("my-key", "https://iam.cloud.ibm.com");
    /// assert!(!format!("{auth:?}").contains("my-key"));
    /// ```
    #[must_use]
    pub fn iam(api_key: impl Into<String>, token_url: impl Into<String>) -> Self {
        let token_url: String = token_url.into();
        Self::Iam {
            api_key: api_key.into(),
            token_url: token_url.trim_end_matches('/').to_string(),
        }
    }
}
