//! CouchDB/Cloudant HTTP client.
//!
//! The client is constructed once by the application's composition root,
//! connected explicitly during startup, and then shared behind an `Arc`.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, error, info};
use url::Url;

use crate::auth::Authenticator;
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::result::{DocumentResult, STATUS_CREATED, STATUS_OK};
use crate::store::{ClientState, DocumentStore};

/// Error body returned by CouchDB.
#[derive(Debug, Deserialize)]
struct CouchError {
    error: String,
    #[serde(default)]
    reason: Option<String>,
}

/// Client for a CouchDB-compatible document store (IBM Cloudant).
#[derive(Debug)]
pub struct CloudantClient {
    config: StoreConfig,
    base: Url,
    http: reqwest::Client,
    auth: Authenticator,
    connected: OnceCell<()>,
    ready: RwLock<HashSet<String>>,
    provisioning: Mutex<()>,
}

impl CloudantClient {
    /// Creates a new, unconnected client.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be
    /// created.
    ///
    /// # Examples
    ///
    /// ```
    /// use hpass_store::{ClientState, CloudantClient, StoreConfig};
    ///
    /// let client = CloudantClient::new(StoreConfig::new("http://localhost:5984"))?;
    /// assert_eq!(client.state(), ClientState::Uninitialized);
    /// # Ok::<(), hpass_store::StoreError>(())
    /// ```
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let base = Url::parse(&config.url).map_err(|_| StoreError::InvalidUrl {
            url: config.url.clone(),
        })?;
        if base.cannot_be_a_base() {
            return Err(StoreError::InvalidUrl {
                url: config.url.clone(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| StoreError::ConnectionFailed {
                url: config.url.clone(),
                source: e,
            })?;

        Ok(Self {
            auth: Authenticator::new(config.auth.clone()),
            config,
            base,
            http,
            connected: OnceCell::new(),
            ready: RwLock::new(HashSet::new()),
            provisioning: Mutex::new(()),
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns where the client is in its lifecycle.
    #[must_use]
    pub fn state(&self) -> ClientState {
        if !self.connected.initialized() {
            ClientState::Uninitialized
        } else if self.ready.read().is_empty() {
            ClientState::Connected
        } else {
            ClientState::CollectionReady
        }
    }

    /// Authenticates and checks the store root.
    ///
    /// Idempotent and single-flight: concurrent callers wait for the first
    /// attempt; once it succeeds later calls return immediately. A failed
    /// attempt leaves the client uninitialized.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails or the store is unreachable.
    pub async fn connect(&self) -> Result<(), StoreError> {
        self.connected
            .get_or_try_init(|| self.handshake())
            .await
            .map(|_| ())
    }

    /// Connects and provisions `collection`: the startup step that moves the
    /// client to [`ClientState::CollectionReady`].
    ///
    /// # Errors
    ///
    /// Returns an error if connecting or provisioning fails.
    pub async fn setup(&self, collection: &str) -> Result<(), StoreError> {
        if let Err(e) = self.connect().await {
            error!(error = %e, "Failed to connect to document store");
            return Err(e);
        }
        if let Err(e) = self.ensure_collection(collection).await {
            error!(collection, error = %e, "Failed to provision collection");
            return Err(e);
        }
        info!("Successfully initialized document store");
        Ok(())
    }

    async fn handshake(&self) -> Result<(), StoreError> {
        debug!(url = %self.base, "Initializing document store connection");

        let response = self
            .http
            .get(self.base.clone())
            .headers(self.auth.headers(&self.http).await?)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                info!(url = %self.base, "Connected to document store");
                Ok(())
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(StoreError::AuthenticationFailed {
                    message: Self::error_message(response).await,
                })
            }
            _ => Err(Self::http_error(response).await),
        }
    }

    fn require_connected(&self) -> Result<(), StoreError> {
        if self.connected.initialized() {
            Ok(())
        } else {
            Err(StoreError::NotInitialized)
        }
    }

    /// Builds `<base>/<segments...>` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::InvalidUrl {
                url: self.base.to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn create_collection(&self, collection: &str, url: Url) -> Result<(), StoreError> {
        let response = self
            .http
            .put(url)
            .headers(self.auth.headers(&self.http).await?)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                info!(collection, "Created collection");
                Ok(())
            }
            StatusCode::PRECONDITION_FAILED => {
                debug!(collection, "Collection was created concurrently");
                Ok(())
            }
            _ => Err(StoreError::CollectionCreateFailed {
                collection: collection.to_string(),
                message: Self::error_message(response).await,
            }),
        }
    }

    async fn try_create(&self, document: &Value, collection: &str) -> Result<Value, StoreError> {
        self.require_connected()?;
        let url = self.endpoint(&[collection])?;

        let response = self
            .http
            .post(url)
            .headers(self.auth.headers(&self.http).await?)
            .json(document)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::http_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn try_read(&self, id: &str, collection: &str) -> Result<Value, StoreError> {
        self.require_connected()?;
        let url = self.endpoint(&[collection, id])?;

        let response = self
            .http
            .get(url)
            .headers(self.auth.headers(&self.http).await?)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::http_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn http_error(response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();
        StoreError::HttpError {
            status,
            message: Self::error_message(response).await,
        }
    }

    /// Extracts CouchDB's `error` field, falling back to the raw body.
    async fn error_message(response: reqwest::Response) -> String {
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<CouchError>(&body) {
            Ok(couch) => {
                if let Some(reason) = couch.reason {
                    debug!(error = %couch.error, reason, "Document store error");
                }
                couch.error
            }
            Err(_) => body,
        }
    }

    fn report(result: Result<Value, StoreError>, status: u16, collection: &str) -> DocumentResult {
        match result {
            Ok(data) => DocumentResult::success(status, data),
            Err(StoreError::NotInitialized) => {
                let err = StoreError::NotInitialized;
                error!(collection, "{err}");
                err.into()
            }
            Err(e) => {
                debug!(collection, error = %e, "Document store request failed");
                e.into()
            }
        }
    }
}

#[async_trait]
impl DocumentStore for CloudantClient {
    async fn ensure_collection(&self, collection: &str) -> Result<(), StoreError> {
        self.require_connected()?;
        if self.ready.read().contains(collection) {
            return Ok(());
        }

        let _guard = self.provisioning.lock().await;
        if self.ready.read().contains(collection) {
            return Ok(());
        }

        debug!(collection, "Checking if collection exists");
        let url = self.endpoint(&[collection])?;
        let response = self
            .http
            .head(url.clone())
            .headers(self.auth.headers(&self.http).await?)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                debug!(collection, "Collection exists, skipping creation");
            }
            StatusCode::NOT_FOUND => {
                debug!(collection, "Collection not found, creating it");
                self.create_collection(collection, url).await?;
            }
            status => {
                return Err(StoreError::HttpError {
                    status: status.as_u16(),
                    message: format!("Failed to check collection {collection}"),
                });
            }
        }

        self.ready.write().insert(collection.to_string());
        Ok(())
    }

    async fn create_document_safe(&self, document: &Value, collection: &str) -> DocumentResult {
        debug!(collection, "Creating document");
        Self::report(
            self.try_create(document, collection).await,
            STATUS_CREATED,
            collection,
        )
    }

    async fn read_document_safe(&self, id: &str, collection: &str) -> DocumentResult {
        debug!(id, collection, "Reading document");
        Self::report(self.try_read(id, collection).await, STATUS_OK, collection)
    }

    fn name(&self) -> &'static str {
        "cloudant"
    }
}
