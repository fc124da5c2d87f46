//! Request-scoped values attached to every audit entry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Well-known key of the transaction id in request locals.
pub const TRANSACTION_ID_KEY: &str = "transactionId";

/// Well-known key of the caller IP in request locals.
pub const CALLER_IP_KEY: &str = "callerIp";

/// Well-known key of the request URL in request locals.
pub const REQUEST_URL_KEY: &str = "requestUrl";

/// Transaction id, caller IP and URL of the request being audited.
///
/// All values are optional; absent values are simply left out of the audit
/// entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    /// Transaction id propagated through the backend.
    pub transaction_id: Option<String>,

    /// IP address of the caller.
    pub caller_ip: Option<String>,

    /// URL of the request.
    pub request_url: Option<String>,
}

impl RequestContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a context from request locals stored under the well-known keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use hpass_gdpr::RequestContext;
    ///
    /// let locals = HashMap::from([
    ///     ("transactionId".to_string(), "T1".to_string()),
    ///     ("requestUrl".to_string(), "/x".to_string()),
    /// ]);
    /// let ctx = RequestContext::from_locals(&locals);
    /// assert_eq!(ctx.transaction_id.as_deref(), Some("T1"));
    /// assert_eq!(ctx.caller_ip, None);
    /// ```
    #[must_use]
    #[allow(clippy::implicit_hasher)]
    pub fn from_locals(locals: &HashMap<String, String>) -> Self {
        Self {
            transaction_id: locals.get(TRANSACTION_ID_KEY).cloned(),
            caller_ip: locals.get(CALLER_IP_KEY).cloned(),
            request_url: locals.get(REQUEST_URL_KEY).cloned(),
        }
    }

    /// Sets the transaction id.
    #[must_use]
    pub fn with_transaction_id(mut self, id: impl Into<String>) -> Self {
        self.transaction_id = Some(id.into());
        self
    }

    /// Sets the caller IP.
    #[must_use]
    pub fn with_caller_ip(mut self, ip: impl Into<String>) -> Self {
        self.caller_ip = Some(ip.into());
        self
    }

    /// Sets the request URL.
    #[must_use]
    pub fn with_request_url(mut self, url: impl Into<String>) -> Self {
        self.request_url = Some(url.into());
        self
    }
}
