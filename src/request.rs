//! Description of a single SEMP request.

use crate::{Error, Result};
use http::Method;
use serde::Serialize;
use std::time::Duration;

/// A SEMP request: method, path relative to the client's base URL, optional
/// JSON body and an optional deadline.
///
/// The body is serialized once, up front, so the request can be sent again
/// by the retry layers without touching the caller's value.
///
/// # Examples
///
/// ```
/// use semp_client::SempRequest;
/// use http::Method;
/// use std::time::Duration;
///
/// let request = SempRequest::new(Method::PATCH, "/msgVpns/default")
///     .with_json(&serde_json::json!({"enabled": true}))
///     .unwrap()
///     .with_timeout(Duration::from_secs(5));
///
/// assert_eq!(request.path, "/msgVpns/default");
/// assert!(request.body.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct SempRequest {
    /// The HTTP method.
    pub method: Method,

    /// The path, appended verbatim to the base URL. May carry a query string.
    pub path: String,

    /// The serialized JSON body, if any.
    pub body: Option<Vec<u8>>,

    /// Deadline for this request, overriding the client-wide timeout.
    pub timeout: Option<Duration>,
}

impl SempRequest {
    /// Creates a request without a body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            timeout: None,
        }
    }

    /// Attaches a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailed`] if `body` cannot be serialized.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        let bytes =
            serde_json::to_vec(body).map_err(|e| Error::SerializationFailed(e.to_string()))?;
        self.body = Some(bytes);
        Ok(self)
    }

    /// Sets a deadline for this request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for SempRequest {
    fn default() -> Self {
        Self::new(Method::GET, "")
    }
}
