//! Error types for SEMP calls.
//!
//! Every variant that comes out of an HTTP exchange keeps the method and URL
//! of the request, plus whatever the broker told us (status, description or
//! raw body), so a failure can be reported without re-issuing the request.

use http::{Method, StatusCode};

/// The main error type for SEMP calls.
///
/// # Examples
///
/// ```no_run
/// use semp_client::{Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .base_url("https://broker.example.com:1943/SEMP/v2/config")?
///     .basic_auth("admin", "admin")
///     .build()?;
///
/// match client.get("/msgVpns/default/queues/orders").await {
///     Ok(Some(queue)) => println!("queue: {:?}", queue),
///     Ok(None) => println!("empty result"),
///     Err(e) if e.is_not_found() => println!("no such queue"),
///     Err(e) => eprintln!("request failed: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The broker reported that the addressed object does not exist.
    ///
    /// Callers implementing "absence is fine" semantics should match on this
    /// (or use [`Error::is_not_found`]) rather than on the message text.
    #[error("Resource not found: {method} to {url}: {description}")]
    NotFound {
        /// The HTTP method of the failed request
        method: Method,
        /// The full request URL
        url: String,
        /// The broker's description of the failure
        description: String,
    },

    /// The broker rejected the request as malformed or invalid.
    #[error("Bad request: {method} to {url}: {description} ({status})")]
    BadRequest {
        /// The HTTP method of the failed request
        method: Method,
        /// The full request URL
        url: String,
        /// The broker's description of the failure
        description: String,
        /// The broker's symbolic error status, e.g. `INVALID_PARAMETER`
        status: String,
    },

    /// The broker answered with an error envelope that is neither not-found
    /// nor a collection bad-request.
    #[error("Request failed for {url} using {method}: {description}, {status}")]
    RequestFailed {
        /// The HTTP method of the failed request
        method: Method,
        /// The full request URL
        url: String,
        /// The broker's description of the failure
        description: String,
        /// The broker's symbolic error status
        status: String,
    },

    /// The broker answered with a status the client does not retry and cannot
    /// interpret (anything other than 200, 400 and 429).
    #[error("Unexpected status {status} during {method} to {url}, body:\n{raw_response}")]
    UnexpectedStatus {
        /// The HTTP status code
        status: StatusCode,
        /// The HTTP method of the failed request
        method: Method,
        /// The full request URL
        url: String,
        /// The raw response body
        raw_response: String,
    },

    /// The broker kept answering 429 until every attempt was used.
    #[error("Could not perform request after {attempts} attempts: status {status} during {method} to {url}, response body:\n{raw_response}")]
    RetriesExhausted {
        /// The number of attempts made
        attempts: usize,
        /// The last HTTP status observed
        status: StatusCode,
        /// The HTTP method of the failed request
        method: Method,
        /// The full request URL
        url: String,
        /// The last raw response body
        raw_response: String,
    },

    /// The response body is not a SEMP envelope.
    ///
    /// Usually a protocol or API version mismatch, or something other than the
    /// management API answering on the configured URL.
    #[error("Could not parse response from {method} to {url} ({reason}), response body was:\n{raw_response}")]
    MalformedResponse {
        /// The HTTP method of the request
        method: Method,
        /// The full request URL
        url: String,
        /// What was wrong with the body
        reason: String,
        /// The offending body
        raw_response: String,
    },

    /// The management API could not be reached.
    ///
    /// The transport has already retried connection-level failures by the
    /// time this is returned.
    #[error("SEMP API unreachable: {method} to {url}: {source}")]
    Unreachable {
        /// The HTTP method of the request
        method: Method,
        /// The full request URL
        url: String,
        /// The underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// The request exceeded its deadline.
    #[error("Request timed out: {method} to {url}")]
    Timeout {
        /// The HTTP method of the request
        method: Method,
        /// The full request URL
        url: String,
    },

    /// Neither a bearer token nor a username was configured.
    #[error("Either username or bearer token must be provided to access the broker")]
    MissingCredentials,

    /// Invalid configuration was provided.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Failed to serialize the request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// A collection walk followed more continuation links than allowed.
    #[error("Collection at {path} exceeded the limit of {limit} pages")]
    PageLimitExceeded {
        /// The configured page cap
        limit: u32,
        /// The first path of the collection
        path: String,
    },

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Builds the error for a failed exchange from the underlying
    /// `reqwest::Error`, separating deadlines from reachability problems.
    pub(crate) fn from_transport(method: &Method, url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Error::Timeout {
                method: method.clone(),
                url: url.to_string(),
            }
        } else {
            Error::Unreachable {
                method: method.clone(),
                url: url.to_string(),
                source,
            }
        }
    }

    /// Returns `true` if the broker said the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns `true` if the broker rejected the request as invalid.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Error::BadRequest { .. })
    }

    /// Returns `true` if re-issuing the same request later might succeed.
    ///
    /// ```
    /// use semp_client::Error;
    /// use http::{Method, StatusCode};
    ///
    /// let err = Error::RetriesExhausted {
    ///     attempts: 4,
    ///     status: StatusCode::TOO_MANY_REQUESTS,
    ///     method: Method::GET,
    ///     url: "https://broker/SEMP/v2/config/msgVpns".to_string(),
    ///     raw_response: String::new(),
    /// };
    /// assert!(err.is_retryable());
    /// assert!(!Error::MissingCredentials.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Unreachable { .. } => true,
            Error::Timeout { .. } => true,
            Error::RetriesExhausted { .. } => true,
            Error::UnexpectedStatus { status, .. } => status.is_server_error(),
            Error::NotFound { .. }
            | Error::BadRequest { .. }
            | Error::RequestFailed { .. }
            | Error::MalformedResponse { .. }
            | Error::MissingCredentials
            | Error::ConfigurationError(_)
            | Error::SerializationFailed(_)
            | Error::PageLimitExceeded { .. }
            | Error::InvalidUrl(_) => false,
        }
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::UnexpectedStatus { status, .. } => Some(*status),
            Error::RetriesExhausted { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::UnexpectedStatus { raw_response, .. } => Some(raw_response),
            Error::RetriesExhausted { raw_response, .. } => Some(raw_response),
            Error::MalformedResponse { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

/// A specialized `Result` type for SEMP calls.
pub type Result<T> = std::result::Result<T, Error>;
