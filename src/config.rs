//! Plain-value client configuration.
//!
//! [`ClientConfig`] collects every knob the client understands so that a
//! command line or provider layer can fill it in and hand it to
//! [`ClientBuilder::from_config`](crate::ClientBuilder::from_config).

use std::time::Duration;

/// Configuration values for a [`Client`](crate::Client).
///
/// `Default` gives the library defaults: 3 retries waiting 1s to 10s, a 120s
/// request timeout, no pacing, TLS verification on, no page cap.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the management API, including its base path.
    pub url: String,
    /// Username for basic auth.
    pub username: Option<String>,
    /// Password for basic auth.
    pub password: Option<String>,
    /// Bearer token; takes precedence over basic auth.
    pub bearer_token: Option<String>,
    /// Extra attempts after a 429 response.
    pub retries: u32,
    /// First wait after a 429 response.
    pub retry_min_interval: Duration,
    /// Longest wait after a 429 response.
    pub retry_max_interval: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Minimum spacing between requests; zero disables pacing.
    pub request_min_interval: Duration,
    /// Accept invalid TLS certificates.
    pub insecure_skip_verify: bool,
    /// Maximum pages followed by a collection walk.
    pub max_pages: Option<u32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: None,
            password: None,
            bearer_token: None,
            retries: 3,
            retry_min_interval: Duration::from_secs(1),
            retry_max_interval: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
            request_min_interval: Duration::ZERO,
            insecure_skip_verify: false,
            max_pages: None,
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for `url` with library defaults.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Defaults suited to bulk configuration export, which issues many
    /// requests in a row: more patient retries and light pacing.
    ///
    /// ```
    /// use semp_client::ClientConfig;
    /// use std::time::Duration;
    ///
    /// let config = ClientConfig::exporter("http://localhost:8080/SEMP/v2/config");
    /// assert_eq!(config.retries, 10);
    /// assert_eq!(config.request_min_interval, Duration::from_millis(100));
    /// ```
    pub fn exporter(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            retries: 10,
            retry_min_interval: Duration::from_secs(3),
            retry_max_interval: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
            request_min_interval: Duration::from_millis(100),
            ..Default::default()
        }
    }

    /// Sets basic auth credentials.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets a bearer token.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}
