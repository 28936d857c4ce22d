//! Session client for the SEMP management API.
//!
//! The [`Client`] type is the main entry point for making requests.
//! Use [`ClientBuilder`] to configure and create clients.

use crate::{
    auth::{Credentials, Secret},
    config::ClientConfig,
    envelope::{self, Record},
    pacing::PacingGate,
    pagination::Pages,
    request::SempRequest,
    retry::{RateLimitRetryPolicy, TransientPredicate, TransportRetryPolicy},
    transport::RetryingTransport,
    Error, RawResponse, Result,
};
use http::{Method, StatusCode};
use reqwest::cookie::Jar;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// A client for a SEMP management API.
///
/// One client is meant to be built per broker and reused for every request.
/// It owns its connection pool, cookie jar and pacing gate; clones share them.
///
/// # Examples
///
/// ```no_run
/// use semp_client::Client;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), semp_client::Error> {
/// let client = Client::builder()
///     .base_url("https://broker.example.com:1943/SEMP/v2/config")?
///     .basic_auth("admin", "admin")
///     .retries(5, Duration::from_secs(1), Duration::from_secs(20))
///     .request_limits(Duration::from_secs(60), Duration::from_millis(100))
///     .build()?;
///
/// // Single object
/// let vpn = client.get("/msgVpns/default").await?;
/// println!("{:?}", vpn);
///
/// // Every queue, across all pages
/// let queues = client.collect("/msgVpns/default/queues?count=100").await?;
/// println!("{} queues", queues.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: RetryingTransport,
    base_url: String,
    base_path: String,
    credentials: Credentials,
    retry_policy: RateLimitRetryPolicy,
    pacing: PacingGate,
    timeout: Duration,
    max_pages: Option<u32>,
}

/// Version information returned by `/about/api`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiInfo {
    /// The SEMP API version, e.g. `2.36`.
    pub semp_version: String,
    /// The broker platform, e.g. `Appliance` or `VMR`.
    pub platform: String,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The base URL requests are appended to.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// The path component of the base URL, e.g. `/SEMP/v2/config`.
    pub fn base_path(&self) -> &str {
        &self.inner.base_path
    }

    pub(crate) fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    /// Performs one exchange: credentials, pacing, transport, and the retry
    /// loop for rate-limited responses.
    ///
    /// Returns the raw response for status 200 and 400; the envelope is left
    /// for the caller to interpret.
    ///
    /// The request's deadline (or the client timeout) starts once the pacing
    /// gate opens and covers every transport attempt, backoff and 429 wait.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingCredentials`] before any network activity when no
    ///   credentials are configured
    /// - [`Error::RetriesExhausted`] when every attempt was answered with 429
    /// - [`Error::UnexpectedStatus`] for any status other than 200, 400, 429
    /// - [`Error::Timeout`] when the deadline passes
    /// - [`Error::Unreachable`] from the transport
    pub async fn execute(&self, request: &SempRequest) -> Result<RawResponse> {
        let url = self.url_for(&request.path);
        let method = &request.method;

        let mut builder = self
            .inner
            .transport
            .http_client()
            .request(method.clone(), Url::parse(&url)?);
        builder = self.inner.credentials.apply(builder)?;
        if *method != Method::GET {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        let http_request = builder
            .build()
            .map_err(|e| Error::ConfigurationError(format!("Invalid request: {}", e)))?;

        self.inner.pacing.wait().await;

        let timeout = request.timeout.unwrap_or(self.inner.timeout);
        let Some(deadline) = tokio::time::Instant::now().checked_add(timeout) else {
            return self.exchange(&http_request, method, &url).await;
        };
        let outcome =
            tokio::time::timeout_at(deadline, self.exchange(&http_request, method, &url)).await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    method = %method,
                    url = %url,
                    timeout_ms = timeout.as_millis(),
                    "Request deadline passed"
                );
                Err(Error::Timeout {
                    method: method.clone(),
                    url,
                })
            }
        }
    }

    async fn exchange(
        &self,
        http_request: &reqwest::Request,
        method: &Method,
        url: &str,
    ) -> Result<RawResponse> {
        let policy = &self.inner.retry_policy;
        let max_attempts = policy.max_attempts();
        let mut retry_wait = policy.min_interval;
        let start_time = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;

            tracing::debug!(
                method = %method,
                url = %url,
                attempt = attempt,
                "Executing SEMP request"
            );

            let response = self
                .inner
                .transport
                .send(http_request)
                .await
                .map_err(|e| Error::from_transport(method, url, e))?;
            let status = response.status();

            match status {
                StatusCode::OK | StatusCode::BAD_REQUEST => {
                    let body = response
                        .bytes()
                        .await
                        .map_err(|e| Error::from_transport(method, url, e))?
                        .to_vec();
                    dump_body("response", &body);
                    return Ok(RawResponse::new(
                        status,
                        body,
                        attempt,
                        start_time.elapsed(),
                    ));
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    // The body of a 429 carries nothing we act on.
                    let raw_response = response.text().await.unwrap_or_default();

                    if attempt >= max_attempts {
                        tracing::warn!(
                            method = %method,
                            url = %url,
                            attempts = attempt,
                            "Rate limited on every attempt, giving up"
                        );
                        return Err(Error::RetriesExhausted {
                            attempts: attempt,
                            status,
                            method: method.clone(),
                            url: url.to_string(),
                            raw_response,
                        });
                    }

                    tracing::debug!(
                        delay_ms = retry_wait.as_millis(),
                        attempts_remaining = max_attempts - attempt,
                        "Request rate limited, retrying after delay"
                    );
                    tokio::time::sleep(retry_wait).await;
                    retry_wait = policy.next_wait(retry_wait);
                }
                _ => {
                    let raw_response = response.text().await.unwrap_or_default();
                    return Err(Error::UnexpectedStatus {
                        status,
                        method: method.clone(),
                        url: url.to_string(),
                        raw_response,
                    });
                }
            }
        }
    }

    /// Sends `request` and interprets the answer as a single object.
    ///
    /// Returns `None` when the broker reports an empty success, as it does
    /// for deletes.
    pub async fn send(&self, request: SempRequest) -> Result<Option<Record>> {
        if let Some(body) = &request.body {
            dump_body(
                &format!("{} to {}", request.method, self.url_for(&request.path)),
                body,
            );
        }
        let response = self.execute(&request).await?;
        envelope::parse_object(&request.method, &self.url_for(&request.path), &response.body)
    }

    /// Sends a request with a JSON body; used for creates and updates.
    pub async fn request_with_body<B>(
        &self,
        method: Method,
        path: impl Into<String>,
        body: &B,
    ) -> Result<Option<Record>>
    where
        B: Serialize + ?Sized,
    {
        self.send(SempRequest::new(method, path).with_json(body)?)
            .await
    }

    /// Sends a request without a body; used for reads and deletes.
    pub async fn request_without_body(
        &self,
        method: Method,
        path: impl Into<String>,
    ) -> Result<Option<Record>> {
        self.send(SempRequest::new(method, path)).await
    }

    /// Reads one object.
    pub async fn get(&self, path: impl Into<String>) -> Result<Option<Record>> {
        self.request_without_body(Method::GET, path).await
    }

    /// Creates an object.
    pub async fn post<B>(&self, path: impl Into<String>, body: &B) -> Result<Option<Record>>
    where
        B: Serialize + ?Sized,
    {
        self.request_with_body(Method::POST, path, body).await
    }

    /// Replaces an object.
    pub async fn put<B>(&self, path: impl Into<String>, body: &B) -> Result<Option<Record>>
    where
        B: Serialize + ?Sized,
    {
        self.request_with_body(Method::PUT, path, body).await
    }

    /// Updates some attributes of an object.
    pub async fn patch<B>(&self, path: impl Into<String>, body: &B) -> Result<Option<Record>>
    where
        B: Serialize + ?Sized,
    {
        self.request_with_body(Method::PATCH, path, body).await
    }

    /// Deletes an object.
    pub async fn delete(&self, path: impl Into<String>) -> Result<Option<Record>> {
        self.request_without_body(Method::DELETE, path).await
    }

    /// Walks the collection at `path` one page at a time.
    ///
    /// Continuation links are resolved against the client's base path.
    pub fn pages(&self, path: impl Into<String>) -> Pages {
        let base_path = self.inner.base_path.clone();
        self.pages_from(base_path, path)
    }

    /// Like [`Client::pages`], splicing continuation links at `base_path`.
    pub fn pages_from(&self, base_path: impl Into<String>, path: impl Into<String>) -> Pages {
        Pages::new(self.clone(), base_path.into(), path.into()).with_max_pages(self.inner.max_pages)
    }

    /// Fetches every item of the collection at `path`, following
    /// continuation links until the last page.
    pub async fn collect(&self, path: impl Into<String>) -> Result<Vec<serde_json::Value>> {
        self.pages(path).collect_all().await
    }

    /// Queries `/about/api` for the API version and broker platform.
    pub async fn about_api(&self) -> Result<ApiInfo> {
        let path = "/about/api";
        let record = self.get(path).await?;
        let malformed = |reason: String| Error::MalformedResponse {
            method: Method::GET,
            url: self.url_for(path),
            reason,
            raw_response: String::new(),
        };
        let record = record.ok_or_else(|| malformed("no data in response".to_string()))?;
        serde_json::from_value(serde_json::Value::Object(record))
            .map_err(|e| malformed(e.to_string()))
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url)
            .field("credentials", &self.inner.credentials)
            .field("retry_policy", &self.inner.retry_policy)
            .field("pacing", &self.inner.pacing.interval())
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

fn dump_body(tag: &str, body: &[u8]) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    let pretty = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());
    tracing::debug!("===== {} =====\n{}", tag, pretty);
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use semp_client::ClientBuilder;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), semp_client::Error> {
/// let jar = Arc::new(reqwest::cookie::Jar::default());
/// let client = ClientBuilder::new()
///     .base_url("https://broker.example.com:1943/SEMP/v2/config")?
///     .insecure_skip_verify(true)
///     .cookie_store(jar)
///     .bearer_token("eyJhbGciOi...")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: Option<String>,
    insecure_skip_verify: bool,
    cookie_store: Option<Arc<Jar>>,
    credentials: Credentials,
    retry_policy: RateLimitRetryPolicy,
    transport_policy: TransportRetryPolicy,
    transient_predicate: Option<Arc<dyn TransientPredicate>>,
    timeout: Duration,
    request_min_interval: Duration,
    max_pages: Option<u32>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            insecure_skip_verify: false,
            cookie_store: None,
            credentials: Credentials::default(),
            retry_policy: RateLimitRetryPolicy::default(),
            transport_policy: TransportRetryPolicy::default(),
            transient_predicate: None,
            timeout: Duration::from_secs(120),
            request_min_interval: Duration::ZERO,
            max_pages: None,
        }
    }

    /// Applies every value of `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured URL is invalid.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = Self::new()
            .base_url(&config.url)?
            .insecure_skip_verify(config.insecure_skip_verify)
            .retries(
                config.retries,
                config.retry_min_interval,
                config.retry_max_interval,
            )
            .request_limits(config.request_timeout, config.request_min_interval);
        if let Some(username) = &config.username {
            builder = builder.basic_auth(username, config.password.as_deref().unwrap_or_default());
        }
        if let Some(token) = &config.bearer_token {
            builder = builder.bearer_token(token);
        }
        if let Some(max_pages) = config.max_pages {
            builder = builder.max_pages(max_pages);
        }
        Ok(builder)
    }

    /// Sets the base URL, including the API base path, e.g.
    /// `https://broker:1943/SEMP/v2/config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let url = url.as_ref().trim_end_matches('/');
        Url::parse(url)?;
        self.base_url = Some(url.to_string());
        Ok(self)
    }

    /// Accepts invalid TLS certificates when set.
    pub fn insecure_skip_verify(mut self, skip: bool) -> Self {
        self.insecure_skip_verify = skip;
        self
    }

    /// Uses `jar` for session cookies instead of a fresh jar.
    pub fn cookie_store(mut self, jar: Arc<Jar>) -> Self {
        self.cookie_store = Some(jar);
        self
    }

    /// Sets basic auth credentials.
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<Secret>) -> Self {
        self.credentials.username = username.into();
        self.credentials.password = password.into();
        self
    }

    /// Sets a bearer token. It is preferred over basic auth when both are set.
    pub fn bearer_token(mut self, token: impl Into<Secret>) -> Self {
        self.credentials.bearer_token = token.into();
        self
    }

    /// Configures the retry loop for rate-limited (429) responses.
    pub fn retries(mut self, retries: u32, min_interval: Duration, max_interval: Duration) -> Self {
        self.retry_policy = RateLimitRetryPolicy::new(retries, min_interval, max_interval);
        self
    }

    /// Sets the request timeout and the minimum spacing between requests.
    ///
    /// The timeout bounds a whole call, retries and waits included.
    pub fn request_limits(mut self, timeout: Duration, min_interval: Duration) -> Self {
        self.timeout = timeout;
        self.request_min_interval = min_interval;
        self
    }

    /// Configures the transport's retries for transient failures.
    pub fn transport_retry(mut self, policy: TransportRetryPolicy) -> Self {
        self.transport_policy = policy;
        self
    }

    /// Replaces the predicate deciding which transport failures are transient.
    pub fn transient_predicate(mut self, predicate: Arc<dyn TransientPredicate>) -> Self {
        self.transient_predicate = Some(predicate);
        self
    }

    /// Caps the number of pages a collection walk follows.
    pub fn max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL was provided or the HTTP client cannot
    /// be created.
    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::ConfigurationError("Base URL is required".to_string()))?;
        let base_path = Url::parse(&base_url)?
            .path()
            .trim_end_matches('/')
            .to_string();

        let cookie_store = self.cookie_store.unwrap_or_default();
        let http_client = reqwest::Client::builder()
            .cookie_provider(cookie_store)
            .danger_accept_invalid_certs(self.insecure_skip_verify)
            .build()
            .map_err(|e| {
                Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
            })?;

        let mut transport = RetryingTransport::new(http_client, self.transport_policy);
        if let Some(predicate) = self.transient_predicate {
            transport = transport.with_predicate(predicate);
        }

        Ok(Client {
            inner: Arc::new(ClientInner {
                transport,
                base_url,
                base_path,
                credentials: self.credentials,
                retry_policy: self.retry_policy,
                pacing: PacingGate::new(self.request_min_interval),
                timeout: self.timeout,
                max_pages: self.max_pages,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
