//! The raw result of one SEMP exchange, before the envelope is interpreted.

use http::StatusCode;
use std::time::Duration;

/// A response the session client accepted (status 200 or 400).
///
/// Bodies with other statuses never reach this type; they are turned into
/// errors by the client.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The raw response body.
    pub body: Vec<u8>,

    /// The number of attempts the session client made, counting the first.
    ///
    /// Transport-level retries are not included.
    pub attempts: usize,

    /// Time from the first attempt until this response was read, including
    /// all waits.
    pub latency: Duration,
}

impl RawResponse {
    /// Creates a new `RawResponse`.
    pub fn new(status: StatusCode, body: Vec<u8>, attempts: usize, latency: Duration) -> Self {
        Self {
            status,
            body,
            attempts,
            latency,
        }
    }

    /// The body as text, with invalid UTF-8 replaced.
    ///
    /// ```
    /// # use semp_client::RawResponse;
    /// # use http::StatusCode;
    /// # use std::time::Duration;
    /// let response = RawResponse::new(
    ///     StatusCode::OK,
    ///     br#"{"meta":{"responseCode":200}}"#.to_vec(),
    ///     1,
    ///     Duration::from_millis(3),
    /// );
    /// assert_eq!(response.text(), r#"{"meta":{"responseCode":200}}"#);
    /// ```
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Returns `true` if the broker was rate limiting and the request
    /// succeeded only after waiting.
    ///
    /// ```
    /// # use semp_client::RawResponse;
    /// # use http::StatusCode;
    /// # use std::time::Duration;
    /// let response = RawResponse::new(StatusCode::OK, Vec::new(), 3, Duration::ZERO);
    /// assert!(response.was_retried());
    /// ```
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }
}
