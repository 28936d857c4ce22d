//! Low-level HTTP exchange with retries for transient infrastructure failures.
//!
//! The transport knows nothing about SEMP. It sends a prepared request and,
//! when the attempt failed in a way a [`TransientPredicate`] considers
//! transient, drains whatever came back, sleeps, and sends a fresh copy.

use crate::retry::{Attempt, RetryOnTransient, TransientPredicate, TransportRetryPolicy};
use std::sync::Arc;

/// An HTTP round-tripper that retries transient failures with exponential
/// backoff.
#[derive(Clone)]
pub struct RetryingTransport {
    http_client: reqwest::Client,
    policy: TransportRetryPolicy,
    predicate: Arc<dyn TransientPredicate>,
}

impl RetryingTransport {
    /// Wraps `http_client` with the given policy and the default
    /// [`RetryOnTransient`] predicate.
    pub fn new(http_client: reqwest::Client, policy: TransportRetryPolicy) -> Self {
        Self {
            http_client,
            policy,
            predicate: Arc::new(RetryOnTransient),
        }
    }

    /// Replaces the predicate deciding which failures are transient.
    pub fn with_predicate(mut self, predicate: Arc<dyn TransientPredicate>) -> Self {
        self.predicate = predicate;
        self
    }

    /// The underlying `reqwest` client, used to build requests.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// The retry policy in use.
    pub fn policy(&self) -> &TransportRetryPolicy {
        &self.policy
    }

    /// Sends `request`, retrying transient failures.
    ///
    /// The request must have an in-memory body (or none) so it can be cloned
    /// for every attempt. Once retries are exhausted the last response or
    /// the last error is returned as-is; the caller decides what it means.
    pub async fn send(
        &self,
        request: &reqwest::Request,
    ) -> std::result::Result<reqwest::Response, reqwest::Error> {
        let mut retry = 0;

        loop {
            let attempt = match request.try_clone() {
                Some(attempt) => attempt,
                // Streaming bodies cannot be replayed; send once.
                None => return self.http_client.execute(clone_without_body(request)).await,
            };

            let result = self.http_client.execute(attempt).await;

            let transient = match &result {
                Ok(response) => self
                    .predicate
                    .is_transient(&Attempt::Completed(response.status())),
                Err(error) => self.predicate.is_transient(&Attempt::Failed(error)),
            };
            if !transient {
                return result;
            }

            let Some(delay) = self.policy.delay_for_retry(retry) else {
                return result;
            };

            match &result {
                Ok(response) => tracing::debug!(
                    status = response.status().as_u16(),
                    url = %request.url(),
                    delay_ms = delay.as_millis(),
                    retry = retry + 1,
                    "Transient response, retrying after backoff"
                ),
                Err(error) => tracing::debug!(
                    error = %error,
                    url = %request.url(),
                    delay_ms = delay.as_millis(),
                    retry = retry + 1,
                    "Transport error, retrying after backoff"
                ),
            }

            tokio::time::sleep(delay).await;

            // Consume the discarded response so the connection can be reused.
            if let Ok(response) = result {
                let _ = response.bytes().await;
            }

            retry += 1;
        }
    }
}

impl std::fmt::Debug for RetryingTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingTransport")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

fn clone_without_body(request: &reqwest::Request) -> reqwest::Request {
    let mut copy = reqwest::Request::new(request.method().clone(), request.url().clone());
    *copy.headers_mut() = request.headers().clone();
    *copy.timeout_mut() = request.timeout().copied();
    copy
}
