//! # semp-client - a resilient client for SEMP management APIs
//!
//! `semp-client` talks to the REST management plane of a message broker. It is
//! built on `reqwest` and layers the behavior such an API needs on top:
//!
//! - **Transport retries** - connection failures and 502/503/504 responses are
//!   retried with exponential backoff before anything else sees them
//! - **Rate-limit retries** - 429 responses are retried with a doubling,
//!   capped wait
//! - **Pacing** - an optional minimum interval between consecutive requests
//! - **Sessions** - a cookie jar shared by every request of a client
//! - **Authentication** - bearer token, or basic auth when no token is set
//! - **Envelope parsing** - `data`/`meta` bodies become objects, empty results,
//!   or typed errors such as [`Error::NotFound`]
//! - **Pagination** - `nextPageUri` links are followed until the collection
//!   is complete
//!
//! ## Quick Start
//!
//! ```no_run
//! use semp_client::Client;
//! use serde_json::json;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), semp_client::Error> {
//!     let client = Client::builder()
//!         .base_url("https://broker.example.com:1943/SEMP/v2/config")?
//!         .basic_auth("admin", "admin")
//!         .request_limits(Duration::from_secs(60), Duration::from_millis(100))
//!         .build()?;
//!
//!     let about = client.about_api().await?;
//!     println!("SEMP {} on {}", about.semp_version, about.platform);
//!
//!     client
//!         .post("/msgVpns/default/queues", &json!({"queueName": "orders"}))
//!         .await?;
//!
//!     match client.get("/msgVpns/default/queues/orders").await {
//!         Ok(queue) => println!("{:?}", queue),
//!         Err(e) if e.is_not_found() => println!("gone already"),
//!         Err(e) => return Err(e),
//!     }
//!
//!     let queues = client.collect("/msgVpns/default/queues?count=100").await?;
//!     println!("{} queues", queues.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Requests, response bodies and retries are reported through `tracing` at
//! debug level. Install a subscriber to see them.

pub mod auth;
mod client;
pub mod config;
pub mod envelope;
mod error;
pub mod pacing;
pub mod pagination;
mod request;
mod response;
pub mod retry;
pub mod transport;

pub use client::{ApiInfo, Client, ClientBuilder};
pub use config::ClientConfig;
pub use envelope::Record;
pub use error::{Error, Result};
pub use pagination::Pages;
pub use request::SempRequest;
pub use response::RawResponse;
pub use retry::{RateLimitRetryPolicy, TransportRetryPolicy};
