//! Collection traversal across `nextPageUri` continuation links.

use crate::{envelope, Client, Error, Result, SempRequest};
use http::Method;
use serde_json::Value;
use url::Url;

/// A lazy walk over the pages of one collection.
///
/// Each call to [`Pages::next_page`] issues one request and yields that
/// page's items in the order the broker returned them. The walk ends when a
/// page carries no continuation link. It cannot be restarted; an error also
/// ends it.
///
/// # Examples
///
/// ```no_run
/// # async fn example(client: semp_client::Client) -> Result<(), semp_client::Error> {
/// let mut pages = client.pages("/msgVpns/default/queues?count=100");
/// while let Some(queues) = pages.next_page().await? {
///     for queue in queues {
///         println!("{}", queue["queueName"]);
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Pages {
    client: Client,
    base_path: String,
    first_path: String,
    next_path: Option<String>,
    pages_fetched: u32,
    max_pages: Option<u32>,
}

impl Pages {
    pub(crate) fn new(client: Client, base_path: String, path: String) -> Self {
        Self {
            client,
            base_path,
            first_path: path.clone(),
            next_path: Some(path),
            pages_fetched: 0,
            max_pages: None,
        }
    }

    /// Caps the number of pages fetched; `None` follows links until the
    /// broker stops sending them.
    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Number of pages fetched so far.
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Fetches the next page, or returns `None` after the last one.
    ///
    /// # Errors
    ///
    /// Any error of the underlying request, plus
    /// [`Error::PageLimitExceeded`] when the broker keeps linking past the
    /// configured page cap.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Value>>> {
        let Some(path) = self.next_path.take() else {
            return Ok(None);
        };
        if let Some(limit) = self.max_pages {
            if self.pages_fetched >= limit {
                return Err(Error::PageLimitExceeded {
                    limit,
                    path: self.first_path.clone(),
                });
            }
        }

        let url = self.client.url_for(&path);
        let response = self
            .client
            .execute(&SempRequest::new(Method::GET, path))
            .await?;
        let page = envelope::parse_page(&Method::GET, &url, &response.body)?;

        self.pages_fetched += 1;
        self.next_path = page
            .next_page_uri
            .as_deref()
            .map(|uri| continuation_path(uri, &self.base_path));

        tracing::debug!(
            page = self.pages_fetched,
            items = page.items.len(),
            more = self.next_path.is_some(),
            "Fetched collection page"
        );

        Ok(Some(page.items))
    }

    /// Fetches all remaining pages and concatenates their items.
    pub async fn collect_all(mut self) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await? {
            items.extend(page);
        }
        Ok(items)
    }
}

/// Turns a `nextPageUri` into a path relative to the client's base URL.
///
/// The broker sends absolute links that repeat the base path; everything
/// after its first occurrence is kept. Links without the base path are
/// reduced to path and query when absolute, and used verbatim otherwise.
pub(crate) fn continuation_path(next_page_uri: &str, base_path: &str) -> String {
    if !base_path.is_empty() {
        if let Some((_, rest)) = next_page_uri.split_once(base_path) {
            return rest.to_string();
        }
    }
    match Url::parse(next_page_uri) {
        Ok(url) => match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        },
        Err(_) => next_page_uri.to_string(),
    }
}
