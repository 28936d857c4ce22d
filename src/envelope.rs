//! The SEMP response envelope.
//!
//! Every SEMP response body is a JSON object of one of these shapes:
//!
//! ```text
//! success-object:   {"data": {...}, "meta"?: {...}}
//! success-list:     {"data": [...], "meta"?: {"paging": {"nextPageUri": "..."}}}
//! success-empty:    {"meta": {"responseCode": 200}}
//! error:            {"meta": {"responseCode": 404, "error": {"description": "...", "status": "NOT_FOUND"}}}
//! ```
//!
//! [`Envelope::decode`] turns a body into one explicit variant. The two
//! interpretations built on top of it, [`parse_object`] and [`parse_page`],
//! map variants to results and errors for single-object and collection
//! requests respectively.

use crate::{Error, Result};
use http::Method;
use serde_json::Value;

/// A single SEMP object: attribute name to value.
pub type Record = serde_json::Map<String, Value>;

/// The broker's symbolic status for a missing object.
pub const NOT_FOUND_STATUS: &str = "NOT_FOUND";

/// A decoded SEMP envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// `data` holds one object.
    Object {
        /// The object
        record: Record,
        /// Continuation link from `meta.paging.nextPageUri`
        next_page_uri: Option<String>,
    },
    /// `data` holds an array.
    List {
        /// The array elements, in the order returned
        items: Vec<Value>,
        /// Continuation link from `meta.paging.nextPageUri`
        next_page_uri: Option<String>,
    },
    /// No `data`, `meta.responseCode` is 200; e.g. the answer to a delete.
    Empty,
    /// No `data`, `meta` describes an error.
    Failure(ApiFailure),
}

/// The error part of a `meta`-only envelope.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApiFailure {
    /// `meta.responseCode`
    pub response_code: Option<i64>,
    /// `meta.error.status`, e.g. `NOT_FOUND`
    pub status: String,
    /// `meta.error.description`
    pub description: String,
}

impl ApiFailure {
    /// Returns `true` if the broker reported a missing object.
    pub fn is_not_found(&self) -> bool {
        self.status == NOT_FOUND_STATUS
    }
}

impl Envelope {
    /// Decodes a response body.
    ///
    /// Fails with a short reason if the body is not JSON, not an object, or
    /// carries neither `data` nor `meta`.
    ///
    /// ```
    /// use semp_client::envelope::Envelope;
    ///
    /// let envelope = Envelope::decode(br#"{"meta": {"responseCode": 200}}"#).unwrap();
    /// assert_eq!(envelope, Envelope::Empty);
    ///
    /// assert!(Envelope::decode(b"<html>").is_err());
    /// ```
    pub fn decode(body: &[u8]) -> std::result::Result<Self, String> {
        let value: Value = serde_json::from_slice(body).map_err(|e| e.to_string())?;
        let Value::Object(mut top) = value else {
            return Err("top-level value is not an object".to_string());
        };

        let data = top.remove("data").filter(|data| !data.is_null());
        let meta = match top.remove("meta") {
            Some(Value::Object(meta)) => Some(meta),
            Some(Value::Null) | None => None,
            // Data wins over a meta of the wrong shape.
            Some(_) if data.is_some() => None,
            Some(_) => return Err("meta is not an object".to_string()),
        };

        match data {
            Some(Value::Object(record)) => Ok(Envelope::Object {
                record,
                next_page_uri: meta.as_ref().and_then(next_page_uri),
            }),
            Some(Value::Array(items)) => Ok(Envelope::List {
                items,
                next_page_uri: meta.as_ref().and_then(next_page_uri),
            }),
            None => match meta {
                Some(meta) => Ok(classify_meta(&meta)),
                None => Err("neither data nor meta present".to_string()),
            },
            Some(_) => Err("data is neither an object nor an array".to_string()),
        }
    }
}

fn next_page_uri(meta: &Record) -> Option<String> {
    meta.get("paging")?
        .get("nextPageUri")?
        .as_str()
        .filter(|uri| !uri.is_empty())
        .map(str::to_string)
}

fn classify_meta(meta: &Record) -> Envelope {
    let response_code = meta.get("responseCode").and_then(response_code);
    if response_code == Some(200) {
        return Envelope::Empty;
    }

    let error = meta.get("error");
    let field = |name: &str| {
        error
            .and_then(|e| e.get(name))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    Envelope::Failure(ApiFailure {
        response_code,
        status: field("status"),
        description: field("description"),
    })
}

fn response_code(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|code| code as i64))
}

/// One page of a collection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    /// The page's items, in the order returned.
    pub items: Vec<Value>,
    /// The raw continuation link, if more pages exist.
    pub next_page_uri: Option<String>,
}

/// Interprets a body as the answer to a single-object request.
///
/// Returns the object, or `None` for an explicit empty success (a delete).
///
/// # Errors
///
/// - [`Error::NotFound`] if the broker reports `NOT_FOUND`
/// - [`Error::RequestFailed`] for any other error envelope
/// - [`Error::MalformedResponse`] if the body is not an object envelope
pub fn parse_object(method: &Method, url: &str, body: &[u8]) -> Result<Option<Record>> {
    let envelope = Envelope::decode(body).map_err(|reason| malformed(method, url, reason, body))?;

    match envelope {
        Envelope::Object { record, .. } => Ok(Some(record)),
        Envelope::Empty => Ok(None),
        Envelope::Failure(failure) if failure.is_not_found() => Err(Error::NotFound {
            method: method.clone(),
            url: url.to_string(),
            description: failure.description,
        }),
        Envelope::Failure(failure) => {
            tracing::error!(
                method = %method,
                url = %url,
                status = %failure.status,
                description = %failure.description,
                "SEMP request returned an error"
            );
            Err(Error::RequestFailed {
                method: method.clone(),
                url: url.to_string(),
                description: failure.description,
                status: failure.status,
            })
        }
        Envelope::List { .. } => Err(malformed(
            method,
            url,
            "expected a single object but data is an array".to_string(),
            body,
        )),
    }
}

/// Interprets a body as one page of a collection request.
///
/// A single object under `data` counts as a one-item page. An explicit empty
/// success is an empty final page.
///
/// # Errors
///
/// - [`Error::BadRequest`] if the error envelope has response code 400
/// - [`Error::NotFound`] for any other error envelope
/// - [`Error::MalformedResponse`] if the body is not an envelope
pub fn parse_page(method: &Method, url: &str, body: &[u8]) -> Result<Page> {
    let envelope = Envelope::decode(body).map_err(|reason| malformed(method, url, reason, body))?;

    match envelope {
        Envelope::List {
            items,
            next_page_uri,
        } => Ok(Page {
            items,
            next_page_uri,
        }),
        Envelope::Object {
            record,
            next_page_uri,
        } => Ok(Page {
            items: vec![Value::Object(record)],
            next_page_uri,
        }),
        Envelope::Empty => Ok(Page::default()),
        Envelope::Failure(failure) if failure.response_code == Some(400) => {
            Err(Error::BadRequest {
                method: method.clone(),
                url: url.to_string(),
                description: failure.description,
                status: failure.status,
            })
        }
        Envelope::Failure(failure) => Err(Error::NotFound {
            method: method.clone(),
            url: url.to_string(),
            description: failure.description,
        }),
    }
}

fn malformed(method: &Method, url: &str, reason: String, body: &[u8]) -> Error {
    Error::MalformedResponse {
        method: method.clone(),
        url: url.to_string(),
        reason,
        raw_response: String::from_utf8_lossy(body).into_owned(),
    }
}
