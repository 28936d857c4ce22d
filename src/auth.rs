//! Credential storage and selection.

use crate::{Error, Result};
use std::fmt;

/// A string that never reveals its contents in `Debug` or `Display`.
#[derive(Clone, Default)]
pub struct Secret(String);

impl Secret {
    /// Wraps a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the wrapped value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<secret>")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<secret>")
    }
}

impl<T: Into<String>> From<T> for Secret {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

/// Everything the client knows about how to authenticate.
///
/// Both forms may be set at once; a bearer token always wins.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub(crate) username: String,
    pub(crate) password: Secret,
    pub(crate) bearer_token: Secret,
}

/// The authentication actually attached to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Auth<'a> {
    Bearer(&'a str),
    Basic { username: &'a str, password: &'a str },
}

impl Credentials {
    /// Picks the authentication for the next request.
    ///
    /// Fails with [`Error::MissingCredentials`] when neither a bearer token
    /// nor a username is set.
    pub(crate) fn select(&self) -> Result<Auth<'_>> {
        if !self.bearer_token.is_empty() {
            Ok(Auth::Bearer(self.bearer_token.expose()))
        } else if !self.username.is_empty() {
            Ok(Auth::Basic {
                username: &self.username,
                password: self.password.expose(),
            })
        } else {
            Err(Error::MissingCredentials)
        }
    }

    pub(crate) fn apply(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder> {
        Ok(match self.select()? {
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
        })
    }
}
