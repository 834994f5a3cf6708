//! Authenticated portal sessions.

mod login;

pub use login::SessionManager;

use std::fmt;
use std::time::SystemTime;

use thiserror::Error;
use url::Url;

use crate::fetch::{CookieJar, FetchError};

/// An authenticated session: the cookie jar returned by a successful login.
///
/// Read-only once created and never persisted. Workers share it by reference.
#[derive(Clone)]
pub struct Session {
    cookies: CookieJar,
    base_url: Url,
    created_at: SystemTime,
}

impl Session {
    pub(crate) fn new(cookies: CookieJar, base_url: Url) -> Self {
        Self {
            cookies,
            base_url,
            created_at: SystemTime::now(),
        }
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url.as_str())
            .field("cookies", &self.cookies.names())
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Username and password for the portal's login form.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid portal URL {url}")]
    InvalidPortalUrl { url: String },

    #[error("login page {url} returned HTTP {status}")]
    Http { url: String, status: u32 },

    #[error("no logintoken field on login page {url}")]
    TokenNotFound { url: String },

    #[error("login rejected: invalid username or password")]
    InvalidCredentials,

    #[error("login accepted but the portal set no session cookie")]
    NoSessionCookie,

    #[error(transparent)]
    Transport(#[from] FetchError),
}
