//! Page fetching: the boundary between the engine and HTTP.
//!
//! The engine only talks to [`PageFetcher`]. [`CurlFetcher`] is the libcurl
//! implementation used by the CLI and the integration tests; unit tests use a
//! scripted in-memory fetcher.

mod cookies;
mod curl_fetcher;
mod parse;
#[cfg(test)]
pub(crate) mod scripted;

pub use cookies::CookieJar;
pub use curl_fetcher::{CurlFetcher, DEFAULT_USER_AGENT};

use std::time::Duration;
use thiserror::Error;

/// HTTP method for a [`FetchRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    /// Header-only request; the response body is always empty.
    Head,
    /// `application/x-www-form-urlencoded` POST with the given fields.
    PostForm(Vec<(String, String)>),
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::PostForm(_) => "POST",
        }
    }
}

/// One request handed to a [`PageFetcher`].
#[derive(Debug, Clone)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    pub method: Method,
    /// Cookies sent with the request (the session jar), if any.
    pub cookies: Option<&'a CookieJar>,
    /// Wall-clock limit for the whole exchange, redirects included.
    pub timeout: Duration,
    pub follow_redirects: bool,
}

impl<'a> FetchRequest<'a> {
    pub fn get(url: &'a str, timeout: Duration) -> Self {
        Self {
            url,
            method: Method::Get,
            cookies: None,
            timeout,
            follow_redirects: true,
        }
    }

    pub fn head(url: &'a str, timeout: Duration) -> Self {
        Self {
            method: Method::Head,
            ..Self::get(url, timeout)
        }
    }

    pub fn post_form(url: &'a str, fields: Vec<(String, String)>, timeout: Duration) -> Self {
        Self {
            method: Method::PostForm(fields),
            ..Self::get(url, timeout)
        }
    }

    pub fn with_cookies(mut self, cookies: &'a CookieJar) -> Self {
        self.cookies = Some(cookies);
        self
    }

    pub fn without_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }
}

/// Response of the last hop of a request (after redirects, if followed).
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub status: u32,
    /// Headers of the final response only, in received order.
    pub headers: Vec<(String, String)>,
    /// URL of the final response after redirects.
    pub final_url: String,
    pub body: Vec<u8>,
    /// Cookie jar state after the exchange: the cookies sent plus anything
    /// the server set along the redirect chain.
    pub cookies: CookieJar,
}

impl FetchResponse {
    /// First header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn content_disposition(&self) -> Option<&str> {
        self.header("content-disposition")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Transport-level failure. HTTP error statuses are not errors at this layer.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL {url}")]
    InvalidUrl { url: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: curl::Error,
    },
}

/// Performs HTTP exchanges on behalf of the engine.
///
/// Implementations must be shareable across worker threads; every call is
/// independent and blocking.
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, request: &FetchRequest<'_>) -> Result<FetchResponse, FetchError>;
}
