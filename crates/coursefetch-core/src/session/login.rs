//! Credential login against the portal's login form.
//!
//! 1. GET `login/index.php` and read the `logintoken` anti-forgery field.
//! 2. POST username, password and token with the cookies from step 1.
//! 3. The login worked if the response carries no login error marker and
//!    the redirect chain left the login page.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::Span;
use url::Url;

use super::{AuthError, Credentials, Session};
use crate::fetch::{FetchRequest, PageFetcher};
use crate::page::absolutize;
use crate::url_model::login_url;

static TOKEN_INPUT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"input[name="logintoken"]"#).expect("valid selector")
});
static LOGIN_FORM_ACTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("form#login[action]").expect("valid selector"));
// Fallback for markup html5ever restructures (token outside any form).
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"name="logintoken"\s+value="([^"]+)""#).expect("valid regex")
});

const ERROR_MARKERS: &[&str] = &["loginerrors", "Invalid login"];

pub struct SessionManager<'a> {
    fetcher: &'a dyn PageFetcher,
    timeout: Duration,
    span: Span,
}

impl<'a> SessionManager<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, timeout: Duration, span: Span) -> Self {
        Self {
            fetcher,
            timeout,
            span,
        }
    }

    /// Logs in and returns the authenticated session.
    pub fn login(&self, credentials: &Credentials, portal_url: &str) -> Result<Session, AuthError> {
        let invalid = || AuthError::InvalidPortalUrl {
            url: portal_url.to_string(),
        };
        let base = Url::parse(portal_url).map_err(|_| invalid())?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(invalid());
        }
        let login = login_url(&base).ok_or_else(invalid)?;

        tracing::debug!(parent: &self.span, url = %login, "fetching login page");
        let page = self
            .fetcher
            .fetch(&FetchRequest::get(login.as_str(), self.timeout))?;
        if !page.is_success() {
            return Err(AuthError::Http {
                url: login.to_string(),
                status: page.status,
            });
        }

        let body = page.text();
        let token = extract_login_token(&body).ok_or_else(|| AuthError::TokenNotFound {
            url: login.to_string(),
        })?;
        let action = Url::parse(&page.final_url)
            .ok()
            .and_then(|at| form_action(&body, &at))
            .unwrap_or_else(|| login.to_string());

        let fields = vec![
            ("username".to_string(), credentials.username.clone()),
            ("password".to_string(), credentials.password.clone()),
            ("logintoken".to_string(), token),
            ("anchor".to_string(), String::new()),
        ];
        tracing::debug!(parent: &self.span, url = %action, username = %credentials.username, "submitting credentials");
        let resp = self.fetcher.fetch(
            &FetchRequest::post_form(&action, fields, self.timeout).with_cookies(&page.cookies),
        )?;

        if !login_succeeded(&resp.text(), &resp.final_url, &login) {
            tracing::warn!(parent: &self.span, final_url = %resp.final_url, "login rejected");
            return Err(AuthError::InvalidCredentials);
        }
        if resp.cookies.is_empty() {
            return Err(AuthError::NoSessionCookie);
        }

        tracing::info!(
            parent: &self.span,
            portal = %base,
            cookies = ?resp.cookies.names(),
            "logged in"
        );
        Ok(Session::new(resp.cookies, base))
    }
}

/// Value of the `logintoken` hidden input, if present and non-empty.
pub(crate) fn extract_login_token(body: &str) -> Option<String> {
    let doc = Html::parse_document(body);
    doc.select(&TOKEN_INPUT)
        .filter_map(|el| el.value().attr("value"))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| {
            TOKEN_RE
                .captures(body)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        })
}

fn form_action(body: &str, page_url: &Url) -> Option<String> {
    let doc = Html::parse_document(body);
    let action = doc.select(&LOGIN_FORM_ACTION).next()?.value().attr("action")?;
    absolutize(page_url, action)
}

/// No error marker in the body and the final URL is not the login page.
/// The query string is ignored when comparing.
pub(crate) fn login_succeeded(body: &str, final_url: &str, login: &Url) -> bool {
    if ERROR_MARKERS.iter().any(|m| body.contains(m)) {
        return false;
    }
    match Url::parse(final_url) {
        Ok(landed) => landed.path() != login.path(),
        Err(_) => false,
    }
}
