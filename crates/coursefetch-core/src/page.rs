//! Shared helpers over parsed portal pages.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::url_model::is_login_url;

static LOGIN_FORM: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"form#login, input[name="logintoken"]"#).expect("valid selector")
});
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("valid selector"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));

/// Page is the login form: the session is no longer (or never was) valid.
pub(crate) fn shows_login_form(doc: &Html, final_url: &str) -> bool {
    is_login_url(final_url) || doc.select(&LOGIN_FORM).next().is_some()
}

/// Visible text of an element with whitespace runs collapsed. Screen-reader
/// only spans (`.accesshide`, e.g. the " File" suffix on activity links) are
/// skipped.
pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .take_while(|a| a.id() != el.id())
            .filter_map(|a| a.value().as_element())
            .any(|e| e.classes().any(|c| c == "accesshide"));
        if !hidden {
            out.push_str(text);
        }
    }
    collapse_whitespace(&out)
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Absolute http(s) URL for `href` relative to `base`, fragment removed.
/// Fragment-only, `javascript:`, `mailto:` and `tel:` references yield `None`.
pub(crate) fn absolutize(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }
    let mut url = base.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url.into())
}

/// Text of the first `h1`, if non-empty.
pub(crate) fn first_heading(doc: &Html) -> Option<String> {
    doc.select(&H1)
        .map(text_of)
        .find(|t| !t.is_empty())
}

pub(crate) fn title(doc: &Html) -> Option<String> {
    doc.select(&TITLE)
        .map(text_of)
        .find(|t| !t.is_empty())
}
