//! Course-page link strategies, evaluated in table order.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use super::LinkStrategy;
use crate::page::{absolutize, text_of};
use crate::url_model::{is_file_url, is_module_view};

/// How a strategy's matches combine with earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// First non-empty strategy of the cascade group wins.
    Cascade,
    /// Matches are always added.
    Always,
    /// Runs only when nothing else matched.
    LastResort,
}

/// A found anchor: display text and absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Found {
    pub text: String,
    pub url: String,
}

pub(crate) struct Strategy {
    pub tag: LinkStrategy,
    pub mode: Mode,
    pub find: fn(&Html, &Url) -> Vec<Found>,
}

pub(crate) const COURSE_PAGE_STRATEGIES: &[Strategy] = &[
    Strategy {
        tag: LinkStrategy::PrimaryContentLink,
        mode: Mode::Cascade,
        find: primary_content_links,
    },
    Strategy {
        tag: LinkStrategy::ModuleViewLink,
        mode: Mode::Cascade,
        find: module_view_links,
    },
    Strategy {
        tag: LinkStrategy::ClickHandler,
        mode: Mode::Cascade,
        find: click_handler_links,
    },
    Strategy {
        tag: LinkStrategy::DirectFile,
        mode: Mode::Always,
        find: direct_file_links,
    },
    Strategy {
        tag: LinkStrategy::Keyword,
        mode: Mode::LastResort,
        find: keyword_links,
    },
];

/// Visible-text keywords marking a file link (English and French).
pub(crate) const FILE_KEYWORDS: &[&str] = &[
    "file",
    "fichier",
    "document",
    "pdf",
    "download",
    "télécharger",
    "telecharger",
];

static AALINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.aalink[href]").expect("valid selector"));
static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));
static ONCLICK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[onclick]").expect("valid selector"));
static WINDOW_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"window\.open\(\s*['"]([^'"]+)['"]"#).expect("valid regex")
});

fn anchors_where(doc: &Html, base: &Url, selector: &Selector, keep: impl Fn(&str, &str) -> bool) -> Vec<Found> {
    doc.select(selector)
        .filter_map(|a| {
            let url = absolutize(base, a.value().attr("href")?)?;
            let text = text_of(a);
            keep(&url, &text).then_some(Found { text, url })
        })
        .collect()
}

fn primary_content_links(doc: &Html, base: &Url) -> Vec<Found> {
    anchors_where(doc, base, &AALINK, |url, _| is_module_view(url))
}

fn module_view_links(doc: &Html, base: &Url) -> Vec<Found> {
    anchors_where(doc, base, &ANCHOR, |url, _| is_module_view(url))
}

fn click_handler_links(doc: &Html, base: &Url) -> Vec<Found> {
    doc.select(&ONCLICK)
        .filter_map(|a| {
            let raw = onclick_target(a.value().attr("onclick")?)?;
            let url = absolutize(base, &raw)?;
            is_module_view(&url).then(|| Found {
                text: text_of(a),
                url,
            })
        })
        .collect()
}

fn direct_file_links(doc: &Html, base: &Url) -> Vec<Found> {
    anchors_where(doc, base, &ANCHOR, |url, _| is_file_url(url))
}

fn keyword_links(doc: &Html, base: &Url) -> Vec<Found> {
    anchors_where(doc, base, &ANCHOR, |_, text| has_file_keyword(text))
}

pub(crate) fn has_file_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    FILE_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// URL passed to `window.open(...)` in an onclick handler, without the
/// parameters the portal's script appends (`&amp;...`, `&redirect=...`).
pub(crate) fn onclick_target(onclick: &str) -> Option<String> {
    let raw = WINDOW_OPEN.captures(onclick)?.get(1)?.as_str();
    let raw = raw.split("&amp;").next().unwrap_or(raw);
    let raw = raw.split("&redirect=").next().unwrap_or(raw);
    let raw = raw.trim();
    (!raw.is_empty()).then(|| raw.to_string())
}
