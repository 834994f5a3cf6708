//! Page scans for a file reference inside an HTML page.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::ResolveStrategy;
use crate::discovery::onclick_target;
use crate::page::{absolutize, text_of};
use crate::url_model::is_file_url;

pub(crate) struct Scan {
    pub tag: ResolveStrategy,
    pub find: fn(&Html, &Url) -> Option<String>,
}

/// Evaluated in order; the first element of the first matching scan wins.
pub(crate) const PAGE_SCANS: &[Scan] = &[
    Scan {
        tag: ResolveStrategy::InlineLink,
        find: inline_file_link,
    },
    Scan {
        tag: ResolveStrategy::EmbeddedViewer,
        find: embedded_viewer,
    },
    Scan {
        tag: ResolveStrategy::MetaRefresh,
        find: meta_refresh,
    },
    Scan {
        tag: ResolveStrategy::DownloadControl,
        find: download_control,
    },
];

const DOWNLOAD_KEYWORDS: &[&str] = &["download", "télécharger", "telecharger"];

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));
static VIEWER: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("iframe[src], frame[src], object[data], embed[src]").expect("valid selector")
});
static META: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[http-equiv][content]").expect("valid selector"));
static CONTROL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a.btn, button.btn, a[role="button"], a.resourcelinkdetails, a[download]"#)
        .expect("valid selector")
});

pub(crate) fn scan_for_file(doc: &Html, base: &Url) -> Option<(ResolveStrategy, String)> {
    PAGE_SCANS
        .iter()
        .find_map(|scan| (scan.find)(doc, base).map(|url| (scan.tag, url)))
}

/// Every file link on a folder page as (text, url), deduplicated by URL.
pub(crate) fn folder_files(doc: &Html, base: &Url) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    doc.select(&ANCHOR)
        .filter_map(|a| {
            let url = absolutize(base, a.value().attr("href")?)?;
            (is_file_url(&url) && seen.insert(url.clone())).then(|| (text_of(a), url))
        })
        .collect()
}

fn inline_file_link(doc: &Html, base: &Url) -> Option<String> {
    doc.select(&ANCHOR)
        .filter_map(|a| absolutize(base, a.value().attr("href")?))
        .find(|url| is_file_url(url))
}

fn embedded_viewer(doc: &Html, base: &Url) -> Option<String> {
    doc.select(&VIEWER)
        .filter_map(|el| {
            let v = el.value();
            let src = v.attr("src").or_else(|| v.attr("data"))?;
            absolutize(base, src)
        })
        .find(|url| is_file_url(url))
}

fn meta_refresh(doc: &Html, base: &Url) -> Option<String> {
    doc.select(&META)
        .filter(|m| {
            m.value()
                .attr("http-equiv")
                .is_some_and(|v| v.eq_ignore_ascii_case("refresh"))
        })
        .filter_map(|m| refresh_target(m.value().attr("content")?))
        .filter_map(|target| absolutize(base, &target))
        .find(|url| is_file_url(url))
}

/// Target of a refresh `content` value such as `0; URL='/file.pdf'`.
pub(crate) fn refresh_target(content: &str) -> Option<String> {
    let lower = content.to_ascii_lowercase();
    let at = lower.find("url=")?;
    let target = content[at + 4..].trim().trim_matches(|c| c == '\'' || c == '"');
    (!target.is_empty()).then(|| target.to_string())
}

fn download_control(doc: &Html, base: &Url) -> Option<String> {
    doc.select(&CONTROL)
        .filter(|el| {
            let text = text_of(*el).to_lowercase();
            DOWNLOAD_KEYWORDS.iter().any(|k| text.contains(k))
        })
        .find_map(|el| control_target(el, base))
}

fn control_target(el: ElementRef<'_>, base: &Url) -> Option<String> {
    let v = el.value();
    let raw = v
        .attr("href")
        .map(str::to_string)
        .or_else(|| v.attr("formaction").map(str::to_string))
        .or_else(|| v.attr("data-href").map(str::to_string))
        .or_else(|| v.attr("onclick").and_then(onclick_target))?;
    absolutize(base, &raw)
}
