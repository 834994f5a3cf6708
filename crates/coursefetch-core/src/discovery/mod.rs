//! Link discovery on course and category pages.
//!
//! Course pages are scanned with the ordered strategy table in
//! [`strategies`]; category pages yield the courses they list.

mod courses;
mod strategies;

pub use courses::{CategoryListing, CategoryRef, CourseRef};

use std::collections::HashSet;
use std::time::Duration;

use scraper::Html;
use serde::Serialize;
use thiserror::Error;
use tracing::Span;
use url::Url;

use crate::deadline::Deadline;
use crate::fetch::{FetchError, FetchRequest, PageFetcher};
use crate::page::{first_heading, shows_login_form, title};
use crate::session::Session;
use crate::url_model::{category_index_url, PageKind};
use strategies::{Mode, COURSE_PAGE_STRATEGIES};
pub(crate) use strategies::onclick_target;

/// Strategy that found a candidate link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStrategy {
    /// `a.aalink` to a resource or folder view page.
    PrimaryContentLink,
    /// Any anchor to a resource or folder view page.
    ModuleViewLink,
    /// `window.open(...)` in an onclick handler.
    ClickHandler,
    /// Anchor straight to a file.
    DirectFile,
    /// Anchor text mentions a file keyword.
    Keyword,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateLink {
    pub text: String,
    /// Absolute URL.
    pub url: String,
    pub source_url: String,
    pub strategy: LinkStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Advisory {
    /// The page loaded fine but no strategy matched.
    NoLinksFound,
}

/// Links found on one course page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discovery {
    /// Page URL after redirects.
    pub page_url: String,
    /// First `h1`, else `<title>`.
    pub page_title: Option<String>,
    pub links: Vec<CandidateLink>,
    pub advisory: Option<Advisory>,
}

/// Result of [`LinkDiscovery::discover`], by page kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovered {
    Links(Discovery),
    Courses(CategoryListing),
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("session expired: {url} shows the login form")]
    SessionExpired { url: String },

    #[error("{url} returned HTTP {status}")]
    Http { url: String, status: u32 },

    #[error("invalid page URL {url}")]
    InvalidUrl { url: String },

    #[error("operation deadline reached before fetching {url}")]
    Deadline { url: String },

    #[error(transparent)]
    Transport(#[from] FetchError),
}

struct FetchedPage {
    final_url: Url,
    doc: Html,
}

pub struct LinkDiscovery<'a> {
    fetcher: &'a dyn PageFetcher,
    page_timeout: Duration,
    deadline: Deadline,
    span: Span,
}

impl<'a> LinkDiscovery<'a> {
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        page_timeout: Duration,
        deadline: Deadline,
        span: Span,
    ) -> Self {
        Self {
            fetcher,
            page_timeout,
            deadline,
            span,
        }
    }

    pub fn discover(
        &self,
        session: &Session,
        page_url: &str,
        kind: PageKind,
    ) -> Result<Discovered, DiscoveryError> {
        match kind {
            PageKind::Course => self.discover_links(session, page_url).map(Discovered::Links),
            PageKind::Category => self
                .discover_courses(session, page_url)
                .map(Discovered::Courses),
        }
    }

    /// Candidate file links on a course page.
    pub fn discover_links(
        &self,
        session: &Session,
        page_url: &str,
    ) -> Result<Discovery, DiscoveryError> {
        let page = self.fetch_page(session, page_url)?;
        let links = collect_links(&page.doc, &page.final_url);
        tracing::debug!(
            parent: &self.span,
            url = %page.final_url,
            links = links.len(),
            "discovered links"
        );
        let advisory = links.is_empty().then_some(Advisory::NoLinksFound);
        Ok(Discovery {
            page_url: page.final_url.to_string(),
            page_title: first_heading(&page.doc).or_else(|| title(&page.doc)),
            links,
            advisory,
        })
    }

    /// Courses listed on a category page.
    pub fn discover_courses(
        &self,
        session: &Session,
        category_url: &str,
    ) -> Result<CategoryListing, DiscoveryError> {
        let page = self.fetch_page(session, category_url)?;
        let listing = courses::extract_courses(&page.doc, &page.final_url);
        tracing::debug!(
            parent: &self.span,
            url = %page.final_url,
            courses = listing.courses.len(),
            "discovered courses"
        );
        Ok(listing)
    }

    /// Top-level course categories of the portal.
    pub fn discover_categories(&self, session: &Session) -> Result<Vec<CategoryRef>, DiscoveryError> {
        let index = category_index_url(session.base_url()).ok_or_else(|| DiscoveryError::InvalidUrl {
            url: session.base_url().to_string(),
        })?;
        let page = self.fetch_page(session, index.as_str())?;
        Ok(courses::extract_categories(&page.doc, &page.final_url))
    }

    fn fetch_page(&self, session: &Session, url: &str) -> Result<FetchedPage, DiscoveryError> {
        let timeout = self
            .deadline
            .cap(self.page_timeout)
            .ok_or_else(|| DiscoveryError::Deadline {
                url: url.to_string(),
            })?;
        let resp = self
            .fetcher
            .fetch(&FetchRequest::get(url, timeout).with_cookies(session.cookies()))?;
        if !resp.is_success() {
            return Err(DiscoveryError::Http {
                url: url.to_string(),
                status: resp.status,
            });
        }
        let final_url = Url::parse(&resp.final_url).map_err(|_| DiscoveryError::InvalidUrl {
            url: resp.final_url.clone(),
        })?;
        let doc = Html::parse_document(&resp.text());
        if shows_login_form(&doc, final_url.as_str()) {
            tracing::warn!(parent: &self.span, url, "page shows the login form");
            return Err(DiscoveryError::SessionExpired {
                url: url.to_string(),
            });
        }
        Ok(FetchedPage { final_url, doc })
    }
}

/// Runs the course-page strategy table and deduplicates by absolute URL,
/// keeping the first occurrence.
pub(crate) fn collect_links(doc: &Html, page_url: &Url) -> Vec<CandidateLink> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();
    let mut cascade_matched = false;

    for strategy in COURSE_PAGE_STRATEGIES {
        match strategy.mode {
            Mode::Cascade if cascade_matched => continue,
            Mode::LastResort if !links.is_empty() => continue,
            _ => {}
        }
        let found = (strategy.find)(doc, page_url);
        if strategy.mode == Mode::Cascade && !found.is_empty() {
            cascade_matched = true;
        }
        for f in found {
            if seen.insert(f.url.clone()) {
                links.push(CandidateLink {
                    text: f.text,
                    url: f.url,
                    source_url: page_url.to_string(),
                    strategy: strategy.tag,
                });
            }
        }
    }
    links
}
