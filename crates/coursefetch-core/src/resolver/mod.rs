//! Resolution of candidate links into downloadable file URLs.
//!
//! For each candidate, first success stops:
//! 1. URL already a file URL: accepted without a request.
//! 2. HEAD probe: accepted if it points at a file.
//! 3. GET the page. A non-HTML answer is the file itself; a folder page
//!    yields one resource per file link.
//! 4. Page scan ([`scan::PAGE_SCANS`]).
//! 5. `NotResolved`.

mod probe;
pub(crate) mod scan;

use std::time::Duration;

use scraper::Html;
use serde::Serialize;
use thiserror::Error;
use tracing::Span;
use url::Url;

use crate::deadline::Deadline;
use crate::discovery::CandidateLink;
use crate::fetch::{FetchRequest, FetchResponse, PageFetcher};
use crate::page::shows_login_form;
use crate::session::Session;
use crate::url_model::{
    filename_from_url_path, is_document_content_type, is_file_url, is_folder_view,
    is_html_content_type,
};

/// Step of the cascade that produced a file URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveStrategy {
    DirectLink,
    Probe,
    /// The page request itself answered with the file.
    Redirect,
    Folder,
    InlineLink,
    EmbeddedViewer,
    MetaRefresh,
    DownloadControl,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolveError {
    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("HTTP {status}")]
    Http { status: u32 },

    #[error("session expired")]
    SessionExpired,

    #[error("operation deadline reached")]
    Deadline,
}

/// Exactly one of: a file URL, nothing found, or an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    File {
        file_url: String,
        /// Filename suggested while resolving.
        name_hint: Option<String>,
        strategy: ResolveStrategy,
    },
    NotResolved,
    Failed {
        error: ResolveError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedResource {
    /// Display name from the course page.
    pub name: String,
    /// The candidate link this was resolved from.
    pub page_url: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Final URL of the HEAD probe, when it went somewhere else.
    pub probe_url: Option<String>,
}

impl ResolvedResource {
    pub fn file_url(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::File { file_url, .. } => Some(file_url),
            _ => None,
        }
    }

    pub fn is_file(&self) -> bool {
        self.file_url().is_some()
    }
}

pub struct Resolver<'a> {
    fetcher: &'a dyn PageFetcher,
    page_timeout: Duration,
    deadline: Deadline,
    span: Span,
}

impl<'a> Resolver<'a> {
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

    /// Resolves one candidate. One record, except for folders which yield one
    /// per file.
    pub fn resolve(&self, session: &Session, candidate: &CandidateLink) -> Vec<ResolvedResource> {
        let name = display_name(candidate);
        let record = |outcome: Outcome, probe_url: Option<String>| ResolvedResource {
            name: name.clone(),
            page_url: candidate.url.clone(),
            outcome,
            probe_url,
        };
        let file = |file_url: String, name_hint: Option<String>, strategy| Outcome::File {
            file_url,
            name_hint,
            strategy,
        };

        if is_file_url(&candidate.url) {
            tracing::debug!(parent: &self.span, url = %candidate.url, "direct file link");
            let hint = filename_from_url_path(&candidate.url);
            return vec![record(
                file(candidate.url.clone(), hint, ResolveStrategy::DirectLink),
                None,
            )];
        }

        let Some(timeout) = self.deadline.cap(self.page_timeout) else {
            return vec![record(failed(ResolveError::Deadline), None)];
        };
        let mut probe_url = None;
        match self.fetch(session, FetchRequest::head(&candidate.url, timeout)) {
            Ok(resp) => {
                if let Some(hit) = probe::classify_probe(&resp) {
                    tracing::debug!(parent: &self.span, url = %candidate.url, file_url = %hit.file_url, "probe hit");
                    return vec![record(
                        file(hit.file_url, hit.name_hint, ResolveStrategy::Probe),
                        None,
                    )];
                }
                if resp.is_success() && resp.final_url != candidate.url {
                    probe_url = Some(resp.final_url);
                }
            }
            Err(message) => {
                tracing::warn!(parent: &self.span, url = %candidate.url, error = %message, "probe failed");
            }
        }

        let Some(timeout) = self.deadline.cap(self.page_timeout) else {
            return vec![record(failed(ResolveError::Deadline), probe_url)];
        };
        let resp = match self.fetch(session, FetchRequest::get(&candidate.url, timeout)) {
            Ok(resp) => resp,
            Err(message) => {
                return vec![record(failed(ResolveError::Transport { message }), probe_url)];
            }
        };
        if !resp.is_success() {
            return vec![record(
                failed(ResolveError::Http {
                    status: resp.status,
                }),
                probe_url,
            )];
        }

        if answered_with_file(&resp) {
            return vec![record(
                file(
                    resp.final_url.clone(),
                    probe::name_hint(&resp),
                    ResolveStrategy::Redirect,
                ),
                probe_url,
            )];
        }

        let doc = Html::parse_document(&resp.text());
        if shows_login_form(&doc, &resp.final_url) {
            return vec![record(failed(ResolveError::SessionExpired), probe_url)];
        }
        let base = match Url::parse(&resp.final_url) {
            Ok(u) => u,
            Err(_) => return vec![record(Outcome::NotResolved, probe_url)],
        };

        if is_folder_view(&candidate.url) || is_folder_view(base.as_str()) {
            let files = scan::folder_files(&doc, &base);
            if !files.is_empty() {
                tracing::debug!(parent: &self.span, url = %candidate.url, files = files.len(), "folder");
                return files
                    .into_iter()
                    .map(|(text, url)| {
                        let hint = filename_from_url_path(&url);
                        ResolvedResource {
                            name: if text.is_empty() {
                                hint.clone().unwrap_or_else(|| name.clone())
                            } else {
                                text
                            },
                            page_url: candidate.url.clone(),
                            outcome: file(url, hint, ResolveStrategy::Folder),
                            probe_url: None,
                        }
                    })
                    .collect();
            }
        }

        if let Some((strategy, url)) = scan::scan_for_file(&doc, &base) {
            tracing::debug!(parent: &self.span, url = %candidate.url, file_url = %url, ?strategy, "found in page");
            let hint = filename_from_url_path(&url);
            return vec![record(file(url, hint, strategy), probe_url)];
        }

        tracing::debug!(parent: &self.span, url = %candidate.url, "not resolved");
        vec![record(Outcome::NotResolved, probe_url)]
    }

    fn fetch<'r>(
        &self,
        session: &'r Session,
        request: FetchRequest<'r>,
    ) -> Result<FetchResponse, String> {
        self.fetcher
            .fetch(&request.with_cookies(session.cookies()))
            .map_err(|e| e.to_string())
    }
}

fn failed(error: ResolveError) -> Outcome {
    Outcome::Failed { error }
}

/// The page request came back as a document rather than a page.
fn answered_with_file(resp: &FetchResponse) -> bool {
    let content_type = resp.content_type().unwrap_or("");
    if is_html_content_type(content_type) {
        return false;
    }
    is_document_content_type(content_type) || is_file_url(&resp.final_url)
}

fn display_name(candidate: &CandidateLink) -> String {
    if !candidate.text.is_empty() {
        return candidate.text.clone();
    }
    filename_from_url_path(&candidate.url).unwrap_or_else(|| "resource".to_string())
}
