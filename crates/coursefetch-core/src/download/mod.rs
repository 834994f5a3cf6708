//! Download orchestration for resolved resources.
//!
//! Attempts, in order, stopping at the first that yields a non-HTML body:
//! 1. GET the resolved file URL.
//! 2. GET the probe's final URL, when it differs from the file URL.
//! 3. Scan the last HTML page for a file link not tried yet and GET it once.
//!
//! There is no further recursion: HTML from the rescue is
//! [`DownloadError::NotDownloadable`].

mod sniff;

use std::collections::HashSet;
use std::time::Duration;

use scraper::Html;
use serde::Serialize;
use thiserror::Error;
use tracing::Span;
use url::Url;

use crate::deadline::Deadline;
use crate::fetch::{FetchError, FetchRequest, FetchResponse, PageFetcher};
use crate::page::shows_login_form;
use crate::resolver::scan::scan_for_file;
use crate::resolver::{Outcome, ResolvedResource};
use crate::session::Session;
use crate::url_model::{derive_filename, FilenameSources};

pub(crate) use sniff::is_full_html_document;

/// Which attempt produced the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStrategy {
    Direct,
    ProbeResolved,
    RescueScan,
}

/// Resource a download error refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceRecord {
    pub name: String,
    pub url: String,
}

impl ResourceRecord {
    pub fn of(resource: &ResolvedResource) -> Self {
        Self {
            name: resource.name.clone(),
            url: resource.page_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub bytes: Vec<u8>,
    /// Never a full HTML document.
    pub content_type: Option<String>,
    pub filename: String,
    pub final_url: String,
    pub strategy: DownloadStrategy,
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("{} was not resolved to a file", .record.name)]
    NotResolved { record: ResourceRecord },

    #[error("{url} returned HTTP {status}")]
    Http { url: String, status: u32 },

    #[error("session expired while downloading {}", .record.name)]
    SessionExpired { record: ResourceRecord },

    #[error("{} ({}) serves an HTML page, not a file", .record.name, .record.url)]
    NotDownloadable { record: ResourceRecord },

    #[error("operation deadline reached before downloading {}", .record.name)]
    Deadline { record: ResourceRecord },

    #[error(transparent)]
    Transport(#[from] FetchError),
}

pub struct Downloader<'a> {
    fetcher: &'a dyn PageFetcher,
    page_timeout: Duration,
    deadline: Deadline,
    span: Span,
}

impl<'a> Downloader<'a> {
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

    pub fn download(
        &self,
        session: &Session,
        resolved: &ResolvedResource,
    ) -> Result<DownloadResult, DownloadError> {
        let record = ResourceRecord::of(resolved);
        let Outcome::File {
            file_url,
            name_hint,
            ..
        } = &resolved.outcome
        else {
            return Err(DownloadError::NotResolved { record });
        };
        let finish = |resp: FetchResponse, strategy| {
            self.finish(resp, strategy, name_hint.as_deref(), &record)
        };

        let mut tried: HashSet<String> = HashSet::new();
        tried.insert(file_url.clone());

        let resp = self.get(session, file_url, &record)?;
        if !resp.is_success() {
            return Err(DownloadError::Http {
                url: file_url.clone(),
                status: resp.status,
            });
        }
        tried.insert(resp.final_url.clone());
        if !looks_like_page(&resp) {
            return Ok(finish(resp, DownloadStrategy::Direct));
        }
        tracing::debug!(parent: &self.span, url = %file_url, "direct fetch returned an HTML page");
        let mut page = resp;

        if let Some(probe_url) = resolved.probe_url.as_ref().filter(|p| *p != file_url) {
            tried.insert(probe_url.clone());
            match self.get(session, probe_url, &record) {
                Ok(resp) if resp.is_success() => {
                    tried.insert(resp.final_url.clone());
                    if !looks_like_page(&resp) {
                        return Ok(finish(resp, DownloadStrategy::ProbeResolved));
                    }
                    page = resp;
                }
                Ok(resp) => {
                    tracing::debug!(parent: &self.span, url = %probe_url, status = resp.status, "probe URL fetch failed");
                }
                Err(DownloadError::Deadline { record }) => {
                    return Err(DownloadError::Deadline { record });
                }
                Err(e) => {
                    tracing::debug!(parent: &self.span, url = %probe_url, error = %e, "probe URL fetch failed");
                }
            }
        }

        let rescue_url = {
            let doc = Html::parse_document(&page.text());
            if shows_login_form(&doc, &page.final_url) {
                return Err(DownloadError::SessionExpired { record });
            }
            Url::parse(&page.final_url)
                .ok()
                .and_then(|base| scan_for_file(&doc, &base))
                .map(|(_, url)| url)
                .filter(|url| !tried.contains(url))
        };
        let Some(rescue_url) = rescue_url else {
            tracing::info!(parent: &self.span, name = %record.name, "no file link in returned page");
            return Err(DownloadError::NotDownloadable { record });
        };

        tracing::debug!(parent: &self.span, url = %rescue_url, "rescue fetch");
        let resp = self.get(session, &rescue_url, &record)?;
        if !resp.is_success() {
            return Err(DownloadError::Http {
                url: rescue_url,
                status: resp.status,
            });
        }
        if looks_like_page(&resp) {
            return Err(DownloadError::NotDownloadable { record });
        }
        Ok(finish(resp, DownloadStrategy::RescueScan))
    }

    fn get(
        &self,
        session: &Session,
        url: &str,
        record: &ResourceRecord,
    ) -> Result<FetchResponse, DownloadError> {
        let timeout = self
            .deadline
            .cap(self.page_timeout)
            .ok_or_else(|| DownloadError::Deadline {
                record: record.clone(),
            })?;
        Ok(self
            .fetcher
            .fetch(&FetchRequest::get(url, timeout).with_cookies(session.cookies()))?)
    }

    fn finish(
        &self,
        resp: FetchResponse,
        strategy: DownloadStrategy,
        name_hint: Option<&str>,
        record: &ResourceRecord,
    ) -> DownloadResult {
        let filename = derive_filename(&FilenameSources {
            content_disposition: resp.content_disposition(),
            final_url: Some(&resp.final_url),
            name_hint,
            resource_name: Some(&record.name),
            content_type: resp.content_type(),
        });
        tracing::info!(
            parent: &self.span,
            name = %record.name,
            filename = %filename,
            bytes = resp.body.len(),
            ?strategy,
            "downloaded"
        );
        DownloadResult {
            content_type: resp.content_type().map(str::to_string),
            filename,
            final_url: resp.final_url,
            bytes: resp.body,
            strategy,
        }
    }
}

fn looks_like_page(resp: &FetchResponse) -> bool {
    is_full_html_document(resp.content_type(), &resp.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::scripted::{
        file, html, landed_at, session_jar, status, with_header, ScriptedFetcher, Verb,
    };
    use crate::resolver::ResolveStrategy;

    const VIEW: &str = "https://p.test/mod/resource/view.php?id=11";
    const PDF: &str = "https://p.test/pluginfile.php/55/mod_resource/content/1/td2.pdf";

    fn session() -> Session {
        Session::new(session_jar(), Url::parse("https://p.test/").unwrap())
    }

    fn downloader(fetcher: &ScriptedFetcher) -> Downloader<'_> {
        Downloader::new(fetcher, Duration::from_secs(5), Deadline::none(), Span::none())
    }

    fn resolved(file_url: &str, probe_url: Option<&str>) -> ResolvedResource {
        ResolvedResource {
            name: "TD 2".to_string(),
            page_url: VIEW.to_string(),
            outcome: Outcome::File {
                file_url: file_url.to_string(),
                name_hint: None,
                strategy: ResolveStrategy::Probe,
            },
            probe_url: probe_url.map(str::to_string),
        }
    }

    fn page(body: &str) -> FetchResponse {
        html(&format!("<!DOCTYPE html><html><body>{body}</body></html>"))
    }

    #[test]
    fn direct_success() {
        let fetcher = ScriptedFetcher::new().on_get(PDF, file("application/pdf", b"%PDF-1.7"));
        let got = downloader(&fetcher)
            .download(&session(), &resolved(PDF, None))
            .unwrap();
        assert_eq!(got.strategy, DownloadStrategy::Direct);
        assert_eq!(got.bytes, b"%PDF-1.7");
        assert_eq!(got.filename, "td2.pdf");
        assert_eq!(got.content_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn rescue_scan_retries_once_and_succeeds() {
        let fetcher = ScriptedFetcher::new()
            .on_get(VIEW, page(&format!(r#"<a href="{PDF}">td2.pdf</a>"#)))
            .on_get(PDF, file("application/pdf", b"%PDF"));
        let got = downloader(&fetcher)
            .download(&session(), &resolved(VIEW, None))
            .unwrap();
        assert_eq!(got.strategy, DownloadStrategy::RescueScan);
        assert_eq!(got.filename, "td2.pdf");
        assert_eq!(fetcher.count(Verb::Get, PDF), 1);
    }

    #[test]
    fn rescue_returning_html_is_not_downloadable() {
        let fetcher = ScriptedFetcher::new()
            .on_get(VIEW, page(&format!(r#"<a href="{PDF}">td2.pdf</a>"#)))
            .on_get(PDF, page(&format!(r#"<a href="{VIEW}x.pdf">loop</a>"#)));
        let err = downloader(&fetcher)
            .download(&session(), &resolved(VIEW, None))
            .unwrap_err();
        match err {
            DownloadError::NotDownloadable { record } => {
                assert_eq!(record.name, "TD 2");
                assert_eq!(record.url, VIEW);
            }
            other => panic!("expected NotDownloadable, got {other:?}"),
        }
        // one direct GET, one rescue GET, nothing more
        assert_eq!(fetcher.calls().len(), 2);
    }

    #[test]
    fn page_linking_only_to_itself_is_not_downloadable() {
        let fetcher = ScriptedFetcher::new().on_get(PDF, page(&format!(r#"<a href="{PDF}">me</a>"#)));
        let err = downloader(&fetcher)
            .download(&session(), &resolved(PDF, None))
            .unwrap_err();
        assert!(matches!(err, DownloadError::NotDownloadable { .. }));
        assert_eq!(fetcher.calls().len(), 1);
    }

    #[test]
    fn probe_resolved_url_tried_before_scan() {
        let other = "https://p.test/pluginfile.php/56/mod_resource/content/1/real.pdf";
        let fetcher = ScriptedFetcher::new()
            .on_get(VIEW, page("<p>viewer</p>"))
            .on_get(other, file("application/pdf", b"%PDF"));
        let got = downloader(&fetcher)
            .download(&session(), &resolved(VIEW, Some(other)))
            .unwrap();
        assert_eq!(got.strategy, DownloadStrategy::ProbeResolved);
        assert_eq!(got.filename, "real.pdf");
    }

    #[test]
    fn login_page_means_session_expired() {
        let fetcher = ScriptedFetcher::new().on_get(
            PDF,
            landed_at(
                page(r#"<form id="login"><input name="logintoken" value="t"></form>"#),
                "https://p.test/login/index.php",
            ),
        );
        let err = downloader(&fetcher)
            .download(&session(), &resolved(PDF, None))
            .unwrap_err();
        assert!(matches!(err, DownloadError::SessionExpired { .. }));
    }

    #[test]
    fn html_fragment_is_accepted() {
        let fetcher = ScriptedFetcher::new().on_get(PDF, html("<p>tiny</p>"));
        let got = downloader(&fetcher)
            .download(&session(), &resolved(PDF, None))
            .unwrap();
        assert_eq!(got.strategy, DownloadStrategy::Direct);
    }

    #[test]
    fn errors() {
        let fetcher = ScriptedFetcher::new().on_get(PDF, status(403));
        let err = downloader(&fetcher)
            .download(&session(), &resolved(PDF, None))
            .unwrap_err();
        assert!(matches!(err, DownloadError::Http { status: 403, .. }));

        let fetcher = ScriptedFetcher::new().fail(PDF);
        let err = downloader(&fetcher)
            .download(&session(), &resolved(PDF, None))
            .unwrap_err();
        assert!(matches!(err, DownloadError::Transport(_)));

        let mut unresolved = resolved(PDF, None);
        unresolved.outcome = Outcome::NotResolved;
        let err = downloader(&fetcher)
            .download(&session(), &unresolved)
            .unwrap_err();
        assert!(matches!(err, DownloadError::NotResolved { .. }));
    }

    #[test]
    fn filename_from_resource_name_and_content_type() {
        let fetcher = ScriptedFetcher::new().on_get(VIEW, file("application/pdf", b"%PDF"));
        let got = downloader(&fetcher)
            .download(&session(), &resolved(VIEW, None))
            .unwrap();
        assert_eq!(got.filename, "TD 2.pdf");

        let fetcher = ScriptedFetcher::new().on_get(
            VIEW,
            with_header(
                file("application/pdf", b"%PDF"),
                "Content-Disposition",
                "attachment; filename=\"Sujet TD2.pdf\"",
            ),
        );
        let got = downloader(&fetcher)
            .download(&session(), &resolved(VIEW, None))
            .unwrap();
        assert_eq!(got.filename, "Sujet TD2.pdf");
    }
}
