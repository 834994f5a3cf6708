//! The engine: login, listing and fetching on top of the page fetcher.
//!
//! Every operation runs under its own `tracing` span, parented on the
//! engine's span, which the components log into. Listing and batch fetching
//! share an operation deadline; work not started before it is reported as
//! failed and the run is marked [`RunStatus::PartiallyCompleted`].

mod batch;
mod listing;
mod pool;

pub use batch::{BatchReport, FailedFetch, FetchedFile};
pub use listing::{CourseFailure, CourseResources, Listing};

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::Span;

use crate::deadline::Deadline;
use crate::discovery::{
    CandidateLink, CategoryListing, CategoryRef, Discovered, Discovery, DiscoveryError,
    LinkDiscovery,
};
use crate::download::{DownloadError, DownloadResult, Downloader, ResourceRecord};
use crate::fetch::{CurlFetcher, PageFetcher, DEFAULT_USER_AGENT};
use crate::resolver::{Outcome, ResolveError, ResolvedResource, Resolver};
use crate::session::{AuthError, Credentials, Session, SessionManager};
use crate::url_model::PageKind;
use pool::run_bounded;

/// How a listing or batch run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Complete,
    /// The operation deadline cut the run short.
    PartiallyCompleted,
    /// The portal started answering with its login form; remaining work was
    /// skipped.
    SessionExpired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Per-request limit, capped by the time left in the operation.
    pub page_timeout: Duration,
    pub connect_timeout: Duration,
    /// Budget for one listing or batch operation.
    pub operation_deadline: Duration,
    /// Concurrent resolutions or downloads; 1 is sequential.
    pub workers: usize,
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(15),
            operation_deadline: Duration::from_secs(300),
            workers: 1,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Run-wide flags shared by workers.
#[derive(Default)]
struct Sweep {
    expired: AtomicBool,
    partial: AtomicBool,
}

impl Sweep {
    fn stop(&self) {
        self.expired.store(true, Ordering::SeqCst);
    }

    fn stopped(&self) -> bool {
        self.expired.load(Ordering::SeqCst)
    }

    fn mark_partial(&self) {
        self.partial.store(true, Ordering::SeqCst);
    }

    fn status(&self) -> RunStatus {
        if self.stopped() {
            RunStatus::SessionExpired
        } else if self.partial.load(Ordering::SeqCst) {
            RunStatus::PartiallyCompleted
        } else {
            RunStatus::Complete
        }
    }
}

pub struct Engine {
    fetcher: Arc<dyn PageFetcher>,
    config: EngineConfig,
    span: Span,
}

impl Engine {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: EngineConfig) -> Self {
        Self {
            fetcher,
            config,
            span: tracing::info_span!("engine"),
        }
    }

    /// Engine backed by libcurl.
    pub fn with_curl(config: EngineConfig) -> Self {
        let fetcher = CurlFetcher::new(config.connect_timeout, config.user_agent.clone());
        Self::new(Arc::new(fetcher), config)
    }

    /// Parent span for everything this engine logs.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn login(&self, credentials: &Credentials, portal_url: &str) -> Result<Session, AuthError> {
        let span = tracing::info_span!(parent: &self.span, "login", portal = portal_url);
        SessionManager::new(self.fetcher.as_ref(), self.config.page_timeout, span)
            .login(credentials, portal_url)
    }

    /// Lists and resolves the resources of a course page, or of every course
    /// of a category page.
    ///
    /// A login form on `url` itself is an error; once the sweep is under way,
    /// session expiry ends it early with [`RunStatus::SessionExpired`].
    pub fn list_resources(&self, session: &Session, url: &str) -> Result<Listing, DiscoveryError> {
        let span = tracing::info_span!(parent: &self.span, "list_resources", url);
        let deadline = Deadline::after(self.config.operation_deadline);
        let discovery = self.discovery(deadline, &span);
        let resolver = Resolver::new(
            self.fetcher.as_ref(),
            self.config.page_timeout,
            deadline,
            span.clone(),
        );
        let sweep = Sweep::default();

        let mut listing = match discovery.discover(session, url, PageKind::of(url))? {
            Discovered::Links(found) => {
                let group = self.resolve_group(session, &resolver, &sweep, None, found);
                let mut listing = Listing::empty(None);
                listing.groups.push(group);
                listing
            }
            Discovered::Courses(category) => {
                self.sweep_category(session, &discovery, &resolver, &sweep, category)
            }
        };
        listing.status = sweep.status();

        tracing::info!(
            parent: &span,
            status = ?listing.status,
            groups = listing.groups.len(),
            resources = listing.resources().count(),
            failures = listing.failures.len(),
            "listing finished"
        );
        Ok(listing)
    }

    /// Downloads one resolved resource.
    pub fn fetch_resource(
        &self,
        session: &Session,
        resolved: &ResolvedResource,
    ) -> Result<DownloadResult, DownloadError> {
        let span = tracing::info_span!(parent: &self.span, "fetch_resource", name = %resolved.name);
        let deadline = Deadline::after(self.config.operation_deadline);
        Downloader::new(self.fetcher.as_ref(), self.config.page_timeout, deadline, span)
            .download(session, resolved)
    }

    /// Downloads every resource, each distinct file URL once. Failures never
    /// abort the batch.
    pub fn fetch_all(&self, session: &Session, resources: &[ResolvedResource]) -> BatchReport {
        let span = tracing::info_span!(parent: &self.span, "fetch_all", resources = resources.len());
        let deadline = Deadline::after(self.config.operation_deadline);
        let downloader = Downloader::new(
            self.fetcher.as_ref(),
            self.config.page_timeout,
            deadline,
            span.clone(),
        );

        let mut failed = Vec::new();
        let mut duplicates = 0;
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for resource in resources {
            match resource.file_url() {
                None => failed.push(FailedFetch {
                    name: resource.name.clone(),
                    page_url: resource.page_url.clone(),
                    error: DownloadError::NotResolved {
                        record: ResourceRecord::of(resource),
                    },
                }),
                Some(url) if !seen.insert(url) => duplicates += 1,
                Some(_) => unique.push(resource),
            }
        }

        let sweep = Sweep::default();
        let results = run_bounded(unique, self.config.workers, |resource| {
            let result = if sweep.stopped() {
                Err(DownloadError::SessionExpired {
                    record: ResourceRecord::of(resource),
                })
            } else {
                downloader.download(session, resource)
            };
            match &result {
                Err(DownloadError::SessionExpired { .. }) => sweep.stop(),
                Err(DownloadError::Deadline { .. }) => sweep.mark_partial(),
                _ => {}
            }
            (resource, result)
        });

        let mut succeeded = Vec::new();
        for (resource, result) in results {
            match result {
                Ok(file) => succeeded.push(FetchedFile {
                    name: resource.name.clone(),
                    page_url: resource.page_url.clone(),
                    file,
                }),
                Err(error) => {
                    tracing::warn!(parent: &span, name = %resource.name, error = %error, "fetch failed");
                    failed.push(FailedFetch {
                        name: resource.name.clone(),
                        page_url: resource.page_url.clone(),
                        error,
                    });
                }
            }
        }

        let report = BatchReport {
            status: sweep.status(),
            succeeded,
            failed,
            duplicates,
        };
        tracing::info!(
            parent: &span,
            status = ?report.status,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            duplicates,
            bytes = report.total_bytes(),
            "batch finished"
        );
        report
    }

    /// Courses listed on a category page, without resolving anything.
    pub fn list_courses(
        &self,
        session: &Session,
        category_url: &str,
    ) -> Result<CategoryListing, DiscoveryError> {
        let span = tracing::info_span!(parent: &self.span, "list_courses", url = category_url);
        let deadline = Deadline::after(self.config.operation_deadline);
        self.discovery(deadline, &span)
            .discover_courses(session, category_url)
    }

    /// Course categories of the portal.
    pub fn list_categories(&self, session: &Session) -> Result<Vec<CategoryRef>, DiscoveryError> {
        let span = tracing::info_span!(parent: &self.span, "list_categories");
        let deadline = Deadline::after(self.config.operation_deadline);
        self.discovery(deadline, &span).discover_categories(session)
    }

    fn discovery(&self, deadline: Deadline, span: &Span) -> LinkDiscovery<'_> {
        LinkDiscovery::new(
            self.fetcher.as_ref(),
            self.config.page_timeout,
            deadline,
            span.clone(),
        )
    }

    fn sweep_category(
        &self,
        session: &Session,
        discovery: &LinkDiscovery<'_>,
        resolver: &Resolver<'_>,
        sweep: &Sweep,
        category: CategoryListing,
    ) -> Listing {
        let mut listing = Listing::empty(category.category_name);
        if category.courses.is_empty() {
            tracing::info!(parent: &self.span, "category lists no courses");
            return listing;
        }

        for course in category.courses {
            if sweep.stopped() {
                break;
            }
            match discovery.discover_links(session, &course.url) {
                Ok(found) => {
                    let group = self.resolve_group(session, resolver, sweep, Some(course.name), found);
                    listing.groups.push(group);
                }
                Err(DiscoveryError::SessionExpired { .. }) => {
                    tracing::warn!(parent: &self.span, url = %course.url, "session expired during category sweep");
                    sweep.stop();
                }
                Err(e) => {
                    if matches!(e, DiscoveryError::Deadline { .. }) {
                        sweep.mark_partial();
                    }
                    tracing::warn!(parent: &self.span, url = %course.url, error = %e, "course skipped");
                    listing.failures.push(CourseFailure {
                        url: course.url,
                        error: e.to_string(),
                    });
                }
            }
        }
        listing
    }

    fn resolve_group(
        &self,
        session: &Session,
        resolver: &Resolver<'_>,
        sweep: &Sweep,
        course_name: Option<String>,
        found: Discovery,
    ) -> CourseResources {
        let resources = run_bounded(found.links, self.config.workers, |candidate| {
            resolve_one(session, resolver, sweep, &candidate)
        })
        .into_iter()
        .flatten()
        .collect();

        CourseResources {
            course_name: course_name.or(found.page_title),
            course_url: found.page_url,
            resources,
            advisory: found.advisory,
        }
    }
}

fn resolve_one(
    session: &Session,
    resolver: &Resolver<'_>,
    sweep: &Sweep,
    candidate: &CandidateLink,
) -> Vec<ResolvedResource> {
    if sweep.stopped() {
        return vec![ResolvedResource {
            name: candidate.text.clone(),
            page_url: candidate.url.clone(),
            outcome: Outcome::Failed {
                error: ResolveError::SessionExpired,
            },
            probe_url: None,
        }];
    }
    let resolved = resolver.resolve(session, candidate);
    for r in &resolved {
        match &r.outcome {
            Outcome::Failed {
                error: ResolveError::SessionExpired,
            } => sweep.stop(),
            Outcome::Failed {
                error: ResolveError::Deadline,
            } => sweep.mark_partial(),
            _ => {}
        }
    }
    resolved
}
