//! Batch download report.

use super::RunStatus;
use crate::download::{DownloadError, DownloadResult};

#[derive(Debug)]
pub struct FetchedFile {
    pub name: String,
    pub page_url: String,
    pub file: DownloadResult,
}

#[derive(Debug)]
pub struct FailedFetch {
    pub name: String,
    pub page_url: String,
    pub error: DownloadError,
}

/// Outcome of [`Engine::fetch_all`](super::Engine::fetch_all): every input
/// resource lands in exactly one of `succeeded`, `failed`, or the
/// `duplicates` count.
#[derive(Debug)]
pub struct BatchReport {
    pub status: RunStatus,
    pub succeeded: Vec<FetchedFile>,
    pub failed: Vec<FailedFetch>,
    /// Resources skipped because an earlier one had the same file URL.
    pub duplicates: usize,
}

impl BatchReport {
    pub fn total_bytes(&self) -> usize {
        self.succeeded.iter().map(|f| f.file.bytes.len()).sum()
    }
}
