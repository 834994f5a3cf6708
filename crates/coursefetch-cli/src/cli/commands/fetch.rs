//! `coursefetch fetch <url>` – list a page, then download one or all resources.

use anyhow::{bail, Context as _, Result};
use coursefetch_core::RunStatus;
use std::path::Path;
use std::sync::Arc;

use super::blocking;
use crate::cli::context::Context;
use crate::cli::save::save_file;

/// Which resources of the listing to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSelection {
    /// 1-based, as numbered by `list`.
    Index(usize),
    All,
}

impl FetchSelection {
    pub fn from_flags(index: Option<usize>, all: bool) -> Result<Self> {
        match (index, all) {
            (Some(0), _) => bail!("--index is 1-based"),
            (Some(n), false) => Ok(FetchSelection::Index(n)),
            (None, true) => Ok(FetchSelection::All),
            (Some(_), true) => bail!("--index and --all are mutually exclusive"),
            (None, false) => bail!("pass --index N or --all"),
        }
    }
}

pub async fn run_fetch(
    ctx: &Context,
    url: String,
    selection: FetchSelection,
    out: &Path,
) -> Result<()> {
    let session = ctx.login().await?;
    let engine = Arc::clone(&ctx.engine);
    let listing = {
        let session = session.clone();
        blocking(move || engine.list_resources(&session, &url)).await??
    };
    if listing.status != RunStatus::Complete {
        eprintln!("warning: listing ended early ({:?})", listing.status);
    }

    match selection {
        FetchSelection::Index(n) => {
            let resource = listing
                .resources()
                .nth(n - 1)
                .cloned()
                .with_context(|| format!("no resource #{n} (listing has {})", listing.resources().count()))?;
            let engine = Arc::clone(&ctx.engine);
            let file = blocking(move || engine.fetch_resource(&session, &resource)).await??;
            let path = save_file(out, &file.filename, &file.bytes)?;
            println!("Saved {} ({} bytes)", path.display(), file.bytes.len());
        }
        FetchSelection::All => {
            let resources: Vec<_> = listing.resources().cloned().collect();
            if resources.is_empty() {
                println!("Nothing to download.");
                return Ok(());
            }
            let engine = Arc::clone(&ctx.engine);
            let report = blocking(move || engine.fetch_all(&session, &resources)).await?;

            for fetched in &report.succeeded {
                let path = save_file(out, &fetched.file.filename, &fetched.file.bytes)?;
                println!("Saved {}", path.display());
            }
            for failed in &report.failed {
                eprintln!("failed {}: {}", failed.name, failed.error);
            }
            println!(
                "{} saved, {} failed, {} duplicate(s), {} bytes",
                report.succeeded.len(),
                report.failed.len(),
                report.duplicates,
                report.total_bytes()
            );
            if report.status == RunStatus::SessionExpired {
                bail!("session expired during download; log in again and retry");
            }
        }
    }
    Ok(())
}
