//! `coursefetch list <url>` – list and resolve the resources of a page.

use anyhow::Result;
use coursefetch_core::discovery::Advisory;
use coursefetch_core::engine::Listing;
use coursefetch_core::resolver::Outcome;
use coursefetch_core::RunStatus;
use std::fmt::Write;
use std::sync::Arc;

use super::blocking;
use crate::cli::context::Context;

pub async fn run_list(ctx: &Context, url: String, json: bool) -> Result<()> {
    let session = ctx.login().await?;
    let engine = Arc::clone(&ctx.engine);
    let listing = blocking(move || engine.list_resources(&session, &url)).await??;
    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        print!("{}", render_listing(&listing));
    }
    Ok(())
}

/// Human-readable listing. Resources are numbered from 1 across groups,
/// matching `fetch --index`.
pub fn render_listing(listing: &Listing) -> String {
    let mut out = String::new();
    if let Some(name) = &listing.category_name {
        let _ = writeln!(out, "Category: {name}");
    }
    if listing.groups.is_empty() && listing.failures.is_empty() {
        let _ = writeln!(out, "No courses found.");
    }

    let mut n = 0;
    for group in &listing.groups {
        let title = group.course_name.as_deref().unwrap_or("(untitled)");
        let _ = writeln!(out, "== {title} <{}>", group.course_url);
        if group.advisory == Some(Advisory::NoLinksFound) {
            let _ = writeln!(out, "   no downloadable links found");
        }
        for r in &group.resources {
            n += 1;
            let state = match &r.outcome {
                Outcome::File {
                    file_url, strategy, ..
                } => format!("{file_url} [{strategy:?}]"),
                Outcome::NotResolved => "(not resolved)".to_string(),
                Outcome::Failed { error } => format!("(failed: {error})"),
            };
            let _ = writeln!(out, "{n:>4}. {}  {state}", r.name);
        }
    }
    for f in &listing.failures {
        let _ = writeln!(out, "skipped {}: {}", f.url, f.error);
    }
    match listing.status {
        RunStatus::Complete => {}
        RunStatus::PartiallyCompleted => {
            let _ = writeln!(out, "warning: time limit reached, listing is partial");
        }
        RunStatus::SessionExpired => {
            let _ = writeln!(out, "warning: session expired, listing is partial");
        }
    }
    out
}
