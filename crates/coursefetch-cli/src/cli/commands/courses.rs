//! `coursefetch courses <category-url>` – list the courses of a category.

use anyhow::Result;
use std::sync::Arc;

use super::blocking;
use crate::cli::context::Context;

pub async fn run_courses(ctx: &Context, url: String) -> Result<()> {
    let session = ctx.login().await?;
    let engine = Arc::clone(&ctx.engine);
    let listing = blocking(move || engine.list_courses(&session, &url)).await??;
    if let Some(name) = &listing.category_name {
        println!("{name}");
    }
    if listing.courses.is_empty() {
        println!("No courses in this category.");
        return Ok(());
    }
    println!("{:<6} {:<40} {}", "ID", "NAME", "URL");
    for c in listing.courses {
        println!("{:<6} {:<40} {}", c.id, c.name, c.url);
    }
    Ok(())
}
