//! `coursefetch categories` – list course categories.

use anyhow::Result;
use std::sync::Arc;

use super::blocking;
use crate::cli::context::Context;

pub async fn run_categories(ctx: &Context) -> Result<()> {
    let session = ctx.login().await?;
    let engine = Arc::clone(&ctx.engine);
    let categories = blocking(move || engine.list_categories(&session)).await??;
    if categories.is_empty() {
        println!("No categories found.");
        return Ok(());
    }
    println!("{:<6} {:<40} {}", "ID", "NAME", "URL");
    for c in categories {
        println!("{:<6} {:<40} {}", c.id, c.name, c.url);
    }
    Ok(())
}
