//! `coursefetch login` – check credentials against the portal.

use anyhow::Result;

use crate::cli::context::Context;

pub async fn run_login(ctx: &Context) -> Result<()> {
    let session = ctx.login().await?;
    println!(
        "Logged in to {} (cookies: {})",
        session.base_url(),
        session.cookies().names().join(", ")
    );
    Ok(())
}
