//! CLI command handlers. Each command is in its own file.
//!
//! The engine is blocking; handlers move it onto `spawn_blocking`.

mod categories;
mod courses;
mod fetch;
mod list;
mod login;

use anyhow::{Context, Result};

pub use categories::run_categories;
pub use courses::run_courses;
pub use fetch::{run_fetch, FetchSelection};
pub use list::run_list;
pub use login::run_login;

async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .context("engine task panicked")
}
