//! CLI for coursefetch.

mod commands;
mod context;
mod save;

use anyhow::Result;
use clap::{Parser, Subcommand};
use coursefetch_core::config;
use std::path::PathBuf;

use commands::{run_categories, run_courses, run_fetch, run_list, run_login, FetchSelection};
use context::Context;

/// Top-level CLI for coursefetch.
#[derive(Debug, Parser)]
#[command(name = "coursefetch")]
#[command(about = "coursefetch: list and download course files from a Moodle portal", long_about = None)]
pub struct Cli {
    /// Portal root URL (overrides `portal_url` from the config file).
    #[arg(long, global = true, env = "COURSEFETCH_PORTAL", value_name = "URL")]
    pub portal: Option<String>,

    /// Portal username.
    #[arg(long, short = 'u', global = true, env = "COURSEFETCH_USERNAME")]
    pub username: Option<String>,

    /// Portal password.
    #[arg(long, global = true, env = "COURSEFETCH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Resolve and download up to N resources concurrently (overrides config).
    #[arg(long, global = true, value_name = "N")]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Check the credentials against the portal.
    Login,

    /// List the resources of a course or category page.
    List {
        /// Course (`course/view.php?id=`) or category (`course/index.php?categoryid=`) URL.
        url: String,
        /// Print the listing as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Download resources of a course or category page.
    Fetch {
        /// Course or category URL.
        url: String,
        /// Download only resource N, as numbered by `list`.
        #[arg(long, value_name = "N", conflicts_with = "all")]
        index: Option<usize>,
        /// Download every resolved resource.
        #[arg(long)]
        all: bool,
        /// Directory to save files into (default: current directory).
        #[arg(long, short = 'o', value_name = "DIR")]
        out: Option<PathBuf>,
    },

    /// List the courses of a category page.
    Courses {
        /// Category URL.
        url: String,
    },

    /// List the portal's course categories.
    Categories,
}

impl Cli {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let ctx = Context::new(&cli, &cfg)?;

        match cli.command {
            CliCommand::Login => run_login(&ctx).await?,
            CliCommand::List { url, json } => run_list(&ctx, url, json).await?,
            CliCommand::Fetch {
                url,
                index,
                all,
                out,
            } => {
                let selection = FetchSelection::from_flags(index, all)?;
                let out = match out {
                    Some(dir) => dir,
                    None => std::env::current_dir()?,
                };
                run_fetch(&ctx, url, selection, &out).await?;
            }
            CliCommand::Courses { url } => run_courses(&ctx, url).await?,
            CliCommand::Categories => run_categories(&ctx).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
