//! Shared state for command handlers: the engine, portal and credentials.

use anyhow::{anyhow, Context as _, Result};
use coursefetch_core::config::CoursefetchConfig;
use coursefetch_core::{Credentials, Engine, Session};
use std::sync::Arc;

use super::Cli;

pub struct Context {
    pub engine: Arc<Engine>,
    pub portal: String,
    credentials: Option<Credentials>,
}

impl Context {
    pub fn new(cli: &Cli, cfg: &CoursefetchConfig) -> Result<Self> {
        let portal = cli
            .portal
            .clone()
            .or_else(|| cfg.portal_url.clone())
            .ok_or_else(|| {
                anyhow!("no portal URL: pass --portal or set portal_url in the config file")
            })?;

        let mut engine_cfg = cfg.engine_config();
        if let Some(n) = cli.workers {
            engine_cfg.workers = n.max(1);
        }

        let credentials = match (&cli.username, &cli.password) {
            (Some(user), Some(pass)) => Some(Credentials::new(user.clone(), pass.clone())),
            _ => None,
        };

        Ok(Self {
            engine: Arc::new(Engine::with_curl(engine_cfg)),
            portal,
            credentials,
        })
    }

    /// Logs in on a blocking thread.
    pub async fn login(&self) -> Result<Session> {
        let credentials = self.credentials.clone().ok_or_else(|| {
            anyhow!(
                "credentials required: pass --username/--password or set COURSEFETCH_USERNAME/COURSEFETCH_PASSWORD"
            )
        })?;
        let engine = Arc::clone(&self.engine);
        let portal = self.portal.clone();
        let session = tokio::task::spawn_blocking(move || engine.login(&credentials, &portal))
            .await
            .context("login task panicked")?
            .with_context(|| format!("login to {} failed", self.portal))?;
        Ok(session)
    }
}
