use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::EngineConfig;
use crate::fetch::DEFAULT_USER_AGENT;

/// Global configuration loaded from `~/.config/coursefetch/config.toml`.
///
/// Credentials are never stored here; they come from flags or the
/// environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoursefetchConfig {
    /// Portal root, e.g. `https://moodle.example.edu/`. Overridden by `--portal`.
    #[serde(default)]
    pub portal_url: Option<String>,
    /// Per-request timeout in seconds.
    pub page_timeout_secs: u64,
    /// TCP/TLS connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Budget for one listing or batch download, in seconds.
    pub operation_deadline_secs: u64,
    /// Concurrent resolutions/downloads (1 = sequential).
    pub workers: usize,
    /// Optional `User-Agent` override.
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for CoursefetchConfig {
    fn default() -> Self {
        Self {
            portal_url: None,
            page_timeout_secs: 30,
            connect_timeout_secs: 15,
            operation_deadline_secs: 300,
            workers: 1,
            user_agent: None,
        }
    }
}

impl CoursefetchConfig {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            // libcurl reads a zero timeout as "none"
            page_timeout: Duration::from_secs(self.page_timeout_secs.max(1)),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs.max(1)),
            operation_deadline: Duration::from_secs(self.operation_deadline_secs),
            workers: self.workers.max(1),
            user_agent: self
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("coursefetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<CoursefetchConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<CoursefetchConfig> {
    if !path.exists() {
        let default_cfg = CoursefetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let cfg: CoursefetchConfig =
        toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    Ok(cfg)
}
