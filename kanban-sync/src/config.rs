//! Configuration loading using figment.
//!
//! Sources, later ones overriding earlier ones:
//! 1. Built-in defaults
//! 2. `kanban-sync.toml`, `kanban-sync.yaml`/`.yml` and `kanban-sync.json` in
//!    the working directory, or a single explicitly named file
//! 3. `KANBAN_SYNC_*` environment variables (`KANBAN_SYNC_BOARD_ID=7`)

use crate::error::{Result, SyncError};
use crate::store::{BoardsProxyStore, RestStore};
use crate::types::{BoardId, TeamId};
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, trace};

/// Base name of discovered configuration files
pub const CONFIG_FILE_STEM: &str = "kanban-sync";

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "KANBAN_SYNC_";

/// Which kind of board the engine talks to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// First-party `/kanban` REST API
    #[default]
    Rest,
    /// Third-party boards reached through the `/mattermost` proxy
    BoardsProxy,
}

/// Connection settings for a board store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub backend: Backend,
    pub base_url: String,
    /// Bearer token (REST) or session cookie value (boards proxy)
    #[serde(default)]
    pub token: Option<String>,
    /// Numeric ids from the environment are accepted as well as strings
    #[serde(default)]
    pub board_id: Option<BoardId>,
    #[serde(default)]
    pub team_id: Option<TeamId>,
    pub timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Rest,
            base_url: "http://127.0.0.1:8000".to_string(),
            token: None,
            board_id: None,
            team_id: None,
            timeout_secs: 30,
        }
    }
}

impl SyncConfig {
    /// Load from defaults, files discovered in the working directory and the environment
    pub fn load() -> Result<Self> {
        let dir = std::env::current_dir()
            .map_err(|e| SyncError::invalid_value("config", e.to_string()))?;
        Self::extract(Self::figment(discover_files(&dir))?)
    }

    /// Load from defaults, the file at `path` and the environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SyncError::invalid_value(
                "config",
                format!("{} does not exist", path.display()),
            ));
        }
        Self::extract(Self::figment(vec![path.to_path_buf()])?)
    }

    fn figment(files: Vec<PathBuf>) -> Result<Figment> {
        let mut figment = Figment::new().merge(Serialized::defaults(SyncConfig::default()));
        for file in files {
            trace!(path = %file.display(), "loading config file");
            figment = figment.merge(file_provider(&file)?);
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).map(|key| key.as_str().to_lowercase().into())))
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: SyncConfig = figment.extract()?;
        config.validate()?;
        debug!(backend = ?config.backend, base_url = %config.base_url, "configuration loaded");
        Ok(config)
    }

    /// Check values figment cannot check on its own
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| SyncError::invalid_value("base_url", e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SyncError::invalid_value(
                "base_url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(SyncError::invalid_value("timeout_secs", "must be positive"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn board_id(&self) -> Result<BoardId> {
        self.board_id
            .clone()
            .ok_or_else(|| SyncError::missing_field("board_id"))
    }

    pub fn team_id(&self) -> Result<TeamId> {
        self.team_id
            .clone()
            .ok_or_else(|| SyncError::missing_field("team_id"))
    }

    pub fn rest_store(&self) -> Result<RestStore> {
        RestStore::new(&self.base_url, self.token.as_deref(), self.timeout())
    }

    /// The proxy needs a team to resolve assignees
    pub fn boards_proxy_store(&self) -> Result<BoardsProxyStore> {
        BoardsProxyStore::new(
            &self.base_url,
            self.token.as_deref(),
            self.team_id()?,
            self.timeout(),
        )
    }
}

/// Configuration files present in `dir`, in merge order
fn discover_files(dir: &Path) -> Vec<PathBuf> {
    ["toml", "yaml", "yml", "json"]
        .iter()
        .map(|ext| dir.join(format!("{CONFIG_FILE_STEM}.{ext}")))
        .filter(|path| path.is_file())
        .collect()
}

fn file_provider(path: &Path) -> Result<Figment> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Ok(Figment::from(Toml::file(path))),
        Some("yaml") | Some("yml") => Ok(Figment::from(Yaml::file(path))),
        Some("json") => Ok(Figment::from(Json::file(path))),
        _ => Err(SyncError::invalid_value(
            "config",
            format!("unsupported config format: {}", path.display()),
        )),
    }
}
