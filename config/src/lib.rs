//! Configuration loading for plank.
//!
//! Settings come from `~/.plank/config.toml`, with environment variables
//! taking precedence for deploy-specific values:
//!
//! - `PLANK_SERVER_URL` overrides `[server] url`
//! - `PLANK_DATA_DIR` overrides `[storage] data_dir`
//! - `PLANK_USER_NAME` / `PLANK_USER_EMAIL` override `[identity]`
//!
//! Every section defaults independently, so a partial file is fine.
//!
//! ```toml
//! [server]
//! url = "https://boards.example.com/api"
//!
//! [identity]
//! name = "Ada Lovelace"
//! email = "ada@example.com"
//!
//! [sync]
//! poll_interval_ms = 2000
//!
//! [storage]
//! data_dir = "/var/lib/plank"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

const CONFIG_DIR: &str = ".plank";
const CONFIG_FILE: &str = "config.toml";

const DEFAULT_SERVER_URL: &str = "http://localhost:4000/api";
const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
const DEFAULT_STREAM_IDLE_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid server url {url:?}: {source}")]
    ServerUrl { url: String, source: url::ParseError },
    #[error("server url {url:?} cannot be used as a base for API paths")]
    ServerUrlNotABase { url: String },
}

/// Serde helper for the poll interval default.
#[must_use]
const fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

#[must_use]
const fn default_stream_idle_timeout_secs() -> u64 {
    DEFAULT_STREAM_IDLE_TIMEOUT_SECS
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Base URL of the board REST backend.
    pub url: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            url: default_server_url(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Activity poll cadence while a board is mounted.
    pub poll_interval_ms: u64,
    /// Idle timeout on push event streams before they are considered dead.
    pub stream_idle_timeout_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            stream_idle_timeout_secs: default_stream_idle_timeout_secs(),
        }
    }
}

/// Who the viewer is. Matched against the board member list by name or
/// email; `id` is the account id used for comment authorship.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory for durable per-board state (notification lists, logs).
    /// Defaults to `~/.plank`.
    pub data_dir: Option<PathBuf>,
}

/// Fully resolved plank settings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub identity: IdentitySettings,
    pub sync: SyncSettings,
    pub storage: StorageSettings,
}

impl Settings {
    /// Load settings from the default config path, applying env overrides.
    ///
    /// A missing file yields defaults; a malformed file is an error rather
    /// than a silent fallback.
    pub fn load() -> Result<Self, ConfigError> {
        let settings = match config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        Ok(settings.with_env_overrides())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("PLANK_SERVER_URL")
            && !url.trim().is_empty()
        {
            self.server.url = url;
        }
        if let Ok(dir) = std::env::var("PLANK_DATA_DIR")
            && !dir.trim().is_empty()
        {
            self.storage.data_dir = Some(PathBuf::from(dir));
        }
        if let Ok(name) = std::env::var("PLANK_USER_NAME")
            && !name.trim().is_empty()
        {
            self.identity.name = name;
        }
        if let Ok(email) = std::env::var("PLANK_USER_EMAIL")
            && !email.trim().is_empty()
        {
            self.identity.email = email;
        }
        self
    }

    /// Validated base URL for the REST backend.
    ///
    /// Rejects URLs that cannot serve as a path base (`data:`, `mailto:`
    /// and friends), which would otherwise only fail at request time.
    pub fn server_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.server.url).map_err(|source| ConfigError::ServerUrl {
            url: self.server.url.clone(),
            source,
        })?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::ServerUrlNotABase {
                url: self.server.url.clone(),
            });
        }
        Ok(url)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.sync.poll_interval_ms.max(1))
    }

    #[must_use]
    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.sync.stream_idle_timeout_secs.max(1))
    }

    /// Resolved data directory, falling back to `~/.plank`.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(CONFIG_DIR)))
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR))
    }
}

/// Default config file path (`~/.plank/config.toml`), if a home dir exists.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
}
