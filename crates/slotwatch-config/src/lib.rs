//! Shared configuration for slotwatch.
//!
//! TOML file + `SLOTWATCH_` environment overrides, merged with figment,
//! and translation to `slotwatch_core::MirrorConfig`. The CLI layers its
//! flag overrides on top of the loaded [`Config`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use slotwatch_core::{DEFAULT_NODE_URL, MirrorConfig};

/// Prefix for environment overrides; `__` separates nested keys,
/// e.g. `SLOTWATCH_NODE__BASE_URL`.
pub const ENV_PREFIX: &str = "SLOTWATCH_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub node: NodeSection,

    #[serde(default)]
    pub poller: PollerSection,

    #[serde(default)]
    pub state: StateSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NodeSection {
    /// Node base URL (e.g., "http://127.0.0.1:8734").
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Accept self-signed node certificates.
    #[serde(default)]
    pub insecure: bool,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            insecure: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PollerSection {
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for PollerSection {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StateSection {
    /// State file. Unset means the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Autosave period while serving; 0 saves only on shutdown.
    #[serde(default = "default_autosave")]
    pub autosave_secs: u64,
}

impl Default for StateSection {
    fn default() -> Self {
        Self {
            path: None,
            autosave_secs: default_autosave(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingSection {
    /// Default filter directive when neither `RUST_LOG` nor `-v` is given.
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Json,
}

fn default_base_url() -> String {
    DEFAULT_NODE_URL.into()
}
fn default_timeout() -> u64 {
    30
}
fn default_poll_interval() -> u64 {
    60
}
fn default_autosave() -> u64 {
    60
}
fn default_level() -> String {
    "warn".into()
}
fn default_true() -> bool {
    true
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "slotwatch", "slotwatch")
}

fn home_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("slotwatch");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default state file location when `[state] path` is unset.
pub fn default_state_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".local/share").join("state.json"),
        |dirs| dirs.data_dir().join("state.json"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Defaults, then the TOML file, then `SLOTWATCH_` environment variables.
pub fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load the full Config from `path` (or the canonical path) + environment.
///
/// A missing file is not an error; defaults and env still apply.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    let config: Config = figment_for(&path).extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path` (or the canonical path).
pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(path)
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// The state file this config points at.
    pub fn state_path(&self) -> PathBuf {
        self.state.path.clone().unwrap_or_else(default_state_path)
    }

    /// Validate and build a `MirrorConfig`.
    pub fn to_mirror_config(&self) -> Result<MirrorConfig, ConfigError> {
        let node_url: url::Url = self
            .node
            .base_url
            .parse()
            .map_err(|e| ConfigError::Validation {
                field: "node.base_url".into(),
                reason: format!("invalid URL {:?}: {e}", self.node.base_url),
            })?;
        if !matches!(node_url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation {
                field: "node.base_url".into(),
                reason: format!("expected http or https, got '{}'", node_url.scheme()),
            });
        }

        if self.node.timeout_secs == 0 {
            return Err(ConfigError::Validation {
                field: "node.timeout_secs".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.poller.enabled && self.poller.interval_secs == 0 {
            return Err(ConfigError::Validation {
                field: "poller.interval_secs".into(),
                reason: "must be at least 1 while the poller is enabled".into(),
            });
        }

        Ok(MirrorConfig {
            node_url,
            timeout: Duration::from_secs(self.node.timeout_secs),
            poll_interval_secs: if self.poller.enabled {
                self.poller.interval_secs
            } else {
                0
            },
            state_path: Some(self.state_path()),
            autosave_interval_secs: self.state.autosave_secs,
            accept_invalid_certs: self.node.insecure,
        })
    }
}
