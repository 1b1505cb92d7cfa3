//! CLI configuration: thin wrapper around `slotwatch_config`.
//!
//! Loads the shared config and layers the `GlobalOpts` flag overrides
//! (--node, --state, --timeout, --insecure) on top.

use std::path::PathBuf;

use slotwatch_core::MirrorConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use slotwatch_config::{Config, LogFormat, LoggingSection, config_path, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// The config file this invocation reads.
pub fn active_config_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Load the config file + environment, then apply flag overrides.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = slotwatch_config::load_config(Some(&active_config_path(global)))?;

    if let Some(ref node) = global.node {
        cfg.node.base_url.clone_from(node);
    }
    if let Some(timeout) = global.timeout {
        cfg.node.timeout_secs = timeout;
    }
    if global.insecure {
        cfg.node.insecure = true;
    }
    if let Some(ref state) = global.state {
        cfg.state.path = Some(state.clone());
    }
    Ok(cfg)
}

/// Build the `MirrorConfig` for this invocation.
pub fn mirror_config(cfg: &Config) -> Result<MirrorConfig, CliError> {
    Ok(cfg.to_mirror_config()?)
}
