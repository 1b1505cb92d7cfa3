//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use slotwatch_config::ConfigError;
use slotwatch_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    /// `EX_CONFIG` from sysexits.h.
    pub const CONFIG: i32 = 78;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Node ─────────────────────────────────────────────────────────
    #[error("Node unavailable{status}: {message}")]
    #[diagnostic(
        code(slotwatch::node_unavailable),
        help(
            "Check that the node is running and reachable.\n\
             Point at another node with --node or [node] base_url."
        )
    )]
    NodeUnavailable { status: String, message: String },

    #[error("Node sent an unexpected response: {body:?}")]
    #[diagnostic(code(slotwatch::malformed_response))]
    MalformedResponse { body: String },

    // ── Entities & tasks ─────────────────────────────────────────────
    #[error("Entity '{entity}' is not registered")]
    #[diagnostic(
        code(slotwatch::not_found),
        help("Run: slotwatch register {entity}")
    )]
    NotFound { entity: String },

    #[error("Entity '{entity}' has no active task")]
    #[diagnostic(
        code(slotwatch::no_active_task),
        help("Start one with: slotwatch task start {entity}")
    )]
    NoActiveTask { entity: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(slotwatch::validation))]
    Validation { field: String, reason: String },

    // ── Configuration & state ────────────────────────────────────────
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(slotwatch::config),
        help("Inspect the effective configuration with: slotwatch config show")
    )]
    Config { message: String },

    #[error("Config file already exists at {path}")]
    #[diagnostic(
        code(slotwatch::config_exists),
        help("Pass --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error("State file {path}: {message}")]
    #[diagnostic(
        code(slotwatch::state),
        help("Move the file aside or pass a different one with --state.")
    )]
    State { path: String, message: String },

    #[error("State file {path} is in use by another slotwatch process")]
    #[diagnostic(
        code(slotwatch::state_locked),
        help(
            "A running `slotwatch serve` owns this file until it exits.\n\
             Stop it first, or pass a different file with --state."
        )
    )]
    StateLocked { path: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(slotwatch::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render TOML: {0}")]
    #[diagnostic(code(slotwatch::toml))]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NodeUnavailable { .. } => exit_code::CONNECTION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::NoActiveTask { .. } | Self::ConfigExists { .. } | Self::StateLocked { .. } => {
                exit_code::CONFLICT
            }
            Self::Validation { .. } => exit_code::USAGE,
            Self::Config { .. } => exit_code::CONFIG,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UpstreamUnavailable { status, message } => CliError::NodeUnavailable {
                status: status.map(|s| format!(" (HTTP {s})")).unwrap_or_default(),
                message,
            },
            CoreError::MalformedResponse { body } => CliError::MalformedResponse { body },
            CoreError::EntityNotFound { entity } => CliError::NotFound {
                entity: entity.to_string(),
            },
            CoreError::NoActiveTask { entity } => CliError::NoActiveTask {
                entity: entity.to_string(),
            },
            CoreError::InvalidEntityId { id, reason } => CliError::Validation {
                field: format!("entity id {id:?}"),
                reason,
            },
            CoreError::Persistence { path, message } => CliError::State { path, message },
            CoreError::StateLocked { path } => CliError::StateLocked { path },
            CoreError::Config { message } => CliError::Config { message },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
