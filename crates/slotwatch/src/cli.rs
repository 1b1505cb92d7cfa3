//! Clap derive structures for the `slotwatch` CLI.
//!
//! Defines the command tree and global flags.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use slotwatch_core::{EntityId, TaskKind};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// slotwatch -- mirror node slot counters and manage their cron tasks
#[derive(Debug, Parser)]
#[command(
    name = "slotwatch",
    version,
    about = "Mirror node slot counters and manage their cron tasks",
    long_about = "Keeps a local cache of each tracked process's scheduled slot and\n\
        computed slot, polled from a node, and starts or stops the node's\n\
        cron tasks that drive them.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Node base URL (overrides [node] base_url)
    #[arg(long, short = 'n', global = true)]
    pub node: Option<String>,

    /// State file (overrides [state] path)
    #[arg(long, short = 's', global = true)]
    pub state: Option<PathBuf>,

    /// Request timeout in seconds (overrides [node] timeout_secs)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Accept self-signed node certificates
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Emit single-line JSON
    #[arg(long, global = true)]
    pub compact: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the poller and autosave until interrupted
    Serve,

    /// Track an entity (idempotent)
    #[command(alias = "add")]
    Register(RegisterArgs),

    /// Sync one entity from the node now and print it
    Refresh(EntityArg),

    /// Print one entity from the cache
    Show(EntityArg),

    /// Print every tracked entity from the cache
    #[command(alias = "ls")]
    List,

    /// Run a single poll pass over every entity
    Poll,

    /// Manage node cron tasks bound to entities
    Task(TaskArgs),

    /// Inspect or write the configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Entity arguments ─────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RegisterArgs {
    /// Process id on the node
    pub id: EntityId,

    /// Display name
    #[arg(long, default_value = "")]
    pub name: String,

    /// Free-form grouping label
    #[arg(long, default_value = "")]
    pub category: String,
}

#[derive(Debug, Args)]
pub struct EntityArg {
    /// Process id on the node
    pub id: EntityId,
}

// ── Task arguments ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommand,
}

#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    /// Create a cron task for an entity and bind it
    Start {
        /// Process id on the node
        id: EntityId,

        /// once or every (every = 5-minutes)
        #[arg(long, default_value = "once")]
        kind: TaskKind,
    },

    /// Stop an entity's task and clear the binding
    Stop {
        /// Process id on the node
        id: EntityId,
    },

    /// Clear bindings whose task the node no longer lists
    Reconcile,
}

// ── Config arguments ─────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,

    /// Print the config file path
    Path,

    /// Write the effective configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: Shell,
}
