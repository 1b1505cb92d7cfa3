//! Command dispatch: bridges CLI args -> mirror operations -> JSON output.

pub mod config_cmd;
pub mod entities;
pub mod serve;
pub mod tasks;

use slotwatch_core::Mirror;

use crate::cli::{Command, GlobalOpts};
use crate::config::Config;
use crate::error::CliError;

/// Dispatch a mirror-bound command to the appropriate handler.
///
/// One-shot commands restore the state file first and write it back
/// after any command that can change it. Commands that may write hold
/// the state lock from load to exit; read-only ones load without it.
pub async fn dispatch(
    cmd: Command,
    mirror: &Mirror,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let state_path = cfg.state_path();
    if matches!(cmd, Command::Show(_) | Command::List) {
        mirror.peek_state(&state_path).await?;
    } else {
        mirror.load_state(&state_path).await?;
    }

    let mutates = match cmd {
        Command::Serve => return serve::handle(mirror).await,
        Command::Register(args) => {
            entities::register(mirror, args, global)?;
            true
        }
        Command::Refresh(args) => {
            // Whatever landed before a failure is still worth keeping.
            let result = entities::refresh(mirror, args, global).await;
            mirror.save_state(&state_path).await?;
            return result;
        }
        Command::Show(args) => {
            entities::show(mirror, &args, global)?;
            false
        }
        Command::List => {
            entities::list(mirror, global)?;
            false
        }
        Command::Poll => {
            entities::poll(mirror, global).await?;
            true
        }
        Command::Task(args) => {
            tasks::handle(mirror, args, global).await?;
            true
        }
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    };

    if mutates {
        mirror.save_state(&state_path).await?;
    }
    Ok(())
}
