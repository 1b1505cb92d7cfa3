//! Task command handlers.

use serde::Serialize;

use slotwatch_core::{Mirror, StopOutcome};

use crate::cli::{GlobalOpts, TaskArgs, TaskCommand};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct Stopped<'a> {
    id: &'a str,
    outcome: StopOutcome,
}

pub async fn handle(mirror: &Mirror, args: TaskArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        TaskCommand::Start { id, kind } => {
            let binding = mirror.start_task(&id, kind).await?;
            output::print_json(&binding, global.compact)
        }
        TaskCommand::Stop { id } => {
            let outcome = mirror.stop_task(&id).await?;
            output::print_json(
                &Stopped {
                    id: id.as_str(),
                    outcome,
                },
                global.compact,
            )
        }
        TaskCommand::Reconcile => {
            let report = mirror.reconcile_tasks().await?;
            output::print_json(&report, global.compact)
        }
    }
}
