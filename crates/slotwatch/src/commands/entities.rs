//! Entity command handlers: register, refresh, show, list, poll.

use serde::Serialize;

use slotwatch_core::{Mirror, Registration};

use crate::cli::{EntityArg, GlobalOpts, RegisterArgs};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct Registered<'a> {
    id: &'a str,
    #[serde(flatten)]
    registration: Registration,
}

pub fn register(mirror: &Mirror, args: RegisterArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let id = args.id;
    let registration = mirror.register_entity(id.clone(), args.name, args.category);
    output::print_json(
        &Registered {
            id: id.as_str(),
            registration,
        },
        global.compact,
    )
}

pub async fn refresh(mirror: &Mirror, args: EntityArg, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = mirror.refresh(&args.id).await?;
    output::print_json(&snapshot, global.compact)
}

pub fn show(mirror: &Mirror, args: &EntityArg, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = mirror.snapshot(&args.id).ok_or_else(|| CliError::NotFound {
        entity: args.id.to_string(),
    })?;
    output::print_json(&snapshot, global.compact)
}

pub fn list(mirror: &Mirror, global: &GlobalOpts) -> Result<(), CliError> {
    output::print_json(&mirror.list_all(), global.compact)
}

pub async fn poll(mirror: &Mirror, global: &GlobalOpts) -> Result<(), CliError> {
    let outcome = mirror.poll_once().await;
    output::print_json(&outcome, global.compact)
}
