//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let rendered = toml::to_string_pretty(cfg)?;
            output::print_output(rendered.trim_end())
        }
        ConfigCommand::Path => {
            output::print_output(&config::active_config_path(global).display().to_string())
        }
        ConfigCommand::Init { force } => {
            let path = config::active_config_path(global);
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            // Reject values the mirror would refuse before persisting them.
            config::mirror_config(cfg)?;
            let written = config::save_config(cfg, Some(&path))?;
            output::print_output(&written.display().to_string())
        }
    }
}
