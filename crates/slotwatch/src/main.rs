mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use slotwatch_core::Mirror;

use crate::cli::{Cli, Command};
use crate::config::{LogFormat, LoggingSection};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Config drives the log format, so load it before tracing starts
    let loaded = config::load(&cli.global);
    let logging = loaded
        .as_ref()
        .map(|cfg| cfg.logging.clone())
        .unwrap_or_default();
    init_tracing(cli.global.verbose, &logging);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli, loaded).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, logging: &LoggingSection) {
    let filter = match verbosity {
        0 => logging.level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false);

    match logging.format {
        LogFormat::Full => builder.init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: Cli, loaded: Result<config::Config, CliError>) -> Result<(), CliError> {
    match cli.command {
        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "slotwatch", &mut std::io::stdout());
            Ok(())
        }

        // Config commands don't need a mirror
        Command::Config(args) => commands::config_cmd::handle(args, &loaded?, &cli.global),

        // Everything else works on a mirror restored from the state file
        cmd => {
            let cfg = loaded?;
            let mirror = Mirror::new(config::mirror_config(&cfg)?)?;

            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &mirror, &cfg, &cli.global).await
        }
    }
}
