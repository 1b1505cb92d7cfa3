//! Output rendering. Every command prints JSON to stdout.

use std::io::{self, Write};

use serde::Serialize;

use crate::error::CliError;

/// Serialize `data` as pretty or single-line JSON.
pub fn render_json<T: Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let out = if compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    };
    Ok(out)
}

/// Render and print to stdout.
pub fn print_json<T: Serialize + ?Sized>(data: &T, compact: bool) -> Result<(), CliError> {
    print_output(&render_json(data, compact)?)
}

/// Print already-rendered output to stdout.
pub fn print_output(output: &str) -> Result<(), CliError> {
    if output.is_empty() {
        return Ok(());
    }
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{output}")?;
    Ok(())
}
