use anyhow::{anyhow, Context, Result};
use std::io;
use std::process::{Command, Output};

pub(crate) fn run_command(command: &mut Command, context_message: &str) -> Result<()> {
    run_command_capture(command, context_message).map(|_| ())
}

/// Runs `command` to completion and returns its trimmed stdout.
///
/// Both streams are captured in full before the exit status is inspected; a
/// non-zero status turns into an error carrying the status and both streams.
pub(crate) fn run_command_capture(command: &mut Command, context_message: &str) -> Result<String> {
    let output = command
        .output()
        .with_context(|| format!("{context_message}: command failed to start"))?;
    check_output(&output, command, context_message)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn check_output(output: &Output, command: &Command, context_message: &str) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    Err(anyhow!(
        "{context_message}: command={command:?} status={} stdout='{}' stderr='{}'",
        output.status,
        stdout.trim(),
        stderr.trim()
    ))
}

pub(crate) fn error_chain_has_not_found(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|io_err| io_err.kind() == io::ErrorKind::NotFound)
    })
}

pub(crate) fn escape_ps_single_quote(value: &str) -> String {
    value.replace('\'', "''")
}
