//! Blocking invocation of the container-engine binary.

use crate::error::CommandError;
use std::ffi::OsStr;
use std::process::Command;

#[derive(Clone, Debug)]
pub(crate) struct CommandOutput {
    pub stdout: String,
}

/// Run `program args...`, wait for exit, and map a non-zero status to [`CommandError`].
///
/// Both streams are captured; on failure the error carries stdout followed by stderr.
pub(crate) fn run<I, S>(program: &str, args: I) -> Result<CommandOutput, CommandError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<S> = args.into_iter().collect();
    let command = render(program, &args);
    tracing::debug!(%command, "running container engine");

    let output = Command::new(program)
        .args(&args)
        .output()
        .map_err(|source| CommandError::Spawn {
            command: command.clone(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !output.status.success() {
        let combined = format!("{}{}", stdout, stderr).trim().to_string();
        let status = match output.status.code() {
            Some(code) => format!("exit code {code}"),
            None => "signal".to_string(),
        };
        tracing::debug!(%command, %status, output = %combined, "container engine failed");
        return Err(CommandError::Status {
            command,
            status,
            output: combined,
        });
    }

    if !stderr.trim().is_empty() {
        tracing::trace!(%command, stderr = %stderr.trim(), "container engine stderr");
    }

    Ok(CommandOutput { stdout })
}

fn render<S: AsRef<OsStr>>(program: &str, args: &[S]) -> String {
    let mut out = program.to_string();
    for arg in args {
        out.push(' ');
        out.push_str(&arg.as_ref().to_string_lossy());
    }
    out
}

/// Last non-empty line of a command's stdout, trimmed.
pub(crate) fn last_line(stdout: &str) -> Option<&str> {
    stdout.lines().rev().map(str::trim).find(|l| !l.is_empty())
}
