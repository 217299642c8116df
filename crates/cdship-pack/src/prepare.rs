//! Project preparation hook.
//!
//! Runs the configured command (typically a script that copies the
//! application into the distribution directory) through the platform shell,
//! from the project root, with the operator's terminal attached.

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("failed to run `{command}`: {source}")]
    Spawn { command: String, source: io::Error },
    #[error("`{command}` exited with {}", exit_label(.code))]
    Failed { command: String, code: Option<i32> },
}

pub fn prepare(command: &str, workdir: &Path) -> Result<(), PrepareError> {
    info!(%command, workdir = %workdir.display(), "running prepare command");

    let mut cmd = shell(command);
    cmd.current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    debug!("Running: {:?}", cmd);

    let status = cmd.status().map_err(|source| PrepareError::Spawn {
        command: command.to_string(),
        source,
    })?;

    if !status.success() {
        return Err(PrepareError::Failed {
            command: command.to_string(),
            code: status.code(),
        });
    }
    Ok(())
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("code {c}"),
        None => "a signal".to_string(),
    }
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
