//! Process execution utilities
//!
//! Used to hand validated variants to the external build toolchain.

use crate::error::{Error, ErrorCode, Result};
use std::path::Path;
use std::process::{Command, Stdio};

fn spawn_error(program: &str, err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::command_not_found(program).with_source(err)
    } else {
        Error::process(format!("Failed to execute {}: {}", program, err)).with_source(err)
    }
}

/// Run a command in a directory with extra environment, streaming its output
pub fn run_streaming_in_dir(
    program: &str,
    args: &[&str],
    dir: &Path,
    env: &[(&str, &str)],
) -> Result<i32> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(dir)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    for (key, value) in env {
        cmd.env(key, value);
    }

    tracing::debug!(program, ?args, dir = %dir.display(), "Spawning process");

    let status = cmd.status().map_err(|e| spawn_error(program, e))?;
    let code = status.code().unwrap_or(-1);
    if !status.success() {
        tracing::debug!(program, code, "Process exited unsuccessfully");
    }
    Ok(code)
}

/// Turn a non-zero exit code into an error
pub fn ensure_success(program: &str, code: i32) -> Result<()> {
    if code == 0 {
        Ok(())
    } else {
        Err(Error::new(
            ErrorCode::CommandFailed,
            format!("{} exited with status {}", program, code),
        ))
    }
}
