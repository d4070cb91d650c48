//! Fatal restart path.
//!
//! After an unrecoverable link failure the node gives up all in-memory state
//! and starts over: either by exiting with [`EXIT_CODE_RESTART`] for a
//! supervisor (systemd `Restart=on-failure`) to relaunch it, or by
//! re-executing its own binary in place.

use serde::Deserialize;
use std::process::Command;
use tracing::error;

use crate::error::NodeError;

/// Exit status reported on fatal restart (`EX_TEMPFAIL`)
pub const EXIT_CODE_RESTART: i32 = 75;

/// How the process restarts itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    /// Exit and leave the relaunch to the supervisor
    Exit,
    /// Replace the process image with a fresh copy of itself
    Exec,
}

/// Command that relaunches the current binary with the same arguments
pub fn restart_command() -> std::io::Result<Command> {
    let exe = std::env::current_exe()?;
    let mut command = Command::new(exe);
    command.args(std::env::args_os().skip(1));
    Ok(command)
}

/// Restart the process; never returns
pub fn fatal(policy: RestartPolicy, reason: &NodeError) -> ! {
    error!("Fatal error, restarting: {}", reason);

    if policy == RestartPolicy::Exec {
        let err = reexec();
        error!("Re-exec failed, exiting instead: {}", err);
    }

    std::process::exit(EXIT_CODE_RESTART)
}

#[cfg(unix)]
fn reexec() -> std::io::Error {
    use std::os::unix::process::CommandExt;

    match restart_command() {
        Ok(mut command) => command.exec(),
        Err(e) => e,
    }
}

#[cfg(not(unix))]
fn reexec() -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "re-exec is only supported on Unix",
    )
}
