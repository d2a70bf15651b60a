// Copyright 2025-Present the logship contributors
// SPDX-License-Identifier: Apache-2.0

//! The monitored workload: a command running inside a Docker container.
//!
//! The pipeline only needs the collaborator surface: one readable stream
//! per output channel, a liveness poll, and graceful/forced stop. The
//! container is started with `--rm` so Docker removes it on exit, `-t` so
//! the workload's stdout is not block-buffered, and `--entrypoint bash` so
//! any image runs the given bash command regardless of its own entrypoint.

use crate::error::Error;
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{debug, warn};

/// A spawned workload process with piped output streams.
pub struct Workload {
    child: Child,
}

impl Workload {
    /// Run `bash -c <command>` inside `image` via `docker run`.
    pub fn run_container(image: &str, command: &str) -> Result<Self, Error> {
        Self::spawn(
            "docker",
            &[
                "run", "--rm", "-t", "--entrypoint", "bash", image, "-c", command,
            ],
        )
    }

    /// Spawn an arbitrary program with piped stdout/stderr. This is the
    /// whole collaborator contract; tests drive the pipeline with plain
    /// `sh -c` children through it.
    pub fn spawn(program: &str, args: &[&str]) -> Result<Self, Error> {
        let child = Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Release the process on every exit path, panics included.
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::WorkloadStart(format!("{program}: {e}")))?;

        debug!(program, pid = child.id(), "Workload spawned");
        Ok(Self { child })
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Non-blocking liveness poll.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Wait for the workload to exit.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Request a graceful stop. On unix this delivers SIGTERM so the
    /// container client can tear down; elsewhere it degrades to a kill.
    pub fn stop(&mut self) {
        #[cfg(unix)]
        {
            if let Some(pid) = self.child.id() {
                debug!(pid, "Sending SIGTERM to workload");
                // Safety: plain kill(2) on a pid we own.
                unsafe {
                    libc::kill(pid as libc::pid_t, libc::SIGTERM);
                }
                return;
            }
        }
        self.kill();
    }

    /// Force-terminate the workload.
    pub fn kill(&mut self) {
        if !self.is_running() {
            return;
        }
        if let Err(e) = self.child.start_kill() {
            warn!(error = %e, "Failed to kill workload");
        }
    }
}

/// Preflight check that the Docker daemon is reachable.
pub async fn docker_daemon_running() -> bool {
    Command::new("docker")
        .arg("info")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_spawn_pipes_both_streams() {
        let mut workload = Workload::spawn("sh", &["-c", "echo out; echo err >&2"]).unwrap();
        let mut stdout = workload.take_stdout().unwrap();
        let mut stderr = workload.take_stderr().unwrap();

        workload.wait().await.unwrap();

        let mut out = String::new();
        stdout.read_to_string(&mut out).await.unwrap();
        let mut err = String::new();
        stderr.read_to_string(&mut err).await.unwrap();

        assert_eq!(out.trim(), "out");
        assert_eq!(err.trim(), "err");
    }

    #[tokio::test]
    async fn test_spawn_unknown_program_is_startup_error() {
        let result = Workload::spawn("definitely-not-a-real-binary-404", &[]);
        assert!(matches!(result, Err(Error::WorkloadStart(_))));
    }

    #[tokio::test]
    async fn test_is_running_transitions_on_exit() {
        let mut workload = Workload::spawn("sh", &["-c", "exit 0"]).unwrap();
        workload.wait().await.unwrap();
        assert!(!workload.is_running());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_terminates_long_running_child() {
        let mut workload = Workload::spawn("sh", &["-c", "exec sleep 30"]).unwrap();
        assert!(workload.is_running());
        workload.stop();
        let status = workload.wait().await.unwrap();
        assert!(!status.success());
    }
}
