// src/system/executor.rs

use crate::CancellationToken;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::process::{Child, ChildStderr, ChildStdout, Command as StdCommand, Stdio};
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("No command specified to run.")]
    EmptyCommand,
    #[error("Command '{0}' could not be executed: {1}")]
    SpawnFailed(String, std::io::Error),
    #[error("Failed waiting for command '{0}': {1}")]
    WaitFailed(String, std::io::Error),
    #[error("Command '{command}' did not finish within {seconds} seconds and was killed.")]
    TimedOut { command: String, seconds: u64 },
    #[error("Operation was cancelled by the user.")]
    Interrupted,
}

/// Captured result of a finished subprocess. A non-zero exit is not an
/// `ExecutionError`; callers inspect `success` and build their own, richer
/// error messages from the captured streams.
#[derive(Debug, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

/// Runs `command_line` through the platform shell (`sh -c` on Unix, `cmd /C`
/// on Windows), capturing stdout and stderr into separate buffers.
pub fn run_shell_captured(
    command_line: &str,
    cwd: &Path,
    extra_env: &HashMap<String, String>,
    timeout: Option<Duration>,
    cancellation_token: &CancellationToken,
) -> Result<CommandOutput, ExecutionError> {
    let trimmed = command_line.trim();
    if trimmed.is_empty() {
        return Err(ExecutionError::EmptyCommand);
    }

    let mut command = if cfg!(target_os = "windows") {
        let mut c = StdCommand::new("cmd");
        c.arg("/C").arg(trimmed);
        c
    } else {
        let mut c = StdCommand::new("sh");
        c.arg("-c").arg(trimmed);
        c
    };
    command.envs(extra_env);

    run_captured(command, trimmed, cwd, timeout, cancellation_token)
}

/// Runs a literal argv (no shell interpretation), capturing stdout and stderr
/// into separate buffers.
pub fn run_argv_captured(
    program: &str,
    args: &[String],
    cwd: &Path,
    extra_env: &HashMap<String, String>,
    timeout: Option<Duration>,
    cancellation_token: &CancellationToken,
) -> Result<CommandOutput, ExecutionError> {
    if program.trim().is_empty() {
        return Err(ExecutionError::EmptyCommand);
    }

    let mut command = StdCommand::new(program);
    command.args(args).envs(extra_env);

    let display = if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    };

    run_captured(command, &display, cwd, timeout, cancellation_token)
}

/// Shared spawn-and-wait loop. Output pipes are drained on background threads
/// so a chatty child cannot deadlock against a full pipe while we poll
/// `try_wait` for completion, cancellation and the deadline.
fn run_captured(
    mut command: StdCommand,
    display: &str,
    cwd: &Path,
    timeout: Option<Duration>,
    cancellation_token: &CancellationToken,
) -> Result<CommandOutput, ExecutionError> {
    let clean_cwd = dunce::simplified(cwd);
    command
        .current_dir(clean_cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    log::debug!("Executing '{}' in '{}'", display, clean_cwd.display());

    let mut child = command
        .spawn()
        .map_err(|e| ExecutionError::SpawnFailed(display.to_string(), e))?;

    let stdout_reader = child.stdout.take().map(spawn_stdout_reader);
    let stderr_reader = child.stderr.take().map(spawn_stderr_reader);

    let deadline = timeout.map(|t| Instant::now() + t);
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                return Ok(CommandOutput {
                    stdout: join_reader(stdout_reader),
                    stderr: join_reader(stderr_reader),
                    success: status.success(),
                    code: status.code(),
                });
            }
            Ok(None) => {
                if cancellation_token.load(Ordering::Relaxed) {
                    kill_child(&mut child, display);
                    return Err(ExecutionError::Interrupted);
                }
                if let Some(deadline) = deadline
                    && Instant::now() >= deadline
                {
                    kill_child(&mut child, display);
                    return Err(ExecutionError::TimedOut {
                        command: display.to_string(),
                        seconds: timeout.map(|t| t.as_secs()).unwrap_or_default(),
                    });
                }
                thread::sleep(Duration::from_millis(50));
            }
            Err(e) => {
                kill_child(&mut child, display);
                return Err(ExecutionError::WaitFailed(display.to_string(), e));
            }
        }
    }
}

fn spawn_stdout_reader(mut pipe: ChildStdout) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn spawn_stderr_reader(mut pipe: ChildStderr) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    let bytes = handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn kill_child(child: &mut Child, display: &str) {
    log::debug!("Killing child process for '{}' (PID: {})", display, child.id());
    if let Err(e) = child.kill() {
        log::warn!("Failed to kill child process {}: {}", child.id(), e);
    }
    child.wait().ok();
}
