//! External command execution with a bounded wait

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::core::config::COMMAND_TIMEOUT_SECS;
use crate::error::{FlowError, FlowResult};

const GIT_PROGRAM: &str = "git";

/// Captured result of one finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, or -1 when the process was terminated by a signal
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Spawns external commands in a working directory.
///
/// Output is collected only once the process has exited, so callers always see
/// complete stdout/stderr text. A non-zero exit is not an error at this level;
/// only spawn failures and timeouts are.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(COMMAND_TIMEOUT_SECS))
    }
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `program args...` in `dir`
    pub async fn run(&self, program: &str, args: &[&str], dir: &Path) -> FlowResult<CommandOutput> {
        self.run_with_env(program, args, dir, &[]).await
    }

    /// Runs a command with extra environment variables set on the child only
    pub async fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        dir: &Path,
        env: &[(&str, &str)],
    ) -> FlowResult<CommandOutput> {
        let shown = display_command(program, args);
        trace!(command = %shown, dir = %dir.display(), "spawning");

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if program == GIT_PROGRAM {
            // Never block on an interactive credential prompt
            command.env("GIT_TERMINAL_PROMPT", "0");
        }
        for (key, value) in env {
            command.env(key, value);
        }

        let result = tokio::time::timeout(self.timeout, command.output()).await;

        match result {
            Ok(Ok(output)) => {
                let captured = CommandOutput {
                    stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                    exit_code: output.status.code().unwrap_or(-1),
                };
                debug!(command = %shown, exit_code = captured.exit_code, "finished");
                Ok(captured)
            }
            Ok(Err(source)) => Err(FlowError::Spawn {
                command: shown,
                source,
            }),
            Err(_) => Err(FlowError::Timeout {
                command: shown,
                secs: self.timeout.as_secs(),
            }),
        }
    }

    /// Runs a git command, returning the raw output regardless of exit status
    pub async fn git(&self, dir: &Path, args: &[&str]) -> FlowResult<CommandOutput> {
        self.run(GIT_PROGRAM, args, dir).await
    }

    /// Runs a git command and turns a non-zero exit into `ProcessFailure`
    pub async fn git_checked(&self, dir: &Path, args: &[&str]) -> FlowResult<CommandOutput> {
        self.git_checked_with_env(dir, args, &[]).await
    }

    pub async fn git_checked_with_env(
        &self,
        dir: &Path,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> FlowResult<CommandOutput> {
        let output = self.run_with_env(GIT_PROGRAM, args, dir, env).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(FlowError::ProcessFailure {
                command: display_command(GIT_PROGRAM, args),
                exit_code: output.exit_code,
                stderr: output.stderr,
            })
        }
    }
}

/// Renders a command for logs and error messages.
///
/// `-c key=value` pairs are shown by key only.
fn display_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    let mut redact_next = false;
    for arg in args {
        if redact_next {
            let key = arg.split('=').next().unwrap_or(arg);
            parts.push(format!("{key}=…"));
            redact_next = false;
            continue;
        }
        if *arg == "-c" {
            redact_next = true;
        }
        parts.push((*arg).to_string());
    }
    parts.join(" ")
}
