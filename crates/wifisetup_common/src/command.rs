//! External command execution layer.
//!
//! Runs a program with arguments and captures exit code, stdout, stderr and
//! duration. Never returns an error: spawn failures are folded into the
//! returned `CommandResult` so callers can normalize them however they like.

use std::process::Command;
use std::time::Instant;
use tracing::debug;

/// Maximum output length to capture per stream
const MAX_OUTPUT_BYTES: usize = 64 * 1024;

/// Result of a command execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Program that was executed
    pub program: String,
    /// Program and arguments joined for logging
    pub full_command: String,
    /// Exit code (0 = success, -1 when there is none)
    pub exit_code: i32,
    /// Stdout (truncated if too long)
    pub stdout: String,
    /// Stderr (truncated if too long)
    pub stderr: String,
    /// Execution duration
    pub duration_ms: u64,
    pub status: ExecutionStatus,
}

/// Execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Command ran successfully (exit code 0)
    Success,
    /// Command ran but returned non-zero exit code
    NonZeroExit,
    /// Command not found on system
    CommandNotFound,
    /// Permission denied
    PermissionDenied,
    /// Other OS error
    OsError,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NonZeroExit => "non-zero exit",
            Self::CommandNotFound => "command not found",
            Self::PermissionDenied => "permission denied",
            Self::OsError => "OS error",
        }
    }
}

impl CommandResult {
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    /// Build a successful result carrying `stdout`.
    pub fn success(program: &str, args: &[&str], stdout: impl Into<String>) -> Self {
        Self {
            program: program.to_string(),
            full_command: join_command(program, args),
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            duration_ms: 0,
            status: ExecutionStatus::Success,
        }
    }

    /// Build a failed result with the given status and stderr.
    pub fn failure(
        program: &str,
        args: &[&str],
        status: ExecutionStatus,
        stderr: impl Into<String>,
    ) -> Self {
        Self {
            program: program.to_string(),
            full_command: join_command(program, args),
            exit_code: if status == ExecutionStatus::NonZeroExit { 1 } else { -1 },
            stdout: String::new(),
            stderr: stderr.into(),
            duration_ms: 0,
            status,
        }
    }

    /// One-line description for log messages.
    pub fn summary(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("`{}` {} (exit {})", self.full_command, self.status.as_str(), self.exit_code)
        } else {
            format!(
                "`{}` {} (exit {}): {}",
                self.full_command,
                self.status.as_str(),
                self.exit_code,
                stderr
            )
        }
    }
}

/// Anything able to run an external program to completion.
///
/// The network manager client and the provisioning portal both go through
/// this seam, so tests can script every external interaction.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str]) -> CommandResult;
}

/// Runs commands on the real system, blocking until they exit.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> CommandResult {
        let start = Instant::now();
        let full_command = join_command(program, args);
        debug!("exec: {}", full_command);

        let output = Command::new(program).args(args).output();
        let duration_ms = start.elapsed().as_millis() as u64;

        match output {
            Ok(output) => {
                let stdout = truncate_output(&output.stdout);
                let stderr = truncate_output(&output.stderr);
                let exit_code = output.status.code().unwrap_or(-1);

                let status = if output.status.success() {
                    ExecutionStatus::Success
                } else if stderr.contains("Permission denied") {
                    ExecutionStatus::PermissionDenied
                } else {
                    ExecutionStatus::NonZeroExit
                };

                CommandResult {
                    program: program.to_string(),
                    full_command,
                    exit_code,
                    stdout,
                    stderr,
                    duration_ms,
                    status,
                }
            }
            Err(e) => {
                let status = match e.kind() {
                    std::io::ErrorKind::NotFound => ExecutionStatus::CommandNotFound,
                    std::io::ErrorKind::PermissionDenied => ExecutionStatus::PermissionDenied,
                    _ => ExecutionStatus::OsError,
                };

                CommandResult {
                    program: program.to_string(),
                    full_command,
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: format!("OS error: {}", e),
                    duration_ms,
                    status,
                }
            }
        }
    }
}

fn join_command(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

/// Truncate output to max bytes, converting to string
fn truncate_output(bytes: &[u8]) -> String {
    let slice = if bytes.len() > MAX_OUTPUT_BYTES {
        &bytes[..MAX_OUTPUT_BYTES]
    } else {
        bytes
    };

    String::from_utf8_lossy(slice).to_string()
}
