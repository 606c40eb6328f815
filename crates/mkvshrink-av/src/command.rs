//! Builder for executing external tool commands.

use std::fs::File;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;

/// Number of trailing diagnostic lines kept in error messages.
const ERROR_TAIL_LINES: usize = 20;

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl ToolOutput {
    /// Standard output followed by standard error.
    pub fn combined(&self) -> String {
        let mut out = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        out.push_str(&self.stdout);
        if !self.stdout.is_empty() && !self.stdout.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&self.stderr);
        out
    }
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use mkvshrink_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> mkvshrink_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffmpeg"))
///     .arg("-hide_banner")
///     .arg("-version")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time. Commands run unbounded by default.
    pub fn timeout(&mut self, d: Option<Duration>) -> &mut Self {
        self.timeout = d;
        self
    }

    /// The arguments accumulated so far.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(Stdio::null());
        cmd.kill_on_drop(true);
        cmd
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`mkvshrink_core::Error::Tool`] if spawning fails, if the
    /// process exits with a non-zero status (message includes the tail of
    /// its output), or if the timeout expires.
    pub async fn execute(&self) -> mkvshrink_core::Result<ToolOutput> {
        let program_name = self.program_name();

        let mut cmd = self.command();
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let child = cmd
            .spawn()
            .map_err(|e| mkvshrink_core::Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        let output = self
            .wait(&program_name, child.wait_with_output())
            .await?;

        let tool_output = ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !output.status.success() {
            return Err(mkvshrink_core::Error::tool(
                program_name,
                format!(
                    "exited with status {}: {}",
                    output.status,
                    tail(&tool_output.combined(), ERROR_TAIL_LINES)
                ),
            ));
        }

        Ok(tool_output)
    }

    /// Execute the command with stderr redirected into `stderr_file` and
    /// stdout discarded. The exit status is returned as-is; interpreting it
    /// is up to the caller, which usually needs the captured text first.
    pub async fn execute_to_file(&self, stderr_file: File) -> mkvshrink_core::Result<ExitStatus> {
        let program_name = self.program_name();

        let mut cmd = self.command();
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::from(stderr_file));

        let mut child = cmd
            .spawn()
            .map_err(|e| mkvshrink_core::Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        self.wait(&program_name, child.wait()).await
    }

    async fn wait<T>(
        &self,
        program_name: &str,
        fut: impl std::future::Future<Output = std::io::Result<T>>,
    ) -> mkvshrink_core::Result<T> {
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(r) => r,
                // The child is killed when its handle drops with the future.
                Err(_elapsed) => {
                    return Err(mkvshrink_core::Error::tool(
                        program_name,
                        format!("timed out after {limit:?}"),
                    ))
                }
            },
            None => fut.await,
        };

        result.map_err(|e| {
            mkvshrink_core::Error::tool(program_name, format!("I/O error waiting for process: {e}"))
        })
    }
}

/// The last `n` non-empty lines of `text`.
pub fn tail(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
