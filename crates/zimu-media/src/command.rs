//! External tool command builder and runner.

use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Stderr lines kept for error messages.
const STDERR_TAIL_LINES: usize = 20;

/// Captured output of a finished tool run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Builder for a yt-dlp / whisper / ffmpeg invocation.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Kill the process if it runs longer than `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn build_args(&self) -> &[String] {
        &self.args
    }

    /// Fail early with `ToolNotFound` when the program is not installed.
    pub fn ensure_available(&self) -> MediaResult<()> {
        which::which(&self.program)
            .map(|_| ())
            .map_err(|_| MediaError::ToolNotFound(self.program.clone()))
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> MediaError {
        if e.kind() == std::io::ErrorKind::NotFound {
            MediaError::ToolNotFound(self.program.clone())
        } else {
            MediaError::Io(e)
        }
    }

    fn timeout_error(&self) -> MediaError {
        MediaError::Timeout {
            program: self.program.clone(),
            secs: self.timeout.map(|d| d.as_secs()).unwrap_or_default(),
        }
    }

    /// Run to completion and capture stdout/stderr. Non-zero exit is an error.
    pub async fn output(&self) -> MediaResult<ToolOutput> {
        debug!("Running {} {}", self.program, self.args.join(" "));

        let fut = self.command().output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| self.timeout_error())?,
            None => fut.await,
        }
        .map_err(|e| self.spawn_error(e))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(MediaError::tool_failed(
                &self.program,
                format!("exited with {}: {}", output.status, last_line(&stderr)),
                Some(stderr),
                output.status.code(),
            ));
        }

        Ok(ToolOutput { stdout, stderr })
    }

    /// Run while handing every stderr line to `on_line`.
    ///
    /// Stdout is discarded. Returns the tail of stderr.
    pub async fn run_with_lines<F>(&self, mut on_line: F) -> MediaResult<String>
    where
        F: FnMut(&str) + Send,
    {
        debug!("Running {} {}", self.program, self.args.join(" "));

        let mut child = self
            .command()
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::tool_failed(&self.program, "stderr not captured", None, None))?;

        let run = async {
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            let mut lines = BufReader::new(stderr).lines();
            while let Some(line) = lines.next_line().await? {
                on_line(&line);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, Vec::from(tail).join("\n")))
        };

        let (status, tail) = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(program = %self.program, "Tool timed out, killing process");
                    return Err(self.timeout_error());
                }
            },
            None => run.await?,
        };

        if !status.success() {
            return Err(MediaError::tool_failed(
                &self.program,
                format!("exited with {}: {}", status, last_line(&tail)),
                Some(tail),
                status.code(),
            ));
        }

        Ok(tail)
    }
}

fn last_line(text: &str) -> &str {
    text.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("").trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_args() {
        let cmd = ToolCommand::new("yt-dlp")
            .arg("-J")
            .args(["--skip-download", "--no-playlist"])
            .timeout(Duration::from_secs(5));
        assert_eq!(cmd.program(), "yt-dlp");
        assert_eq!(cmd.build_args(), ["-J", "--skip-download", "--no-playlist"]);
    }

    #[tokio::test]
    async fn test_missing_program_reports_not_found() {
        let cmd = ToolCommand::new("zimu-definitely-missing-tool");
        assert!(matches!(cmd.ensure_available(), Err(MediaError::ToolNotFound(_))));
        assert!(matches!(cmd.output().await, Err(MediaError::ToolNotFound(_))));
    }

    #[test]
    fn test_last_line_skips_blank() {
        assert_eq!(last_line("first\nERROR: boom\n\n"), "ERROR: boom");
        assert_eq!(last_line(""), "");
    }
}
