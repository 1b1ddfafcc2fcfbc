use super::MediaError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// An external program plus arguments placed before the per-call ones.
///
/// Leading arguments let a wrapper stand in for the real binary
/// (`sh -c '<script>' ffprobe ...`).
#[derive(Debug, Clone)]
pub struct ExternalTool {
    program: PathBuf,
    leading_args: Vec<OsString>,
}

impl ExternalTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Short name for logs and errors.
    pub fn name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Run to completion and capture stdout/stderr.
    ///
    /// The child is killed if `timeout` elapses, if `cancel` fires, or if the
    /// returned future is dropped. Exit status is not inspected here.
    pub async fn run<I, S>(
        &self,
        args: I,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Output, MediaError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let tool = self.name();

        let child = Command::new(&self.program)
            .args(&self.leading_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| MediaError::ToolUnavailable {
                tool: tool.clone(),
                source,
            })?;

        tracing::debug!(tool = %tool, ?timeout, "spawned media tool");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(MediaError::Cancelled { tool }),
            res = tokio::time::timeout(timeout, child.wait_with_output()) => match res {
                Ok(Ok(output)) => Ok(output),
                Ok(Err(e)) => Err(MediaError::Io(e)),
                Err(_) => {
                    tracing::warn!(tool = %tool, ?timeout, "media tool timed out, killing");
                    Err(MediaError::TimedOut { tool, after: timeout })
                }
            },
        }
    }
}

/// Turn a nonzero exit into `ToolFailed`.
pub(crate) fn ensure_success(tool: &ExternalTool, output: &Output) -> Result<(), MediaError> {
    if output.status.success() {
        return Ok(());
    }
    Err(MediaError::ToolFailed {
        tool: tool.name(),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}
