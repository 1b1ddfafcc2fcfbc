use super::process::ensure_success;
use super::{AspectRatio, ExternalTool, MediaError};
use async_trait::async_trait;
use serde::Deserialize;
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Frame size of the first stream in a media file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbedDimensions {
    pub width: u32,
    pub height: u32,
}

impl ProbedDimensions {
    pub fn aspect_ratio(&self) -> Result<AspectRatio, MediaError> {
        AspectRatio::classify(self.width, self.height)
    }
}

/// Reads stream dimensions from a file without modifying it.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<ProbedDimensions, MediaError>;
}

#[derive(Deserialize)]
struct ProbeOutput {
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

/// Parse `ffprobe -print_format json -show_streams` output.
pub fn parse_probe_output(stdout: &[u8]) -> Result<ProbedDimensions, MediaError> {
    let parsed: ProbeOutput = serde_json::from_slice(stdout)?;

    let first = parsed.streams.first().ok_or(MediaError::NoStreams)?;

    match (first.width, first.height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => {
            Ok(ProbedDimensions { width, height })
        }
        _ => Err(MediaError::MissingDimensions),
    }
}

pub struct FfprobeProbe {
    tool: ExternalTool,
    timeout: Duration,
}

impl FfprobeProbe {
    pub fn new(tool: ExternalTool, timeout: Duration) -> Self {
        Self { tool, timeout }
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn probe(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<ProbedDimensions, MediaError> {
        let output = self
            .tool
            .run(
                [
                    OsStr::new("-v"),
                    OsStr::new("error"),
                    OsStr::new("-print_format"),
                    OsStr::new("json"),
                    OsStr::new("-show_streams"),
                    path.as_os_str(),
                ],
                self.timeout,
                cancel,
            )
            .await?;

        ensure_success(&self.tool, &output)?;

        // A clean exit can still come with empty or truncated output
        let dims = parse_probe_output(&output.stdout)?;

        tracing::debug!(
            path = %path.display(),
            width = dims.width,
            height = dims.height,
            "probe completed"
        );

        Ok(dims)
    }
}
