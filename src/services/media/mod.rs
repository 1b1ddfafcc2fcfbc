//! Media inspection and container rewriting.
//!
//! Both capabilities are traits so the ingest pipeline can run against
//! ffprobe/ffmpeg in production and canned fakes in tests.

pub mod aspect;
pub mod probe;
pub mod process;
pub mod rewrite;

use std::time::Duration;
use thiserror::Error;

pub use aspect::AspectRatio;
pub use probe::{FfprobeProbe, MediaProbe, ProbedDimensions};
pub use process::ExternalTool;
pub use rewrite::{ContainerRewriter, FfmpegFaststart};

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("{tool} could not be started: {source}")]
    ToolUnavailable {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("{tool} did not finish within {after:?}")]
    TimedOut { tool: String, after: Duration },

    #[error("{tool} was cancelled")]
    Cancelled { tool: String },

    #[error("probe output is not valid JSON: {0}")]
    ProbeParse(#[from] serde_json::Error),

    #[error("probe reported no streams")]
    NoStreams,

    #[error("first stream has no width/height")]
    MissingDimensions,

    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
