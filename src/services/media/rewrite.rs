use super::process::ensure_success;
use super::{ExternalTool, MediaError};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempPath;
use tokio_util::sync::CancellationToken;

/// Produces a copy of a video with its index moved to the front so players
/// can start before the download finishes.
///
/// The input is never modified. The returned `TempPath` owns the new file and
/// deletes it on drop.
#[async_trait]
pub trait ContainerRewriter: Send + Sync {
    async fn rewrite(&self, input: &Path, cancel: &CancellationToken)
    -> Result<TempPath, MediaError>;
}

/// `<input>.processing`
pub fn rewritten_path(input: &Path) -> PathBuf {
    let mut path = input.as_os_str().to_owned();
    path.push(".processing");
    PathBuf::from(path)
}

/// Stream-copy remux with `-movflags faststart`.
pub struct FfmpegFaststart {
    tool: ExternalTool,
    timeout: Duration,
}

impl FfmpegFaststart {
    pub fn new(tool: ExternalTool, timeout: Duration) -> Self {
        Self { tool, timeout }
    }
}

#[async_trait]
impl ContainerRewriter for FfmpegFaststart {
    async fn rewrite(
        &self,
        input: &Path,
        cancel: &CancellationToken,
    ) -> Result<TempPath, MediaError> {
        // Claimed before spawning so a half-written output is removed too
        let output_path = TempPath::from_path(rewritten_path(input));

        let output = self
            .tool
            .run(
                [
                    OsStr::new("-nostdin"),
                    OsStr::new("-y"),
                    OsStr::new("-i"),
                    input.as_os_str(),
                    OsStr::new("-c"),
                    OsStr::new("copy"),
                    OsStr::new("-movflags"),
                    OsStr::new("faststart"),
                    OsStr::new("-f"),
                    OsStr::new("mp4"),
                    output_path.as_os_str(),
                ],
                self.timeout,
                cancel,
            )
            .await?;

        ensure_success(&self.tool, &output)?;

        let written = tokio::fs::metadata(&*output_path).await?;
        tracing::debug!(
            input = %input.display(),
            bytes = written.len(),
            "faststart rewrite completed"
        );

        Ok(output_path)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io::Write;

    // Copies the `-i` argument to the last argument, like a stream-copy remux
    const COPY_SCRIPT: &str =
        r#"while [ "$1" != "-i" ]; do shift; done; in="$2"; for last; do :; done; cp "$in" "$last""#;

    fn fake_ffmpeg(script: &str) -> FfmpegFaststart {
        let tool = ExternalTool::new("sh").with_leading_args(["-c", script, "ffmpeg"]);
        FfmpegFaststart::new(tool, Duration::from_secs(5))
    }

    fn staged_input(contents: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.mp4");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_rewritten_path_is_a_sibling() {
        let path = rewritten_path(Path::new("/tmp/tubely-upload123.mp4"));
        assert_eq!(path, PathBuf::from("/tmp/tubely-upload123.mp4.processing"));
    }

    #[tokio::test]
    async fn test_rewrite_leaves_input_untouched() {
        let contents = b"ftyp....mdat....moov....".repeat(64);
        let (_dir, input) = staged_input(&contents);

        let rewriter = fake_ffmpeg(COPY_SCRIPT);
        let output = rewriter
            .rewrite(&input, &CancellationToken::new())
            .await
            .unwrap();

        assert_ne!(output.to_path_buf(), input);
        assert_eq!(std::fs::read(&input).unwrap(), contents);
        assert_eq!(std::fs::read(&output).unwrap(), contents);

        let output_path = output.to_path_buf();
        drop(output);
        assert!(!output_path.exists());
        assert!(input.exists());
    }

    #[tokio::test]
    async fn test_failed_rewrite_removes_partial_output() {
        let (_dir, input) = staged_input(b"video bytes");
        let rewriter = fake_ffmpeg(r#"for last; do :; done; echo partial > "$last"; exit 1"#);

        let err = rewriter
            .rewrite(&input, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::ToolFailed { .. }));
        assert!(!rewritten_path(&input).exists());
        assert_eq!(std::fs::read(&input).unwrap(), b"video bytes");
    }

    #[tokio::test]
    async fn test_success_without_output_is_an_error() {
        let (_dir, input) = staged_input(b"video bytes");
        let rewriter = fake_ffmpeg("exit 0");

        let err = rewriter
            .rewrite(&input, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Io(_)));
    }
}
