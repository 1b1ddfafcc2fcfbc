use crate::api::error::AppError;
use std::io::SeekFrom;
use std::path::Path;
use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

/// A request body copied to local disk. The file is deleted when this value
/// is dropped unless it is persisted first.
pub struct StagedFile {
    file: File,
    path: TempPath,
    size: u64,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Handle positioned at the start of the staged bytes.
    pub fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }

    /// Move the staged bytes to `dest` (same filesystem) and stop tracking them.
    pub fn persist(self, dest: &Path) -> Result<(), AppError> {
        let StagedFile { file, path, .. } = self;
        drop(file);
        path.persist(dest).map_err(|e| AppError::Io(e.error))
    }
}

/// Copy `reader` into a new temp file, failing once more than `limit` bytes
/// arrive. `dir` defaults to the system temp directory.
pub async fn stage_upload<R>(
    reader: R,
    limit: usize,
    dir: Option<&Path>,
    prefix: &str,
    suffix: &str,
) -> Result<StagedFile, AppError>
where
    R: AsyncRead + Unpin,
{
    let mut builder = tempfile::Builder::new();
    builder.prefix(prefix).suffix(suffix);
    let named = match dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(|e| AppError::Internal(format!("Couldn't create temp file: {}", e)))?;

    let (std_file, path) = named.into_parts();
    let mut file = File::from_std(std_file);

    let limit = limit as u64;
    let mut bounded = reader.take(limit + 1);
    let copied = tokio::io::copy(&mut bounded, &mut file)
        .await
        .map_err(read_error)?;

    if copied > limit {
        return Err(AppError::PayloadTooLarge(format!(
            "Upload exceeds the {} byte limit",
            limit
        )));
    }

    file.flush().await?;
    file.seek(SeekFrom::Start(0)).await?;

    Ok(StagedFile {
        file,
        path,
        size: copied,
    })
}

fn read_error(e: std::io::Error) -> AppError {
    if e.to_string().contains("length limit exceeded") {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_stage_copies_and_rewinds() {
        let dir = tempfile::tempdir().unwrap();
        let body: &[u8] = b"some video bytes";

        let mut staged = stage_upload(body, 1024, Some(dir.path()), "tubely-upload", ".mp4")
            .await
            .unwrap();

        assert_eq!(staged.size(), body.len() as u64);
        assert!(staged.path().starts_with(dir.path()));
        assert!(
            staged
                .path()
                .file_name()
                .unwrap()
                .to_string_lossy()
                .ends_with(".mp4")
        );

        let mut contents = Vec::new();
        staged.file_mut().read_to_end(&mut contents).await.unwrap();
        assert_eq!(contents, body);

        drop(staged);
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_limit_is_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        let body = vec![7u8; 64];

        let staged = stage_upload(&body[..], 64, Some(dir.path()), "t", "")
            .await
            .unwrap();
        assert_eq!(staged.size(), 64);
    }

    #[tokio::test]
    async fn test_oversized_upload_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let body = vec![7u8; 65];

        let err = stage_upload(&body[..], 64, Some(dir.path()), "t", "")
            .await
            .err()
            .unwrap();

        assert!(matches!(err, AppError::PayloadTooLarge(_)));
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_persist_moves_file() {
        let dir = tempfile::tempdir().unwrap();
        let staged = stage_upload(&b"png"[..], 16, Some(dir.path()), ".upload-", "")
            .await
            .unwrap();

        let dest = dir.path().join("final.png");
        staged.persist(&dest).unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"png");
        assert_eq!(entries(dir.path()), 1);
    }
}
