use crate::api::error::AppError;
use crate::entities::videos;
use crate::utils::asset_key::AssetKey;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{IngestService, UploadedMedia, stage_upload};

impl IngestService {
    /// Run one video upload end to end and return the updated record.
    ///
    /// Nothing is retried. Any failure aborts the remaining steps and leaves
    /// the record as it was.
    #[tracing::instrument(skip_all, fields(video_id = %video.id))]
    pub async fn ingest_video<R>(
        &self,
        video: videos::Model,
        media: UploadedMedia<R>,
        cancel: &CancellationToken,
    ) -> Result<videos::Model, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        // 1. Stage
        let staged = stage_upload(
            media.reader,
            self.config.max_video_size,
            self.config.upload_temp_dir.as_deref(),
            "tubely-upload",
            ".mp4",
        )
        .await?;
        info!(bytes = staged.size(), "staged video upload");

        // 2. Probe and classify
        let dimensions = self.probe.probe(staged.path(), cancel).await?;
        let ratio = dimensions.aspect_ratio()?;
        info!(
            width = dimensions.width,
            height = dimensions.height,
            aspect_ratio = %ratio,
            "classified video"
        );

        // 3. Rewrite for progressive playback
        let rewritten = self.rewriter.rewrite(staged.path(), cancel).await?;
        let body = tokio::fs::File::open(&rewritten).await?;

        // 4. Publish
        let prefix = ratio.orientation_prefix(&self.config.unclassified_orientation);
        let key = AssetKey::generate(Some(prefix), &media.content_type).to_string();

        self.storage
            .upload_stream(&key, media.content_type.essence_str(), Box::new(body))
            .await
            .map_err(|e| AppError::Internal(format!("Couldn't upload video {}: {}", key, e)))?;
        info!(key = %key, "published video");

        // 5. Finalize
        let url = format!("{}{}", self.config.cdn_base_url, key);
        match self.videos.set_video_url(video, url).await {
            Ok(updated) => Ok(updated),
            Err(e) => {
                warn!(key = %key, "record update failed, removing published object");
                if let Err(cleanup) = self.storage.delete_file(&key).await {
                    warn!(key = %key, "couldn't remove orphaned object: {}", cleanup);
                }
                Err(e)
            }
        }
    }
}
