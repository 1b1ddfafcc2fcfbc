use crate::api::error::AppError;
use crate::entities::videos;
use crate::infrastructure::assets::ensure_assets_dir;
use crate::utils::asset_key::AssetKey;
use tokio::io::AsyncRead;
use tracing::{info, warn};

use super::{IngestService, UploadedMedia, stage_upload};

impl IngestService {
    /// Store a thumbnail under the local assets directory and point the
    /// record at it. Images are not probed or rewritten.
    #[tracing::instrument(skip_all, fields(video_id = %video.id))]
    pub async fn ingest_thumbnail<R>(
        &self,
        video: videos::Model,
        media: UploadedMedia<R>,
    ) -> Result<videos::Model, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let root = &self.config.assets_root;
        let staging = &self.config.assets_staging_dir;
        ensure_assets_dir(root).await?;
        ensure_assets_dir(staging).await?;

        // Partial uploads stay out of the served directory until the rename
        let staged = stage_upload(
            media.reader,
            self.config.max_thumbnail_size,
            Some(staging),
            ".upload-",
            "",
        )
        .await?;

        let key = AssetKey::generate(None, &media.content_type);
        let dest = root.join(key.file_name());
        let size = staged.size();
        staged.persist(&dest)?;
        info!(bytes = size, file = %key, "stored thumbnail");

        let url = format!("{}{}", self.config.assets_base_url, key);
        match self.videos.set_thumbnail_url(video, url).await {
            Ok(updated) => Ok(updated),
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&dest).await {
                    warn!(file = %dest.display(), "couldn't remove orphaned thumbnail: {}", cleanup);
                }
                Err(e)
            }
        }
    }
}
