//! Upload ingestion.
//!
//! Videos go stage -> probe/classify -> faststart rewrite -> object storage ->
//! record update. Thumbnails go stage -> local assets directory -> record
//! update. Every temporary file is owned by a guard that removes it on drop,
//! so all exit paths clean up.

use crate::config::AppConfig;
use crate::services::media::{ContainerRewriter, MediaProbe};
use crate::services::storage::StorageService;
use crate::services::videos::VideoService;
use std::sync::Arc;

pub mod staging;
pub mod thumbnail;
pub mod types;
pub mod video;

pub use staging::{StagedFile, stage_upload};
pub use types::{THUMBNAIL_TYPES, UploadedMedia, VIDEO_TYPES, validate_declared_type};

pub struct IngestService {
    storage: Arc<dyn StorageService>,
    videos: Arc<VideoService>,
    probe: Arc<dyn MediaProbe>,
    rewriter: Arc<dyn ContainerRewriter>,
    config: AppConfig,
}

impl IngestService {
    pub fn new(
        storage: Arc<dyn StorageService>,
        videos: Arc<VideoService>,
        probe: Arc<dyn MediaProbe>,
        rewriter: Arc<dyn ContainerRewriter>,
        config: AppConfig,
    ) -> Self {
        Self {
            storage,
            videos,
            probe,
            rewriter,
            config,
        }
    }
}
