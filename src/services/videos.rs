use crate::api::error::AppError;
use crate::entities::{prelude::*, *};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

/// Video records and their ownership rules.
pub struct VideoService {
    db: DatabaseConnection,
}

impl VideoService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        user_id: &str,
        title: String,
        description: String,
    ) -> Result<videos::Model, AppError> {
        let now = Utc::now();
        let video = videos::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            user_id: Set(user_id.to_string()),
            title: Set(title),
            description: Set(description),
            thumbnail_url: Set(None),
            video_url: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(video.insert(&self.db).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<videos::Model, AppError> {
        Videos::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Couldn't find video".to_string()))
    }

    /// Load a video and check that `user_id` owns it.
    pub async fn get_owned(&self, id: Uuid, user_id: &str) -> Result<videos::Model, AppError> {
        let video = self.get(id).await?;
        if video.user_id != user_id {
            tracing::warn!(video_id = %video.id, user_id, "rejected access to foreign video");
            return Err(AppError::Unauthorized(
                "You don't own this video".to_string(),
            ));
        }
        Ok(video)
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<videos::Model>, AppError> {
        Ok(Videos::find()
            .filter(videos::Column::UserId.eq(user_id))
            .order_by_desc(videos::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn delete_owned(&self, id: Uuid, user_id: &str) -> Result<(), AppError> {
        let video = self.get_owned(id, user_id).await?;
        video.delete(&self.db).await?;
        Ok(())
    }

    pub async fn set_thumbnail_url(
        &self,
        video: videos::Model,
        url: String,
    ) -> Result<videos::Model, AppError> {
        let mut active: videos::ActiveModel = video.into();
        active.thumbnail_url = Set(Some(url));
        active.updated_at = Set(Utc::now());
        Ok(active.update(&self.db).await?)
    }

    pub async fn set_video_url(
        &self,
        video: videos::Model,
        url: String,
    ) -> Result<videos::Model, AppError> {
        let mut active: videos::ActiveModel = video.into();
        active.video_url = Set(Some(url));
        active.updated_at = Set(Utc::now());
        Ok(active.update(&self.db).await?)
    }
}
