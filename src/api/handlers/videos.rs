use crate::api::error::AppError;
use crate::entities::videos;
use crate::utils::auth::Claims;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Serialize, ToSchema)]
pub struct VideoResponse {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<videos::Model> for VideoResponse {
    fn from(video: videos::Model) -> Self {
        Self {
            id: video.id,
            user_id: video.user_id,
            title: video.title,
            description: video.description,
            thumbnail_url: video.thumbnail_url,
            video_url: video.video_url,
            created_at: video.created_at,
            updated_at: video.updated_at,
        }
    }
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct CreateVideoRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

pub(crate) fn parse_video_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest("Invalid video ID".to_string()))
}

#[utoipa::path(
    post,
    path = "/api/videos",
    request_body = CreateVideoRequest,
    responses(
        (status = 201, description = "Video record created", body = VideoResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized")
    ),
    security(("jwt" = [])),
    tag = "videos"
)]
pub async fn create_video(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateVideoRequest>,
) -> Result<(StatusCode, Json<VideoResponse>), AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let video = state
        .videos
        .create(&claims.sub, req.title, req.description)
        .await?;

    Ok((StatusCode::CREATED, Json(video.into())))
}

#[utoipa::path(
    get,
    path = "/api/videos",
    responses(
        (status = 200, description = "Videos owned by the caller", body = Vec<VideoResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(("jwt" = [])),
    tag = "videos"
)]
pub async fn list_videos(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<VideoResponse>>, AppError> {
    let videos = state.videos.list_for_user(&claims.sub).await?;
    Ok(Json(videos.into_iter().map(VideoResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/videos/{id}",
    params(
        ("id" = String, Path, description = "Video ID")
    ),
    responses(
        (status = 200, description = "Video record", body = VideoResponse),
        (status = 400, description = "Invalid video ID"),
        (status = 404, description = "Video not found")
    ),
    security(("jwt" = [])),
    tag = "videos"
)]
pub async fn get_video(
    State(state): State<crate::AppState>,
    Path(id): Path<String>,
) -> Result<Json<VideoResponse>, AppError> {
    let id = parse_video_id(&id)?;
    let video = state.videos.get(id).await?;
    Ok(Json(video.into()))
}

#[utoipa::path(
    delete,
    path = "/api/videos/{id}",
    params(
        ("id" = String, Path, description = "Video ID")
    ),
    responses(
        (status = 204, description = "Video deleted"),
        (status = 401, description = "Not the owner"),
        (status = 404, description = "Video not found")
    ),
    security(("jwt" = [])),
    tag = "videos"
)]
pub async fn delete_video(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_video_id(&id)?;
    state.videos.delete_owned(id, &claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}
