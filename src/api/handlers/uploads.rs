use crate::AppState;
use crate::api::error::AppError;
use crate::api::handlers::videos::{VideoResponse, parse_video_id};
use crate::api::middleware::auth::authenticate;
use crate::services::ingest::{THUMBNAIL_TYPES, UploadedMedia, VIDEO_TYPES, validate_declared_type};
use axum::{
    Json,
    extract::{
        Multipart, Path, State,
        multipart::{Field, MultipartError},
    },
    http::{HeaderMap, StatusCode, Uri},
};
use futures::TryStreamExt;
use tokio_util::io::StreamReader;
use utoipa::ToSchema;

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ThumbnailUploadForm {
    #[schema(value_type = String, format = Binary)]
    thumbnail: Vec<u8>,
}

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct VideoUploadForm {
    #[schema(value_type = String, format = Binary)]
    video: Vec<u8>,
}

fn multipart_error(e: MultipartError) -> AppError {
    let err_msg = e.to_string();
    if err_msg.contains("length limit exceeded") {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(err_msg)
    }
}

fn auth_error(status: StatusCode) -> AppError {
    if status == StatusCode::UNAUTHORIZED {
        AppError::Unauthorized("Couldn't validate JWT".to_string())
    } else {
        AppError::Internal(format!("Authentication failed with status {}", status))
    }
}

/// Consume whatever is left of the request body so the client sees the
/// error response instead of a reset connection.
async fn drain(multipart: &mut Multipart) {
    while let Ok(Some(_)) = multipart.next_field().await {}
}

fn body_reader(field: Field<'_>) -> impl tokio::io::AsyncRead + Unpin + Send + '_ {
    StreamReader::new(field.map_err(std::io::Error::other))
}

#[utoipa::path(
    post,
    path = "/api/thumbnail_upload/{video_id}",
    params(
        ("video_id" = String, Path, description = "Video ID")
    ),
    request_body(content = ThumbnailUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Thumbnail stored", body = VideoResponse),
        (status = 400, description = "Invalid video ID or missing form field"),
        (status = 401, description = "Unauthorized or not the owner"),
        (status = 404, description = "Video not found"),
        (status = 413, description = "Thumbnail too large"),
        (status = 415, description = "Unsupported image type")
    ),
    security(("jwt" = [])),
    tag = "uploads"
)]
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    uri: Uri,
    mut multipart: Multipart,
) -> Result<Json<VideoResponse>, AppError> {
    let result = receive_thumbnail(&state, &video_id, &headers, &uri, &mut multipart).await;
    if result.is_err() {
        drain(&mut multipart).await;
    }
    result.map(|video| Json(video.into()))
}

async fn receive_thumbnail(
    state: &AppState,
    video_id: &str,
    headers: &HeaderMap,
    uri: &Uri,
    multipart: &mut Multipart,
) -> Result<crate::entities::videos::Model, AppError> {
    let id = parse_video_id(video_id)?;
    let claims = authenticate(state, headers, uri).await.map_err(auth_error)?;
    let video = state.videos.get_owned(id, &claims.sub).await?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("thumbnail") {
            continue;
        }

        let content_type = validate_declared_type(field.content_type(), THUMBNAIL_TYPES)?;
        let filename = field.file_name().map(str::to_string);
        let media = UploadedMedia::new(body_reader(field), content_type, filename);

        return state.ingest.ingest_thumbnail(video, media).await;
    }

    Err(AppError::BadRequest(
        "Couldn't find a \"thumbnail\" form field".to_string(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/video_upload/{video_id}",
    params(
        ("video_id" = String, Path, description = "Video ID")
    ),
    request_body(content = VideoUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Video processed and published", body = VideoResponse),
        (status = 400, description = "Invalid video ID or missing form field"),
        (status = 401, description = "Unauthorized or not the owner"),
        (status = 404, description = "Video not found"),
        (status = 413, description = "Video too large"),
        (status = 415, description = "Unsupported video type"),
        (status = 500, description = "Probe, rewrite or storage failure")
    ),
    security(("jwt" = [])),
    tag = "uploads"
)]
pub async fn upload_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    uri: Uri,
    mut multipart: Multipart,
) -> Result<Json<VideoResponse>, AppError> {
    let result = receive_video(&state, &video_id, &headers, &uri, &mut multipart).await;
    if result.is_err() {
        drain(&mut multipart).await;
    }
    result.map(|video| Json(video.into()))
}

async fn receive_video(
    state: &AppState,
    video_id: &str,
    headers: &HeaderMap,
    uri: &Uri,
    multipart: &mut Multipart,
) -> Result<crate::entities::videos::Model, AppError> {
    let id = parse_video_id(video_id)?;
    let claims = authenticate(state, headers, uri).await.map_err(auth_error)?;
    let video = state.videos.get_owned(id, &claims.sub).await?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("video") {
            continue;
        }

        let content_type = validate_declared_type(field.content_type(), VIDEO_TYPES)?;
        let filename = field.file_name().map(str::to_string);
        let media = UploadedMedia::new(body_reader(field), content_type, filename);

        // Tool invocations stop when the server shuts down
        let cancel = state.shutdown.child_token();
        return state.ingest.ingest_video(video, media, &cancel).await;
    }

    Err(AppError::BadRequest("Couldn't find a \"video\" form field".to_string()))
}

