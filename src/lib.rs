pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::ingest::IngestService;
use crate::services::storage::StorageService;
use crate::services::videos::VideoService;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::auth::register,
        api::handlers::auth::login,
        api::handlers::videos::create_video,
        api::handlers::videos::list_videos,
        api::handlers::videos::get_video,
        api::handlers::videos::delete_video,
        api::handlers::uploads::upload_thumbnail,
        api::handlers::uploads::upload_video,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::auth::AuthRequest,
            api::handlers::auth::AuthResponse,
            api::handlers::auth::UserResponse,
            api::handlers::videos::VideoResponse,
            api::handlers::videos::CreateVideoRequest,
            api::handlers::uploads::ThumbnailUploadForm,
            api::handlers::uploads::VideoUploadForm,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "auth", description = "Authentication endpoints"),
        (name = "videos", description = "Video record endpoints"),
        (name = "uploads", description = "Thumbnail and video upload endpoints"),
        (name = "system", description = "Health endpoints")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub storage: Arc<dyn StorageService>,
    pub videos: Arc<VideoService>,
    pub ingest: Arc<IngestService>,
    pub config: AppConfig,
    /// Cancelled when the server shuts down; in-flight tool runs watch a child token.
    pub shutdown: CancellationToken,
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origin = if config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn create_app(state: AppState) -> Router {
    // Multipart framing adds a little on top of the file itself
    let video_body_limit = state.config.max_video_size + 10 * 1024 * 1024;
    let thumbnail_body_limit = state.config.max_thumbnail_size + 1024 * 1024;

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/api/users", post(api::handlers::auth::register))
        .route("/api/login", post(api::handlers::auth::login))
        .route(
            "/api/videos",
            post(api::handlers::videos::create_video)
                .get(api::handlers::videos::list_videos)
                .layer(from_fn_with_state(
                    state.clone(),
                    api::middleware::auth::auth_middleware,
                )),
        )
        .route(
            "/api/videos/:id",
            get(api::handlers::videos::get_video)
                .delete(api::handlers::videos::delete_video)
                .layer(from_fn_with_state(
                    state.clone(),
                    api::middleware::auth::auth_middleware,
                )),
        )
        // Upload handlers authenticate after validating the path id
        .route(
            "/api/thumbnail_upload/:video_id",
            post(api::handlers::uploads::upload_thumbnail)
                .layer(DefaultBodyLimit::max(thumbnail_body_limit)),
        )
        .route(
            "/api/video_upload/:video_id",
            post(api::handlers::uploads::upload_video)
                .layer(DefaultBodyLimit::max(video_body_limit)),
        )
        .nest_service("/assets", ServeDir::new(&state.config.assets_root))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(cors_layer(&state.config))
        .with_state(state)
}
