use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime configuration for the upload backend
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port for the API server (default: 8091)
    pub port: u16,

    /// Database connection string (default: "sqlite://tubely.db?mode=rwc")
    pub database_url: String,

    /// JWT Secret Key (Required in production)
    pub jwt_secret: String,

    /// Directory thumbnails are written to (default: "./assets")
    pub assets_root: PathBuf,

    /// Public URL prefix for files under `assets_root`
    pub assets_base_url: String,

    /// Where thumbnails are written while still arriving. Not served, and must
    /// share a filesystem with `assets_root` (default: `.<root>-staging` next to it)
    pub assets_staging_dir: PathBuf,

    /// Destination bucket for processed videos
    pub s3_bucket: String,

    /// Bucket region (default: "us-east-1")
    pub s3_region: String,

    /// Custom S3 endpoint (MinIO etc). Enables path-style addressing.
    pub s3_endpoint: Option<String>,
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,

    /// Public URL prefix for objects in the bucket (CloudFront distribution)
    pub cdn_base_url: String,

    /// Maximum thumbnail size in bytes (default: 10 MB)
    pub max_thumbnail_size: usize,

    /// Maximum video size in bytes (default: 1 GB)
    pub max_video_size: usize,

    /// Where uploads are staged before processing (default: system temp dir)
    pub upload_temp_dir: Option<PathBuf>,

    pub ffprobe_path: PathBuf,
    pub ffmpeg_path: PathBuf,

    /// Deadline for a single ffprobe/ffmpeg invocation (default: 300s)
    pub media_tool_timeout_secs: u64,

    /// Key prefix for videos that are neither 16:9 nor 9:16 (default: "portrait")
    pub unclassified_orientation: String,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8091,
            database_url: "sqlite://tubely.db?mode=rwc".to_string(),
            jwt_secret: "secret".to_string(),
            assets_root: PathBuf::from("./assets"),
            assets_base_url: "http://localhost:8091/assets/".to_string(),
            assets_staging_dir: PathBuf::from("./.assets-staging"),
            s3_bucket: "tubely".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_endpoint: None,
            s3_access_key: None,
            s3_secret_key: None,
            cdn_base_url: "http://localhost:9000/tubely/".to_string(),
            max_thumbnail_size: 10 * 1024 * 1024, // 10 MB
            max_video_size: 1024 * 1024 * 1024,   // 1 GB
            upload_temp_dir: None,
            ffprobe_path: PathBuf::from("ffprobe"),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            media_tool_timeout_secs: 300,
            unclassified_orientation: "portrait".to_string(),
            allowed_origins: vec![
                "http://localhost:8091".to_string(),
                "http://127.0.0.1:8091".to_string(),
            ],
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_env_with_port(None)
    }

    /// Like [`AppConfig::from_env`], with `port_override` (the `--port` flag)
    /// taking precedence over `PORT`. Values derived from the port use the
    /// overridden one.
    pub fn from_env_with_port(port_override: Option<u16>) -> Self {
        let default = Self::default();

        let port = port_override.unwrap_or_else(|| {
            env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port)
        });

        let assets_root = env::var("ASSETS_ROOT")
            .map(PathBuf::from)
            .unwrap_or(default.assets_root);

        Self {
            port,

            database_url: env::var("DATABASE_URL").unwrap_or(default.database_url),

            jwt_secret: env::var("JWT_SECRET").unwrap_or(default.jwt_secret),

            assets_staging_dir: env::var("ASSETS_STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| staging_dir_beside(&assets_root)),

            assets_root,

            assets_base_url: env::var("ASSETS_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}/assets/", port)),

            s3_bucket: env::var("S3_BUCKET").unwrap_or(default.s3_bucket),

            s3_region: env::var("S3_REGION").unwrap_or(default.s3_region),

            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            s3_access_key: env::var("S3_ACCESS_KEY").ok(),
            s3_secret_key: env::var("S3_SECRET_KEY").ok(),

            cdn_base_url: env::var("S3_CF_DISTRO").unwrap_or(default.cdn_base_url),

            max_thumbnail_size: env::var("MAX_THUMBNAIL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_thumbnail_size),

            max_video_size: env::var("MAX_VIDEO_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_video_size),

            upload_temp_dir: env::var("UPLOAD_TEMP_DIR").ok().map(PathBuf::from),

            ffprobe_path: env::var("FFPROBE_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.ffprobe_path),

            ffmpeg_path: env::var("FFMPEG_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.ffmpeg_path),

            media_tool_timeout_secs: env::var("MEDIA_TOOL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.media_tool_timeout_secs),

            unclassified_orientation: env::var("UNCLASSIFIED_ORIENTATION")
                .ok()
                .and_then(|v| valid_key_prefix(&v))
                .unwrap_or(default.unclassified_orientation),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_origins),
        }
    }

    /// Create config for development and tests (in-memory database, small limits)
    pub fn development() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_video_size: 64 * 1024 * 1024,
            media_tool_timeout_secs: 30,
            ..Self::default()
        }
    }

    pub fn media_tool_timeout(&self) -> Duration {
        Duration::from_secs(self.media_tool_timeout_secs)
    }
}

/// `<parent>/.<name>-staging` for an assets root `<parent>/<name>`.
pub fn staging_dir_beside(root: &Path) -> PathBuf {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "assets".to_string());
    let parent = root.parent().unwrap_or(root);
    parent.join(format!(".{}-staging", name))
}

/// A single non-empty key segment, or `None` (with a warning) when the value
/// would produce an empty or nested object key.
fn valid_key_prefix(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.contains('/') {
        tracing::warn!(
            "Ignoring UNCLASSIFIED_ORIENTATION={:?}: must be a single non-empty path segment",
            raw
        );
        return None;
    }
    Some(trimmed.to_string())
}
