#![allow(dead_code)]

use anyhow::anyhow;
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use sea_orm::{Database, DatabaseConnection, EntityTrait};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::{TempDir, TempPath};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use tubely::config::AppConfig;
use tubely::entities::prelude::Videos;
use tubely::infrastructure::database;
use tubely::services::ingest::IngestService;
use tubely::services::media::rewrite::rewritten_path;
use tubely::services::media::{ContainerRewriter, MediaError, MediaProbe, ProbedDimensions};
use tubely::services::storage::{StorageService, UploadResult};
use tubely::services::videos::VideoService;
use tubely::{AppState, create_app};

pub const BOUNDARY: &str = "---------------------------123456789012345678901234567";

pub struct StoredObject {
    pub content_type: String,
    pub data: Vec<u8>,
}

pub struct MockStorageService {
    pub files: Mutex<HashMap<String, StoredObject>>,
    pub fail_uploads: AtomicBool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            fail_uploads: AtomicBool::new(false),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn upload_stream<'a>(
        &self,
        key: &str,
        content_type: &str,
        mut reader: Box<dyn AsyncRead + Unpin + Send + 'a>,
    ) -> anyhow::Result<UploadResult> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(anyhow!("bucket unavailable"));
        }

        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        let size = data.len() as i64;

        self.files.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                content_type: content_type.to_string(),
                data,
            },
        );

        Ok(UploadResult {
            size,
            key: key.to_string(),
        })
    }

    async fn delete_file(&self, key: &str) -> anyhow::Result<()> {
        self.files.lock().unwrap().remove(key);
        Ok(())
    }

    async fn file_exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.files.lock().unwrap().contains_key(key))
    }
}

/// Reports fixed dimensions, or no streams when `dimensions` is `None`.
/// Optionally deletes a video row while probing, so the final record update
/// finds nothing to update.
pub struct FakeProbe {
    pub dimensions: Mutex<Option<(u32, u32)>>,
    pub saw_staged_file: AtomicBool,
    pub delete_while_probing: Mutex<Option<(DatabaseConnection, String)>>,
}

impl FakeProbe {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            dimensions: Mutex::new(Some((width, height))),
            saw_staged_file: AtomicBool::new(false),
            delete_while_probing: Mutex::new(None),
        }
    }

    pub fn delete_video_while_probing(&self, db: DatabaseConnection, video_id: &str) {
        *self.delete_while_probing.lock().unwrap() = Some((db, video_id.to_string()));
    }

    pub fn set(&self, dimensions: Option<(u32, u32)>) {
        *self.dimensions.lock().unwrap() = dimensions;
    }
}

#[async_trait]
impl MediaProbe for FakeProbe {
    async fn probe(
        &self,
        path: &Path,
        _cancel: &CancellationToken,
    ) -> Result<ProbedDimensions, MediaError> {
        if path.exists() {
            self.saw_staged_file.store(true, Ordering::SeqCst);
        }

        let pending = self.delete_while_probing.lock().unwrap().take();
        if let Some((db, video_id)) = pending {
            Videos::delete_by_id(video_id).exec(&db).await.unwrap();
        }

        match *self.dimensions.lock().unwrap() {
            Some((width, height)) => Ok(ProbedDimensions { width, height }),
            None => Err(MediaError::NoStreams),
        }
    }
}

/// Copies the input to `<input>.processing` with a marker prefix, or fails
/// after leaving a partial output behind.
pub struct CopyRewriter {
    pub fail: AtomicBool,
}

pub const REWRITE_MARKER: &[u8] = b"faststart:";

impl CopyRewriter {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ContainerRewriter for CopyRewriter {
    async fn rewrite(
        &self,
        input: &Path,
        _cancel: &CancellationToken,
    ) -> Result<TempPath, MediaError> {
        let output = TempPath::from_path(rewritten_path(input));
        if self.fail.load(Ordering::SeqCst) {
            tokio::fs::write(&*output, b"partial").await?;
            return Err(MediaError::ToolFailed {
                tool: "ffmpeg".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "moov atom not found".to_string(),
            });
        }

        let mut data = REWRITE_MARKER.to_vec();
        data.extend(tokio::fs::read(input).await?);
        tokio::fs::write(&*output, data).await?;
        Ok(output)
    }
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub storage: Arc<MockStorageService>,
    pub probe: Arc<FakeProbe>,
    pub rewriter: Arc<CopyRewriter>,
    pub upload_dir: TempDir,
    pub assets_dir: TempDir,
    pub staging_dir: TempDir,
}

pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    database::run_migrations(&db).await.unwrap();
    db
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

pub async fn spawn_app_with(customize: impl FnOnce(&mut AppConfig)) -> TestApp {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("tubely=debug,tower_http=debug"))
        .with(fmt::layer().with_test_writer())
        .try_init();

    let upload_dir = tempfile::tempdir().unwrap();
    let assets_dir = tempfile::tempdir().unwrap();
    let staging_dir = tempfile::tempdir().unwrap();

    let mut config = AppConfig::development();
    config.jwt_secret = "test-secret".to_string();
    config.upload_temp_dir = Some(upload_dir.path().to_path_buf());
    config.assets_root = assets_dir.path().to_path_buf();
    config.assets_staging_dir = staging_dir.path().to_path_buf();
    config.assets_base_url = "http://localhost:8091/assets/".to_string();
    config.cdn_base_url = "https://cdn.example.com/".to_string();
    customize(&mut config);

    let db = setup_test_db().await;
    let storage = Arc::new(MockStorageService::new());
    let probe = Arc::new(FakeProbe::new(1920, 1080));
    let rewriter = Arc::new(CopyRewriter::new());

    let videos = Arc::new(VideoService::new(db.clone()));
    let ingest = Arc::new(IngestService::new(
        storage.clone(),
        videos.clone(),
        probe.clone(),
        rewriter.clone(),
        config.clone(),
    ));

    let state = AppState {
        db,
        storage: storage.clone(),
        videos,
        ingest,
        config,
        shutdown: CancellationToken::new(),
    };

    TestApp {
        app: create_app(state.clone()),
        state,
        storage,
        probe,
        rewriter,
        upload_dir,
        assets_dir,
        staging_dir,
    }
}

pub fn entries(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect()
}

pub async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| {
            panic!("non-JSON body ({}): {}", status, String::from_utf8_lossy(&body))
        })
    };
    (status, json)
}

pub fn multipart_body(field: &str, content_type: Option<&str>, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"upload.bin\"\r\n",
            field
        )
        .as_bytes(),
    );
    if let Some(content_type) = content_type {
        body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

impl TestApp {
    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let response = self
            .app
            .clone()
            .oneshot(builder.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();
        read_json(response).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let response = self
            .app
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        read_json(response).await
    }

    pub async fn upload(&self, uri: &str, token: Option<&str>, body: Vec<u8>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            );
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let response = self
            .app
            .clone()
            .oneshot(builder.body(Body::from(body)).unwrap())
            .await
            .unwrap();
        read_json(response).await
    }

    /// Register and log in, returning a bearer token.
    pub async fn login_as(&self, email: &str) -> String {
        let credentials = serde_json::json!({ "email": email, "password": "password123" });

        let (status, _) = self.post_json("/api/users", None, credentials.clone()).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, json) = self.post_json("/api/login", None, credentials).await;
        assert_eq!(status, StatusCode::OK);
        json["token"].as_str().unwrap().to_string()
    }

    pub async fn create_video(&self, token: &str) -> String {
        let (status, json) = self
            .post_json(
                "/api/videos",
                Some(token),
                serde_json::json!({ "title": "Boots", "description": "A video about boots" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        json["id"].as_str().unwrap().to_string()
    }

    pub async fn fetch_video(&self, token: &str, id: &str) -> Value {
        let (status, json) = self.get(&format!("/api/videos/{}", id), Some(token)).await;
        assert_eq!(status, StatusCode::OK);
        json
    }
}
