use clap::Parser;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tubely::config::AppConfig;
use tubely::infrastructure::{assets, database, media, storage};
use tubely::services::ingest::IngestService;
use tubely::services::videos::VideoService;
use tubely::{AppState, create_app};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port for the API server (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment & logging
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tubely=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env_with_port(args.port);

    info!("🚀 Starting tubely...");
    info!(
        "📦 Limits: video={}MB, thumbnail={}MB, tool timeout={}s",
        config.max_video_size / 1024 / 1024,
        config.max_thumbnail_size / 1024 / 1024,
        config.media_tool_timeout_secs
    );

    // 2. Infrastructure
    let db = database::setup_database(&config.database_url).await?;
    let storage_service = storage::setup_storage(&config).await;
    assets::ensure_assets_dir(&config.assets_root).await?;
    assets::ensure_assets_dir(&config.assets_staging_dir).await?;
    let (probe, rewriter) = media::setup_media_tools(&config).await;

    // 3. Services
    let videos = Arc::new(VideoService::new(db.clone()));
    let ingest = Arc::new(IngestService::new(
        storage_service.clone(),
        videos.clone(),
        probe,
        rewriter,
        config.clone(),
    ));

    let shutdown = CancellationToken::new();
    let state = AppState {
        db,
        storage: storage_service,
        videos,
        ingest,
        config: config.clone(),
        shutdown: shutdown.clone(),
    };

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &axum::http::Response<_>,
             latency: std::time::Duration,
             _span: &tracing::Span| {
                info!(
                    "📤 Finished in {:?} with status {}",
                    latency,
                    response.status()
                );
            },
        );

    let app = create_app(state).layer(trace_layer);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("✅ API Server listening on: http://0.0.0.0:{}", config.port);
    info!("📖 Swagger UI documentation: http://localhost:{}/swagger-ui", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Stops any ffprobe/ffmpeg still running for open requests
            shutdown.cancel();
        })
        .await?;

    info!("👋 tubely exited cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
