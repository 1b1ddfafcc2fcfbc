use crate::config::AppConfig;
use crate::services::media::{
    ContainerRewriter, ExternalTool, FfmpegFaststart, FfprobeProbe, MediaProbe,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub async fn setup_media_tools(
    config: &AppConfig,
) -> (Arc<dyn MediaProbe>, Arc<dyn ContainerRewriter>) {
    let ffprobe = ExternalTool::new(&config.ffprobe_path);
    let ffmpeg = ExternalTool::new(&config.ffmpeg_path);

    // Warm up: surface a missing binary at startup instead of on first upload
    for tool in [&ffprobe, &ffmpeg] {
        match tool
            .run(["-version"], Duration::from_secs(10), &CancellationToken::new())
            .await
        {
            Ok(output) if output.status.success() => {
                info!("🎞️  {} available at {}", tool.name(), tool.program().display())
            }
            Ok(output) => tracing::warn!(
                "⚠️  {} -version exited with {}. Video uploads will fail.",
                tool.name(),
                output.status
            ),
            Err(e) => tracing::warn!("⚠️  {} unavailable: {}. Video uploads will fail.", tool.name(), e),
        }
    }

    let timeout = config.media_tool_timeout();
    (
        Arc::new(FfprobeProbe::new(ffprobe, timeout)),
        Arc::new(FfmpegFaststart::new(ffmpeg, timeout)),
    )
}
