use crate::config::AppConfig;
use crate::services::storage::{S3StorageService, StorageService};
use aws_sdk_s3::config::{Credentials, Region};
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(config: &AppConfig) -> Arc<dyn StorageService> {
    let mut loader = aws_config::from_env().region(Region::new(config.s3_region.clone()));

    if let Some(endpoint) = &config.s3_endpoint {
        info!("☁️  S3 Storage: {} (Bucket: {})", endpoint, config.s3_bucket);
        loader = loader.endpoint_url(endpoint);
    } else {
        info!(
            "☁️  S3 Storage: AWS {} (Bucket: {})",
            config.s3_region, config.s3_bucket
        );
    }

    if let (Some(access_key), Some(secret_key)) = (&config.s3_access_key, &config.s3_secret_key)
    {
        loader = loader.credentials_provider(Credentials::new(
            access_key.clone(),
            secret_key.clone(),
            None,
            None,
            "static",
        ));
    }

    let aws_config = loader.load().await;

    // Custom endpoints (MinIO) don't resolve virtual-hosted bucket names
    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(config.s3_endpoint.is_some())
        .build();

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);

    match s3_client.head_bucket().bucket(&config.s3_bucket).send().await {
        Ok(_) => info!("✅ Bucket '{}' is ready", config.s3_bucket),
        Err(e) => tracing::warn!(
            "⚠️  Bucket '{}' is not reachable yet: {}",
            config.s3_bucket,
            e
        ),
    }

    Arc::new(S3StorageService::new(s3_client, config.s3_bucket.clone()))
}
