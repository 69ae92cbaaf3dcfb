use crate::config::S3Config;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use aws_sdk_s3::Client as S3Client;
use tracing;

// Creates the base AWS SDK configuration from the blob-store settings.
// Credentials come from config only; the ambient provider chain is not consulted.
pub async fn create_sdk_config(config: &S3Config) -> SdkConfig {
    tracing::info!(sdk_region = %config.region, "Setting SDK region");
    let credentials = Credentials::new(
        config.access_key_id.clone(),
        config.secret_access_key.clone(),
        None,
        None,
        "map-pins-config",
    );

    let mut config_loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .credentials_provider(credentials);

    if let Some(endpoint_url) = &config.endpoint_url {
        tracing::info!("Using endpoint override: {}", endpoint_url);
        config_loader = config_loader.endpoint_url(endpoint_url);
    } else {
        tracing::info!("Using default AWS endpoints.");
    }

    config_loader.load().await
}

// Creates an S3 client from a shared SdkConfig.
// Path-style addressing when an endpoint override points at LocalStack/MinIO.
pub fn create_s3_client(sdk_config: &SdkConfig, force_path_style: bool) -> S3Client {
    let s3_config = aws_sdk_s3::config::Builder::from(sdk_config)
        .force_path_style(force_path_style)
        .build();
    S3Client::from_conf(s3_config)
}
