use crate::{
    auth::{StaticCredentials, TokenIssuer},
    aws_clients::{create_s3_client, create_sdk_config},
    config::{BlobConfig, Config, S3Config},
    domain::BlobStore,
    errors::AppError,
    pins::PinService,
    repositories::SqlitePinRepository,
    routes::{RouterOptions, LOCAL_BLOB_PREFIX},
    storage::{LocalBlobStore, S3BlobStore},
    AppState,
};
use aws_sdk_s3::{
    error::SdkError as S3SdkError,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
    Client as S3Client,
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::{str::FromStr, sync::Arc};
use tracing;

/// Opens the SQLite pool, creating the database file if needed, and applies migrations.
pub async fn connect_database(database_url: &str) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| AppError::ConfigError(format!("Invalid DATABASE_URL: {}", e)))?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(|e| AppError::InitError(format!("Startup: Failed to open database: {}", e)))?;

    tracing::info!("Startup: Applying database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| AppError::InitError(format!("Startup: Failed to apply migrations: {}", e)))?;
    tracing::info!("Startup: Database migrations applied.");

    Ok(pool)
}

/// Ensures the S3 bucket exists, creating it with the correct location constraint if needed.
async fn ensure_s3_bucket_exists(client: &S3Client, bucket_name: &str, region_str: &str) -> Result<(), AppError> {
    let bucket_config = if region_str != "us-east-1" {
        Some(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region_str))
                .build(),
        )
    } else {
        None
    };

    let mut create_bucket_req_builder = client.create_bucket().bucket(bucket_name);
    if let Some(config) = bucket_config {
        create_bucket_req_builder = create_bucket_req_builder.create_bucket_configuration(config);
    }

    match create_bucket_req_builder.send().await {
        Ok(_) => {
            tracing::info!("Startup: S3 bucket '{}' created.", bucket_name);
            Ok(())
        }
        Err(sdk_err) => {
            if let S3SdkError::ServiceError(service_err) = &sdk_err {
                let code = service_err.err().meta().code();
                if code == Some("BucketAlreadyOwnedByYou") || code == Some("BucketAlreadyExists") {
                    tracing::info!("Startup: S3 bucket '{}' already exists.", bucket_name);
                    return Ok(());
                }
            }
            let context = format!("Startup: Error creating S3 bucket '{}'", bucket_name);
            tracing::error!("{}: {:?}", context, sdk_err);
            Err(AppError::InitError(format!("{}: {}", context, sdk_err)))
        }
    }
}

async fn build_s3_store(s3: &S3Config, namespace: &str) -> Result<S3BlobStore, AppError> {
    tracing::info!("Startup: Initializing S3 client...");
    let sdk_config = create_sdk_config(s3).await;
    let client = create_s3_client(&sdk_config, s3.endpoint_url.is_some());
    ensure_s3_bucket_exists(&client, &s3.bucket_name, &s3.region).await?;
    Ok(S3BlobStore::new(
        client,
        s3.bucket_name.clone(),
        namespace.to_string(),
        s3.public_base_url.clone(),
    ))
}

/// Wires every component from the configuration.
pub async fn build_state(config: &Config) -> Result<(Arc<AppState>, RouterOptions), AppError> {
    let pool = connect_database(&config.database_url).await?;
    let repo = Arc::new(SqlitePinRepository::new(pool));

    let mut options = RouterOptions {
        max_upload_bytes: config.max_upload_bytes,
        static_dir: config.static_dir.clone(),
        local_blob_dir: None,
    };

    let blobs: Arc<dyn BlobStore> = match &config.blob {
        BlobConfig::S3(s3) => Arc::new(build_s3_store(s3, &config.blob_namespace).await?),
        BlobConfig::Local { root_dir } => {
            tokio::fs::create_dir_all(root_dir).await?;
            tracing::info!(root = %root_dir.display(), "Startup: Using local blob store");
            options.local_blob_dir = Some(root_dir.clone());
            Arc::new(LocalBlobStore::new(
                root_dir.clone(),
                config.blob_namespace.clone(),
                LOCAL_BLOB_PREFIX,
            ))
        }
    };

    let state = Arc::new(AppState {
        pins: PinService::new(repo, blobs),
        credentials: Arc::new(StaticCredentials::new(
            config.admin_username.clone(),
            config.admin_password.clone(),
        )),
        tokens: TokenIssuer::new(&config.jwt_secret),
    });
    Ok((state, options))
}
