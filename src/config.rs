use std::{env, net::SocketAddr, path::PathBuf, str::FromStr};
use thiserror::Error;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_NAMESPACE: &str = "map-pins";
const DEFAULT_LOCAL_BLOB_DIR: &str = "./data/blobs";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
}

/// Where pin images live.
#[derive(Clone, Debug)]
pub enum BlobConfig {
    S3(S3Config),
    /// Files on local disk, served back by this process under `/blobs`.
    Local { root_dir: PathBuf },
}

#[derive(Clone, Debug)]
pub struct S3Config {
    pub bucket_name: String,
    // Store region as string for simplicity here, aws_clients can convert
    pub region: String,
    // Optional endpoint for LocalStack / S3-compatible providers
    pub endpoint_url: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub public_base_url: String,
}

#[derive(Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub jwt_secret: String,
    pub admin_username: String,
    pub admin_password: String,
    pub blob: BlobConfig,
    pub blob_namespace: String,
    pub static_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

// Secrets stay out of the startup log line.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let blob = match &self.blob {
            BlobConfig::S3(s3) => format!(
                "s3(bucket={}, region={}, endpoint={:?})",
                s3.bucket_name, s3.region, s3.endpoint_url
            ),
            BlobConfig::Local { root_dir } => format!("local({})", root_dir.display()),
        };
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("blob", &blob)
            .field("blob_namespace", &self.blob_namespace)
            .field("static_dir", &self.static_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignores errors, relies on env vars otherwise)
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required =
            |name: &str| optional(name).ok_or_else(|| ConfigError::MissingVar(name.into()));

        let bind_address_str =
            optional("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let bind_address = SocketAddr::from_str(&bind_address_str)
            .map_err(|e| ConfigError::InvalidVar("BIND_ADDRESS".into(), e.to_string()))?;

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;
        let admin_username = required("ADMIN_USERNAME")?;
        let admin_password = required("ADMIN_PASSWORD")?;

        let blob_namespace = optional("BLOB_NAMESPACE")
            .map(|ns| ns.trim_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        if blob_namespace.is_empty() || blob_namespace.contains('/') {
            return Err(ConfigError::InvalidVar(
                "BLOB_NAMESPACE".into(),
                "must be a single non-empty path segment".into(),
            ));
        }

        let backend = optional("BLOB_BACKEND").unwrap_or_else(|| "s3".to_string());
        let blob = match backend.to_ascii_lowercase().as_str() {
            "s3" => {
                let bucket_name = required("BLOB_BUCKET_NAME")?;
                let region =
                    optional("AWS_DEFAULT_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string());
                let endpoint_url = optional("AWS_ENDPOINT_URL");
                let public_base_url = optional("BLOB_PUBLIC_BASE_URL")
                    .unwrap_or_else(|| default_public_base_url(&bucket_name, &region, endpoint_url.as_deref()));
                BlobConfig::S3(S3Config {
                    bucket_name,
                    region,
                    endpoint_url,
                    access_key_id: required("BLOB_ACCESS_KEY_ID")?,
                    secret_access_key: required("BLOB_SECRET_ACCESS_KEY")?,
                    public_base_url: public_base_url.trim_end_matches('/').to_string(),
                })
            }
            "local" => BlobConfig::Local {
                root_dir: PathBuf::from(
                    optional("BLOB_LOCAL_DIR").unwrap_or_else(|| DEFAULT_LOCAL_BLOB_DIR.to_string()),
                ),
            },
            other => {
                return Err(ConfigError::InvalidVar(
                    "BLOB_BACKEND".into(),
                    format!("unknown backend '{}', expected 's3' or 'local'", other),
                ));
            }
        };

        let static_dir = optional("STATIC_DIR").map(PathBuf::from);

        let max_upload_bytes = match optional("MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|e| ConfigError::InvalidVar("MAX_UPLOAD_BYTES".into(), e.to_string()))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Config {
            bind_address,
            database_url,
            jwt_secret,
            admin_username,
            admin_password,
            blob,
            blob_namespace,
            static_dir,
            max_upload_bytes,
        })
    }
}

// Path-style URL for custom endpoints (what LocalStack/MinIO serve), virtual-host style for AWS.
fn default_public_base_url(bucket: &str, region: &str, endpoint: Option<&str>) -> String {
    match endpoint {
        Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
        None => format!("https://{}.s3.{}.amazonaws.com", bucket, region),
    }
}
