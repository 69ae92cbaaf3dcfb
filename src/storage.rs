use crate::{
    domain::BlobStore,
    errors::StorageError,
    models::ImageUpload,
};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3::{primitives::ByteStream, Client as S3Client};
use std::{io::ErrorKind, path::PathBuf};
use tracing;
use url::Url;
use uuid::Uuid;

/// Where a stored image lives, as recovered from its public URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobLocation {
    /// Storage key: the last path segment without its extension,
    /// prefixed by the namespace when the URL sits inside it.
    pub key: String,
    /// The last path segment exactly as it appears in the URL.
    pub file_name: String,
    pub namespaced: bool,
}

/// Derives the storage key of a blob from a URL this service handed out.
/// Relative URLs (`/blobs/...`) are accepted.
pub fn parse_blob_url(url: &str, namespace: &str) -> Result<BlobLocation, StorageError> {
    let malformed = || StorageError::MalformedUrl(url.to_string());
    if url.trim().is_empty() {
        return Err(malformed());
    }
    let base = Url::parse("http://localhost/").map_err(|_| malformed())?;
    let parsed = base.join(url).map_err(|_| malformed())?;

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();
    let (file_name, parents) = segments.split_last().ok_or_else(malformed)?;

    let stem = match file_name.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => file_name,
    };
    if stem == "." || stem == ".." {
        return Err(malformed());
    }

    let namespaced = parents.last() == Some(&namespace);
    let key = if namespaced {
        format!("{}/{}", namespace, stem)
    } else {
        stem.to_string()
    };

    Ok(BlobLocation {
        key,
        file_name: file_name.to_string(),
        namespaced,
    })
}

fn content_type_for(image: &ImageUpload) -> String {
    image
        .content_type
        .clone()
        .filter(|ct| !ct.is_empty())
        .or_else(|| {
            image
                .filename
                .as_deref()
                .and_then(|name| mime_guess::from_path(name).first_raw())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Result of a cleanup delete. Failures are reported, never propagated.
#[must_use]
#[derive(Debug)]
pub enum DeleteOutcome {
    Deleted,
    Failed(StorageError),
}

/// Deletes a blob, logging and swallowing any failure.
///
/// A pin operation must not fail because cleanup of an old image failed; the
/// worst case is an orphaned blob in the store.
pub async fn delete_best_effort(store: &dyn BlobStore, url: &str) -> DeleteOutcome {
    match store.delete(url).await {
        Ok(()) => {
            tracing::debug!(image_url = %url, "Blob deleted");
            DeleteOutcome::Deleted
        }
        Err(e) => {
            tracing::warn!(image_url = %url, error = %e, "Blob delete failed; leaving it orphaned");
            DeleteOutcome::Failed(e)
        }
    }
}

#[derive(Debug, Clone)]
pub struct S3BlobStore {
    client: S3Client,
    bucket_name: String,
    namespace: String,
    public_base_url: String,
}

impl S3BlobStore {
    pub fn new(client: S3Client, bucket_name: String, namespace: String, public_base_url: String) -> Self {
        Self {
            client,
            bucket_name,
            namespace,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    /// Uploads data to S3 using PutObject. Sets Content-Type.
    async fn upload(&self, image: &ImageUpload) -> Result<Option<String>, StorageError> {
        if image.is_empty() {
            return Ok(None);
        }
        let key = format!("{}/{}", self.namespace, Uuid::new_v4());
        let content_type = content_type_for(image);
        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, %content_type, "S3: Uploading image");

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .body(ByteStream::from(image.data.clone()))
            .content_type(content_type)
            .send()
            .await
            .context(format!("S3: Failed to upload object with key '{}'", key))
            .map_err(|e| StorageError::UploadFailed(format!("{:#}", e)))?;

        tracing::debug!(s3_key = %key, bucket = %self.bucket_name, "S3: Upload successful");
        Ok(Some(format!("{}/{}", self.public_base_url, key)))
    }

    /// Deletes an object from S3 using DeleteObject.
    async fn delete(&self, url: &str) -> Result<(), StorageError> {
        let location = parse_blob_url(url, &self.namespace)?;
        tracing::debug!(s3_key = %location.key, bucket = %self.bucket_name, "S3: Deleting object");

        // DeleteObject succeeds even if the object doesn't exist.
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(&location.key)
            .send()
            .await
            .map_err(|sdk_err| {
                StorageError::BackendError(
                    anyhow::Error::new(sdk_err)
                        .context(format!("S3: Failed to delete object with key '{}'", location.key)),
                )
            })?;

        tracing::debug!(s3_key = %location.key, bucket = %self.bucket_name, "S3: Delete request successful");
        Ok(())
    }
}

/// Development backend keeping images on local disk under `<root>/<namespace>/`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root_dir: PathBuf,
    namespace: String,
    public_prefix: String,
}

impl LocalBlobStore {
    /// `public_prefix` is the URL path the HTTP layer serves `root_dir` under.
    pub fn new(root_dir: impl Into<PathBuf>, namespace: String, public_prefix: &str) -> Self {
        Self {
            root_dir: root_dir.into(),
            namespace,
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        }
    }

    fn namespace_dir(&self) -> PathBuf {
        self.root_dir.join(&self.namespace)
    }
}

// Keeps the original extension so static serving can infer the content type.
fn file_extension(image: &ImageUpload) -> Option<String> {
    image
        .filename
        .as_deref()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, image: &ImageUpload) -> Result<Option<String>, StorageError> {
        if image.is_empty() {
            return Ok(None);
        }
        let file_name = match file_extension(image) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        let dir = self.namespace_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Local: Failed to create {}", dir.display()))
            .map_err(|e| StorageError::UploadFailed(format!("{:#}", e)))?;

        let path = dir.join(&file_name);
        tokio::fs::write(&path, &image.data)
            .await
            .with_context(|| format!("Local: Failed to write {}", path.display()))
            .map_err(|e| StorageError::UploadFailed(format!("{:#}", e)))?;

        tracing::debug!(path = %path.display(), bytes = image.data.len(), "Local: Image stored");
        Ok(Some(format!("{}/{}/{}", self.public_prefix, self.namespace, file_name)))
    }

    async fn delete(&self, url: &str) -> Result<(), StorageError> {
        let location = parse_blob_url(url, &self.namespace)?;
        // Only files this store wrote are eligible.
        if !location.namespaced {
            return Err(StorageError::MalformedUrl(url.to_string()));
        }
        let path = self.namespace_dir().join(&location.file_name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(location.key)),
            Err(e) => Err(StorageError::BackendError(
                anyhow::Error::new(e).context(format!("Local: Failed to remove {}", path.display())),
            )),
        }
    }
}
