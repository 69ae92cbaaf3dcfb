use crate::errors::{RepoError, StorageError};
use crate::models::{ImageUpload, Pin};
use async_trait::async_trait;
use uuid::Uuid;

/// Trait defining persistence operations for pins.
#[async_trait]
pub trait PinRepository: Send + Sync + 'static { // Send+Sync+'static required for Arc<dyn>
    async fn insert(&self, pin: &Pin) -> Result<(), RepoError>;

    /// Returns Ok(None) if the pin is not found.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Pin>, RepoError>;

    /// Replaces the whole row; the caller has already merged fields.
    /// Fails with `RepoError::NotFound` if the row vanished.
    async fn update(&self, pin: &Pin) -> Result<(), RepoError>;

    /// Removing an absent pin is not an error.
    async fn delete(&self, id: Uuid) -> Result<(), RepoError>;

    /// All pins in insertion order.
    async fn list_all(&self) -> Result<Vec<Pin>, RepoError>;
}

/// Trait defining operations on the external image store.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Stores the image and returns its public URL, or `None` for an empty payload.
    async fn upload(&self, image: &ImageUpload) -> Result<Option<String>, StorageError>;

    /// Deletes the blob a previously issued URL points to.
    async fn delete(&self, url: &str) -> Result<(), StorageError>;
}

/// Decides whether a username/password pair may administer pins.
pub trait CredentialVerifier: Send + Sync + 'static {
    fn verify(&self, username: &str, password: &str) -> bool;
}
