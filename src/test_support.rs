//! In-memory stand-ins for the pin table and the blob store.

use crate::{
    domain::{BlobStore, PinRepository},
    errors::{RepoError, StorageError},
    models::{ImageUpload, Pin},
};
use async_trait::async_trait;
use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};
use uuid::Uuid;

#[derive(Default, Clone)]
pub struct InMemoryPinRepository {
    pins: Arc<Mutex<Vec<Pin>>>,
}

impl InMemoryPinRepository {
    pub fn snapshot(&self) -> Vec<Pin> {
        self.pins.lock().unwrap().clone()
    }
}

#[async_trait]
impl PinRepository for InMemoryPinRepository {
    async fn insert(&self, pin: &Pin) -> Result<(), RepoError> {
        self.pins.lock().unwrap().push(pin.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Pin>, RepoError> {
        Ok(self.pins.lock().unwrap().iter().find(|p| p.id == id).cloned())
    }

    async fn update(&self, pin: &Pin) -> Result<(), RepoError> {
        let mut pins = self.pins.lock().unwrap();
        let slot = pins
            .iter_mut()
            .find(|p| p.id == pin.id)
            .ok_or(RepoError::NotFound(pin.id))?;
        *slot = pin.clone();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.pins.lock().unwrap().retain(|p| p.id != id);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Pin>, RepoError> {
        Ok(self.snapshot())
    }
}

#[derive(Default)]
struct Recorded {
    uploads: usize,
    deleted: Vec<String>,
    failing_uploads: HashSet<String>,
    failing_deletes: HashSet<String>,
}

/// Blob store that records every call and issues `https://cdn.example/map-pins/<n>` URLs.
#[derive(Default, Clone)]
pub struct RecordingBlobStore {
    state: Arc<Mutex<Recorded>>,
}

impl RecordingBlobStore {
    /// Uploads of a file with this name will fail.
    pub fn fail_uploads_named(&self, filename: &str) {
        self.state.lock().unwrap().failing_uploads.insert(filename.to_string());
    }

    pub fn fail_deletes_of(&self, url: &str) {
        self.state.lock().unwrap().failing_deletes.insert(url.to_string());
    }

    /// Every URL passed to `delete`, failed attempts included.
    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn upload_count(&self) -> usize {
        self.state.lock().unwrap().uploads
    }
}

#[async_trait]
impl BlobStore for RecordingBlobStore {
    async fn upload(&self, image: &ImageUpload) -> Result<Option<String>, StorageError> {
        if image.is_empty() {
            return Ok(None);
        }
        let mut state = self.state.lock().unwrap();
        state.uploads += 1;
        if let Some(name) = &image.filename {
            if state.failing_uploads.contains(name) {
                return Err(StorageError::UploadFailed(format!("refused {}", name)));
            }
        }
        Ok(Some(format!("https://cdn.example/map-pins/{}", state.uploads)))
    }

    async fn delete(&self, url: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        state.deleted.push(url.to_string());
        if state.failing_deletes.contains(url) {
            return Err(StorageError::BackendError(anyhow::anyhow!("store unavailable")));
        }
        Ok(())
    }
}

pub fn image(name: &str) -> ImageUpload {
    ImageUpload {
        filename: Some(name.to_string()),
        content_type: Some("image/jpeg".to_string()),
        data: name.as_bytes().to_vec(),
    }
}
