//! Pin lifecycle: create, update and delete a pin together with its images.
//!
//! The repository owns the rows and the blob store owns the images; this module
//! only sequences calls between them. Image uploads that fail are dropped from
//! the pin, image deletes that fail leave an orphaned blob. Neither fails the
//! enclosing operation.

use crate::{
    domain::{BlobStore, PinRepository},
    errors::PinError,
    models::{ImageUpload, NewPin, Pin, PinChanges},
    storage::{delete_best_effort, DeleteOutcome},
};
use std::{collections::HashSet, sync::Arc};
use tracing;
use uuid::Uuid;

#[derive(Clone)]
pub struct PinService {
    repo: Arc<dyn PinRepository>,
    blobs: Arc<dyn BlobStore>,
}

impl PinService {
    pub fn new(repo: Arc<dyn PinRepository>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { repo, blobs }
    }

    pub async fn list(&self) -> Result<Vec<Pin>, PinError> {
        Ok(self.repo.list_all().await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Pin, PinError> {
        self.repo.get_by_id(id).await?.ok_or(PinError::NotFound(id))
    }

    pub async fn create(&self, new_pin: NewPin) -> Result<Pin, PinError> {
        let image_urls = self.upload_all(&new_pin.images).await;
        let pin = Pin {
            id: Uuid::new_v4(),
            lat: new_pin.lat,
            lng: new_pin.lng,
            description: Some(new_pin.description),
            image_urls,
        };
        self.repo.insert(&pin).await?;

        tracing::info!(pin_id = %pin.id, images = pin.image_urls.len(), "Pin created");
        Ok(pin)
    }

    /// Replaces a pin's fields and reconciles its images.
    ///
    /// The final image list is the retained URLs in caller order, each kept
    /// once, followed by the newly uploaded ones. Every retained URL must
    /// already belong to the pin; otherwise nothing is changed.
    pub async fn update(&self, id: Uuid, changes: PinChanges) -> Result<Pin, PinError> {
        let mut pin = self.get(id).await?;

        let current: HashSet<&str> = pin.image_urls.iter().map(String::as_str).collect();
        if let Some(foreign) = changes
            .retain_image_urls
            .iter()
            .find(|url| !current.contains(url.as_str()))
        {
            tracing::warn!(pin_id = %id, image_url = %foreign, "Rejecting update retaining a foreign image");
            return Err(PinError::UnknownRetainedImage(foreign.clone()));
        }

        let mut retain: HashSet<&str> = HashSet::new();
        let retained: Vec<String> = changes
            .retain_image_urls
            .iter()
            .filter(|url| retain.insert(url.as_str()))
            .cloned()
            .collect();
        let mut seen = HashSet::new();
        let to_delete: Vec<String> = pin
            .image_urls
            .iter()
            .filter(|url| !retain.contains(url.as_str()))
            .filter(|url| seen.insert(url.as_str()))
            .cloned()
            .collect();
        let failed = self.delete_all(&to_delete).await;

        let new_urls = self.upload_all(&changes.new_images).await;

        let mut image_urls = retained;
        image_urls.extend(new_urls);

        pin.lat = changes.lat;
        pin.lng = changes.lng;
        pin.description = Some(changes.description);
        pin.image_urls = image_urls;
        self.repo.update(&pin).await?;

        tracing::info!(
            pin_id = %id,
            removed = to_delete.len(),
            orphaned = failed,
            images = pin.image_urls.len(),
            "Pin updated"
        );
        Ok(pin)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), PinError> {
        let pin = self.get(id).await?;
        let failed = self.delete_all(&pin.image_urls).await;
        self.repo.delete(id).await?;

        tracing::info!(pin_id = %id, images = pin.image_urls.len(), orphaned = failed, "Pin deleted");
        Ok(())
    }

    /// Uploads sequentially, preserving order. Empty and failed uploads are skipped.
    async fn upload_all(&self, images: &[ImageUpload]) -> Vec<String> {
        let mut urls = Vec::with_capacity(images.len());
        for image in images {
            match self.blobs.upload(image).await {
                Ok(Some(url)) => urls.push(url),
                Ok(None) => tracing::debug!(filename = ?image.filename, "Skipping empty image"),
                Err(e) => {
                    tracing::warn!(filename = ?image.filename, error = %e, "Image upload failed; dropping it from the pin")
                }
            }
        }
        urls
    }

    /// Returns how many deletes failed.
    async fn delete_all(&self, urls: &[String]) -> usize {
        let mut failed = 0;
        for url in urls {
            if let DeleteOutcome::Failed(reason) = delete_best_effort(self.blobs.as_ref(), url).await {
                tracing::debug!(image_url = %url, %reason, "Counting orphaned blob");
                failed += 1;
            }
        }
        failed
    }
}
