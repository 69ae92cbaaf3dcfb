use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A saved point of interest on the map.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pin {
    pub id: Uuid,
    pub lat: f64,
    pub lng: f64,
    pub description: Option<String>,
    pub image_urls: Vec<String>,
}

/// A raw image part received from a multipart form, not yet stored.
#[derive(Debug, Clone, Default)]
pub struct ImageUpload {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl ImageUpload {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Fields an administrator supplies when dropping a new pin.
#[derive(Debug, Clone)]
pub struct NewPin {
    pub lat: f64,
    pub lng: f64,
    pub description: String,
    pub images: Vec<ImageUpload>,
}

/// Replacement values for an existing pin.
#[derive(Debug, Clone)]
pub struct PinChanges {
    pub lat: f64,
    pub lng: f64,
    pub description: String,
    /// Existing image URLs to keep, in the order they should appear.
    pub retain_image_urls: Vec<String>,
    pub new_images: Vec<ImageUpload>,
}

#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Debug)]
pub struct LoginResponse {
    pub token: String,
    pub message: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct LocationQuery {
    pub query: Option<String>,
}

/// A named coordinate from the fixed landmark list.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Landmark {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}
