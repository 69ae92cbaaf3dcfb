use crate::{
    auth::{self, AuthenticatedAdmin},
    errors::AppError,
    location,
    models::{ImageUpload, LocationQuery, LoginRequest, LoginResponse, NewPin, PinChanges},
    AppState,
};
use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        rejection::JsonRejection,
        Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing;
use uuid::Uuid;

pub async fn login(
    State(state): State<Arc<AppState>>,
    request: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = request?;
    let token = auth::login(
        state.credentials.as_ref(),
        &state.tokens,
        &request.username,
        &request.password,
    )?;
    Ok(Json(LoginResponse {
        token,
        message: "Login successful".to_string(),
    }))
}

pub async fn list_pins(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    tracing::debug!("Listing all pins via handler");
    let pins = state.pins.list().await?;
    Ok(Json(pins))
}

pub async fn get_pin(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let pin_id = Uuid::parse_str(&id_str)?;
    tracing::debug!(%pin_id, "Fetching pin via handler");
    let pin = state.pins.get(pin_id).await?;
    Ok(Json(pin))
}

pub async fn create_pin(
    State(state): State<Arc<AppState>>,
    admin: AuthenticatedAdmin,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let form = PinForm::read(multipart?, "images").await?;
    let new_pin = NewPin {
        lat: form.lat()?,
        lng: form.lng()?,
        description: form.description()?,
        images: form.images,
    };

    let pin = state.pins.create(new_pin).await?;
    tracing::info!(pin_id = %pin.id, admin = %admin.username, "Pin created via handler");
    Ok((StatusCode::CREATED, Json(pin)))
}

pub async fn update_pin(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    admin: AuthenticatedAdmin,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<StatusCode, AppError> {
    let pin_id = Uuid::parse_str(&id_str)?;
    let form = PinForm::read(multipart?, "newImages").await?;
    let changes = PinChanges {
        lat: form.lat()?,
        lng: form.lng()?,
        description: form.description()?,
        retain_image_urls: form.retained_urls,
        new_images: form.images,
    };

    state.pins.update(pin_id, changes).await?;
    tracing::info!(%pin_id, admin = %admin.username, "Pin updated via handler");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_pin(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    admin: AuthenticatedAdmin,
) -> Result<StatusCode, AppError> {
    let pin_id = Uuid::parse_str(&id_str)?;
    state.pins.delete(pin_id).await?;
    tracing::info!(%pin_id, admin = %admin.username, "Pin deleted via handler");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn search_locations(Query(query): Query<LocationQuery>) -> impl IntoResponse {
    Json(location::search(query.query.as_deref()))
}

/// Fields of the pin create/update multipart forms.
#[derive(Default, Debug)]
struct PinForm {
    lat: Option<String>,
    lng: Option<String>,
    description: Option<String>,
    retained_urls: Vec<String>,
    images: Vec<ImageUpload>,
}

impl PinForm {
    /// Field names match with or without a trailing `[]`.
    async fn read(mut multipart: Multipart, image_field: &str) -> Result<Self, AppError> {
        let mut form = PinForm::default();
        while let Some(field) = multipart.next_field().await? {
            let field_name = match field.name() {
                Some(name) => name.trim_end_matches("[]").to_string(),
                None => continue,
            };
            match field_name.as_str() {
                "lat" => form.lat = Some(read_text(field, "lat").await?),
                "lng" => form.lng = Some(read_text(field, "lng").await?),
                "description" => form.description = Some(read_text(field, "description").await?),
                "existingImageUrlsToKeep" => {
                    let url = read_text(field, "existingImageUrlsToKeep").await?;
                    if !url.trim().is_empty() {
                        form.retained_urls.push(url);
                    }
                }
                name if name == image_field => {
                    let filename = field.file_name().map(|s| s.to_string());
                    let content_type = field.content_type().map(|m| m.to_string());
                    let data = field.bytes().await?.to_vec();
                    form.images.push(ImageUpload { filename, content_type, data });
                }
                _ => tracing::debug!("Ignoring unknown multipart field: {}", field_name),
            }
        }
        Ok(form)
    }

    fn lat(&self) -> Result<f64, AppError> {
        parse_coordinate(self.lat.as_deref(), "lat")
    }

    fn lng(&self) -> Result<f64, AppError> {
        parse_coordinate(self.lng.as_deref(), "lng")
    }

    fn description(&self) -> Result<String, AppError> {
        self.description
            .clone()
            .ok_or_else(|| AppError::MissingFormField("description".to_string()))
    }
}

async fn read_text(field: Field<'_>, name: &str) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Unprocessable(format!("Failed to read {}: {}", name, e)))
}

fn parse_coordinate(raw: Option<&str>, name: &str) -> Result<f64, AppError> {
    let raw = raw.ok_or_else(|| AppError::MissingFormField(name.to_string()))?;
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::Unprocessable(format!("{} must be a number, got '{}'", name, raw)))?;
    if !value.is_finite() {
        return Err(AppError::Unprocessable(format!("{} must be finite", name)));
    }
    Ok(value)
}
