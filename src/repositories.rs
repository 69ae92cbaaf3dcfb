use crate::{
    domain::PinRepository,
    errors::RepoError,
    models::Pin,
};
use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};
use tracing::{self, info};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SqlitePinRepository {
    pool: SqlitePool,
}

impl SqlitePinRepository {
    pub fn new(pool: SqlitePool) -> Self {
        info!("Initializing SqlitePinRepository");
        Self { pool }
    }
}

/// Row shape of the `pins` table; `image_urls` holds a JSON array.
#[derive(FromRow, Debug)]
struct PinRow {
    id: String,
    lat: f64,
    lng: f64,
    description: Option<String>,
    image_urls: String,
}

impl TryFrom<PinRow> for Pin {
    type Error = RepoError;

    fn try_from(row: PinRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| RepoError::DataCorruption(format!("pin id '{}': {}", row.id, e)))?;
        let image_urls: Vec<String> = serde_json::from_str(&row.image_urls)
            .map_err(|e| RepoError::DataCorruption(format!("image_urls of pin {}: {}", id, e)))?;
        Ok(Pin {
            id,
            lat: row.lat,
            lng: row.lng,
            description: row.description,
            image_urls,
        })
    }
}

fn encode_image_urls(pin: &Pin) -> Result<String, RepoError> {
    serde_json::to_string(&pin.image_urls)
        .context(format!("Failed to encode image URLs of pin {}", pin.id))
        .map_err(RepoError::BackendError)
}

#[async_trait]
impl PinRepository for SqlitePinRepository {
    async fn insert(&self, pin: &Pin) -> Result<(), RepoError> {
        let image_urls = encode_image_urls(pin)?;
        sqlx::query(
            "INSERT INTO pins (id, lat, lng, description, image_urls) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(pin.id.to_string())
        .bind(pin.lat)
        .bind(pin.lng)
        .bind(pin.description.as_deref())
        .bind(image_urls)
        .execute(&self.pool)
        .await
        .context(format!("SQLite: Failed to insert pin (id: {})", pin.id))
        .map_err(RepoError::BackendError)?;

        tracing::debug!(pin_id = %pin.id, "SQLite: Pin inserted");
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Pin>, RepoError> {
        let row: Option<PinRow> = sqlx::query_as(
            "SELECT id, lat, lng, description, image_urls FROM pins WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context(format!("SQLite: Failed to get pin (id: {})", id))
        .map_err(RepoError::BackendError)?;

        match row {
            Some(row) => Pin::try_from(row).map(Some).inspect_err(|e| {
                tracing::error!(pin_id = %id, error = %e, "SQLite: Retrieved row but failed to parse it into a Pin");
            }),
            None => Ok(None), // Row not found is not an error
        }
    }

    async fn update(&self, pin: &Pin) -> Result<(), RepoError> {
        let image_urls = encode_image_urls(pin)?;
        let result = sqlx::query(
            "UPDATE pins SET lat = ?, lng = ?, description = ?, image_urls = ? WHERE id = ?",
        )
        .bind(pin.lat)
        .bind(pin.lng)
        .bind(pin.description.as_deref())
        .bind(image_urls)
        .bind(pin.id.to_string())
        .execute(&self.pool)
        .await
        .context(format!("SQLite: Failed to update pin (id: {})", pin.id))
        .map_err(RepoError::BackendError)?;

        if result.rows_affected() == 0 {
            tracing::warn!(pin_id = %pin.id, "SQLite: Update matched no row");
            return Err(RepoError::NotFound(pin.id));
        }
        tracing::debug!(pin_id = %pin.id, "SQLite: Pin updated");
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM pins WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context(format!("SQLite: Failed to delete pin (id: {})", id))
            .map_err(RepoError::BackendError)?;

        tracing::debug!(pin_id = %id, rows = result.rows_affected(), "SQLite: Delete executed");
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Pin>, RepoError> {
        let rows: Vec<PinRow> = sqlx::query_as(
            "SELECT id, lat, lng, description, image_urls FROM pins ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await
        .context("SQLite: Failed to list pins")
        .map_err(RepoError::BackendError)?;

        // Fail fast if data in the table is corrupt
        let pins = rows
            .into_iter()
            .map(Pin::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("SQLite: Listed {} pins", pins.len());
        Ok(pins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn repository() -> SqlitePinRepository {
        // A single connection keeps every query on the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        SqlitePinRepository::new(pool)
    }

    fn pin(description: &str, urls: &[&str]) -> Pin {
        Pin {
            id: Uuid::new_v4(),
            lat: 24.8607,
            lng: 67.0011,
            description: Some(description.to_string()),
            image_urls: urls.iter().map(|u| u.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn insert_then_get_round_trips_all_fields() {
        let repo = repository().await;
        let stored = pin("Karachi Port", &["https://cdn.example/map-pins/a", "https://cdn.example/map-pins/b"]);
        repo.insert(&stored).await.unwrap();

        let fetched = repo.get_by_id(stored.id).await.unwrap();
        assert_eq!(fetched, Some(stored));
    }

    #[tokio::test]
    async fn get_unknown_id_returns_none() {
        let repo = repository().await;
        assert_eq!(repo.get_by_id(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_replaces_the_row() {
        let repo = repository().await;
        let mut stored = pin("before", &["https://cdn.example/map-pins/a"]);
        repo.insert(&stored).await.unwrap();

        stored.lat = 1.5;
        stored.description = Some("after".into());
        stored.image_urls.clear();
        repo.update(&stored).await.unwrap();

        assert_eq!(repo.get_by_id(stored.id).await.unwrap(), Some(stored));
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found() {
        let repo = repository().await;
        let ghost = pin("ghost", &[]);
        assert!(matches!(repo.update(&ghost).await, Err(RepoError::NotFound(id)) if id == ghost.id));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let repo = repository().await;
        let stored = pin("gone soon", &[]);
        repo.insert(&stored).await.unwrap();

        repo.delete(stored.id).await.unwrap();
        repo.delete(stored.id).await.unwrap();
        assert_eq!(repo.get_by_id(stored.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_all_keeps_insertion_order() {
        let repo = repository().await;
        let first = pin("first", &[]);
        let second = pin("second", &[]);
        repo.insert(&first).await.unwrap();
        repo.insert(&second).await.unwrap();

        let ids: Vec<Uuid> = repo.list_all().await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn corrupt_image_urls_surface_as_data_corruption() {
        let repo = repository().await;
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO pins (id, lat, lng, description, image_urls) VALUES (?, 0, 0, NULL, 'not json')")
            .bind(id.to_string())
            .execute(&repo.pool)
            .await
            .unwrap();

        assert!(matches!(repo.get_by_id(id).await, Err(RepoError::DataCorruption(_))));
        assert!(matches!(repo.list_all().await, Err(RepoError::DataCorruption(_))));
    }
}
